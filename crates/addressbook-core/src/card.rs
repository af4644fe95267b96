//! The contact card — the computed read model for one party.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  attachment::{
    Attachment, AttachmentDetail, EmailAddress, ImAccount, Note, OwnerRef,
    PhoneNumber, StreetAddress, Website,
  },
  dates::{Dated, Timestamps},
  party::Party,
};

/// Every attachment owned by one party's identity, grouped by kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachments {
  pub email_addresses:  Vec<Dated<Owned<EmailAddress>>>,
  pub street_addresses: Vec<Dated<Owned<StreetAddress>>>,
  pub phone_numbers:    Vec<Dated<Owned<PhoneNumber>>>,
  pub websites:         Vec<Dated<Owned<Website>>>,
  pub im_accounts:      Vec<Dated<Owned<ImAccount>>>,
  pub notes:            Vec<Dated<Owned<Note>>>,
}

/// One kind-specific payload together with its attachment identity and owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owned<T> {
  pub attachment_id: Uuid,
  pub owner:         OwnerRef,
  #[serde(flatten)]
  pub value:         T,
}

impl Attachments {
  /// Total number of attachments across all kinds.
  pub fn len(&self) -> usize {
    self.email_addresses.len()
      + self.street_addresses.len()
      + self.phone_numbers.len()
      + self.websites.len()
      + self.im_accounts.len()
      + self.notes.len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// File one attachment under its kind. Insertion order is preserved.
  pub fn push(&mut self, attachment: Dated<Attachment>) {
    let Dated { record, dates } = attachment;
    let Attachment { attachment_id, owner, detail } = record;
    let head = (attachment_id, owner, dates);
    match detail {
      AttachmentDetail::EmailAddress(v) => {
        self.email_addresses.push(owned(head, v))
      }
      AttachmentDetail::StreetAddress(v) => {
        self.street_addresses.push(owned(head, v))
      }
      AttachmentDetail::PhoneNumber(v) => self.phone_numbers.push(owned(head, v)),
      AttachmentDetail::Website(v) => self.websites.push(owned(head, v)),
      AttachmentDetail::ImAccount(v) => self.im_accounts.push(owned(head, v)),
      AttachmentDetail::Note(v) => self.notes.push(owned(head, v)),
    }
  }
}

fn owned<T>(
  (attachment_id, owner, dates): (Uuid, OwnerRef, Timestamps),
  value: T,
) -> Dated<Owned<T>> {
  Dated::new(Owned { attachment_id, owner, value }, dates)
}

impl FromIterator<Dated<Attachment>> for Attachments {
  fn from_iter<I: IntoIterator<Item = Dated<Attachment>>>(iter: I) -> Self {
    let mut out = Self::default();
    for a in iter {
      out.push(a);
    }
    out
  }
}

/// A resolved party and everything attached to it. Never stored, always
/// derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactCard {
  pub party:       Dated<Party>,
  /// Canonical detail-page path of the party.
  pub detail_path: String,
  pub attachments: Attachments,
}

impl ContactCard {
  pub fn new(party: Dated<Party>, attachments: Attachments) -> Self {
    let detail_path = party.detail_path();
    Self { party, detail_path, attachments }
  }
}
