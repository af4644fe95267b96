//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Enumerated tags (owner
//! kinds, labels, IM services) are stored as their lowercase `strum` names.
//! UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr;

use addressbook_core::{
  IntegrityError,
  attachment::{
    Attachment, AttachmentDetail, AttachmentKind, EmailAddress, ImAccount, Note,
    OwnerKind, OwnerRef, PhoneNumber, StreetAddress, Website,
  },
  dates::{Dated, Timestamps},
  party::{Organization, Party, Person},
  text::parse_variant,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_timestamps(
  date_added: &str,
  date_modified: Option<&str>,
) -> Result<Timestamps> {
  Ok(Timestamps {
    date_added:    decode_dt(date_added)?,
    date_modified: date_modified.map(decode_dt).transpose()?,
  })
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn encode_tag(tag: impl AsRef<str>) -> String { tag.as_ref().to_owned() }

fn decode_tag<T: FromStr>(field: &'static str, s: Option<String>) -> Result<Option<T>> {
  Ok(s.as_deref().map(|s| parse_variant(field, s)).transpose()?)
}

pub fn decode_owner(kind: &str, id: &str) -> Result<OwnerRef> {
  let kind: OwnerKind = parse_variant("owner_kind", kind)?;
  Ok(OwnerRef::new(kind, decode_uuid(id)?))
}

// ─── Attachment payloads ─────────────────────────────────────────────────────

/// Payload column values for `detail`, in [`crate::schema::payload_columns`]
/// order.
pub fn attachment_payload(detail: &AttachmentDetail) -> Vec<Option<String>> {
  match detail {
    AttachmentDetail::EmailAddress(v) => {
      vec![v.label.map(encode_tag), v.address.clone()]
    }
    AttachmentDetail::StreetAddress(v) => vec![
      v.label.map(encode_tag),
      v.address.clone(),
      v.city.clone(),
      v.state.clone(),
      v.zip.clone(),
    ],
    AttachmentDetail::PhoneNumber(v) => {
      vec![v.label.map(encode_tag), v.number.clone()]
    }
    AttachmentDetail::Website(v) => {
      vec![v.label.map(encode_tag), v.name.clone(), v.url.clone()]
    }
    AttachmentDetail::ImAccount(v) => vec![
      v.label.map(encode_tag),
      Some(v.username.clone()),
      v.service.map(encode_tag),
    ],
    AttachmentDetail::Note(v) => vec![
      None,
      Some(v.content.clone()),
      v.reference_date.map(encode_dt),
    ],
  }
}

fn decode_payload(
  kind: AttachmentKind,
  payload: Vec<Option<String>>,
) -> Result<AttachmentDetail> {
  let mut cols = payload.into_iter();
  let mut next = move || cols.next().flatten();
  let label = next();

  // Field initialisers run in source order, so each `next()` below must match
  // the column order of `payload_columns(kind)`.
  Ok(match kind {
    AttachmentKind::EmailAddress => AttachmentDetail::EmailAddress(EmailAddress {
      label:   decode_tag("email label", label)?,
      address: next(),
    }),
    AttachmentKind::StreetAddress => {
      AttachmentDetail::StreetAddress(StreetAddress {
        label:   decode_tag("street address label", label)?,
        address: next(),
        city:    next(),
        state:   next(),
        zip:     next(),
      })
    }
    AttachmentKind::PhoneNumber => AttachmentDetail::PhoneNumber(PhoneNumber {
      label:  decode_tag("phone label", label)?,
      number: next(),
    }),
    AttachmentKind::Website => AttachmentDetail::Website(Website {
      label: decode_tag("website label", label)?,
      name:  next(),
      url:   next(),
    }),
    AttachmentKind::ImAccount => AttachmentDetail::ImAccount(ImAccount {
      label:    decode_tag("im label", label)?,
      username: next().unwrap_or_default(),
      service:  decode_tag("im service", next())?,
    }),
    AttachmentKind::Note => AttachmentDetail::Note(Note {
      content:        next().unwrap_or_default(),
      reference_date: next().as_deref().map(decode_dt).transpose()?,
    }),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an attachment table row.
pub struct RawAttachment {
  pub attachment_id: String,
  pub owner_kind:    String,
  pub owner_id:      String,
  pub date_added:    String,
  pub date_modified: Option<String>,
  /// Kind-specific columns in `payload_columns` order.
  pub payload:       Vec<Option<String>>,
}

impl RawAttachment {
  pub fn into_attachment(self, kind: AttachmentKind) -> Result<Dated<Attachment>> {
    let attachment = Attachment {
      attachment_id: decode_uuid(&self.attachment_id)?,
      owner:         decode_owner(&self.owner_kind, &self.owner_id)?,
      detail:        decode_payload(kind, self.payload)?,
    };
    let dates =
      decode_timestamps(&self.date_added, self.date_modified.as_deref())?;
    Ok(Dated::new(attachment, dates))
  }
}

/// Raw strings read from a `persons` row.
pub struct RawPerson {
  pub party_id:        String,
  pub organization_id: Option<String>,
  pub title:           Option<String>,
  pub first_name:      String,
  pub middle_name:     Option<String>,
  pub last_name:       Option<String>,
  pub date_added:      String,
  pub date_modified:   Option<String>,
}

impl RawPerson {
  fn into_person(self) -> Result<Dated<Person>> {
    let person = Person {
      party_id:        decode_uuid(&self.party_id)?,
      organization_id: self
        .organization_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      title:           self.title,
      first_name:      self.first_name,
      middle_name:     self.middle_name,
      last_name:       self.last_name,
    };
    let dates =
      decode_timestamps(&self.date_added, self.date_modified.as_deref())?;
    Ok(Dated::new(person, dates))
  }
}

/// Raw strings read from an `organizations` row.
pub struct RawOrganization {
  pub party_id:      String,
  pub name:          String,
  pub date_added:    String,
  pub date_modified: Option<String>,
}

impl RawOrganization {
  fn into_organization(self) -> Result<Dated<Organization>> {
    let organization = Organization {
      party_id: decode_uuid(&self.party_id)?,
      name:     self.name,
    };
    let dates =
      decode_timestamps(&self.date_added, self.date_modified.as_deref())?;
    Ok(Dated::new(organization, dates))
  }
}

/// A `parties` row left-joined with both specialisation tables.
pub struct RawParty {
  pub party_id:     String,
  pub person:       Option<RawPerson>,
  pub organization: Option<RawOrganization>,
}

impl RawParty {
  /// Resolve to the one specialisation present. Neither or both is an
  /// [`IntegrityError`].
  pub fn into_party(self) -> Result<Dated<Party>> {
    match (self.person, self.organization) {
      (Some(p), None) => Ok(p.into_person()?.map(Party::Person)),
      (None, Some(o)) => Ok(o.into_organization()?.map(Party::Organization)),
      (None, None) => {
        Err(IntegrityError::Orphaned(decode_uuid(&self.party_id)?).into())
      }
      (Some(_), Some(_)) => Err(
        IntegrityError::DoublySpecialised(decode_uuid(&self.party_id)?).into(),
      ),
    }
  }
}
