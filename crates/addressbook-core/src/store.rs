//! The `AddressBookStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `addressbook-store-sqlite`). Front ends depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  attachment::{Attachment, AttachmentKind, OwnerRef},
  card::ContactCard,
  collection::PartyOrder,
  dates::Dated,
  party::{Organization, Party, PartyKind, Person},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`AddressBookStore::search`].
#[derive(Debug, Clone, Default)]
pub struct PartyQuery {
  /// Substring matched against the search index of every party and every
  /// attachment. `None` matches everything.
  pub text:   Option<String>,
  /// Restrict to these party kinds; empty means all kinds.
  pub kinds:  Vec<PartyKind>,
  pub order:  PartyOrder,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an address book backend.
///
/// Every save is an upsert decided by whether the identity already exists in
/// storage: the first save of an identity stamps `date_added`, later saves
/// keep it and stamp `date_modified`.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait AddressBookStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Parties ───────────────────────────────────────────────────────────

  /// Insert or update a person (and its shared party row).
  ///
  /// Fails with an integrity error if the identity already belongs to an
  /// organization.
  fn save_person(
    &self,
    person: Person,
  ) -> impl Future<Output = Result<Dated<Person>, Self::Error>> + Send + '_;

  /// Insert or update an organization (and its shared party row).
  ///
  /// Fails with an integrity error if the identity already belongs to a
  /// person.
  fn save_organization(
    &self,
    organization: Organization,
  ) -> impl Future<Output = Result<Dated<Organization>, Self::Error>> + Send + '_;

  /// Resolve a party identity to its concrete specialisation. Returns `None`
  /// if no party row exists.
  fn resolve_party(
    &self,
    party_id: Uuid,
  ) -> impl Future<Output = Result<Option<Dated<Party>>, Self::Error>> + Send + '_;

  /// List every party, resolved, ordered by sort name; optionally only one
  /// kind.
  fn list_parties(
    &self,
    kind: Option<PartyKind>,
  ) -> impl Future<Output = Result<Vec<Dated<Party>>, Self::Error>> + Send + '_;

  /// Delete a party, its specialisation and every attachment owned by its
  /// identity. People belonging to a deleted organization lose the reference.
  fn delete_party(
    &self,
    party_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Attachments ───────────────────────────────────────────────────────

  /// Insert or update an attachment. The owner must exist.
  fn save_attachment(
    &self,
    attachment: Attachment,
  ) -> impl Future<Output = Result<Dated<Attachment>, Self::Error>> + Send + '_;

  /// Retrieve one attachment. Returns `None` if not found.
  fn get_attachment(
    &self,
    kind: AttachmentKind,
    attachment_id: Uuid,
  ) -> impl Future<Output = Result<Option<Dated<Attachment>>, Self::Error>>
  + Send
  + '_;

  /// All attachments held by exactly `owner`, oldest first; optionally only
  /// one kind.
  fn list_attachments(
    &self,
    owner: OwnerRef,
    kind: Option<AttachmentKind>,
  ) -> impl Future<Output = Result<Vec<Dated<Attachment>>, Self::Error>> + Send + '_;

  fn delete_attachment(
    &self,
    kind: AttachmentKind,
    attachment_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Materialise the [`ContactCard`] for a party: the resolved party plus
  /// every attachment owned by its identity under any owner tag. Returns
  /// `None` if the party does not exist.
  fn contact_card(
    &self,
    party_id: Uuid,
  ) -> impl Future<Output = Result<Option<ContactCard>, Self::Error>> + Send + '_;

  /// Parties whose own text or any attachment's text matches `query`.
  fn search<'a>(
    &'a self,
    query: &'a PartyQuery,
  ) -> impl Future<Output = Result<Vec<Dated<Party>>, Self::Error>> + Send + 'a;
}
