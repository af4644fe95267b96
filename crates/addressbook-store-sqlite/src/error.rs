//! Error type for `addressbook-store-sqlite`.

use addressbook_core::{
  IntegrityError,
  attachment::{AttachmentKind, OwnerRef},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Validation failures and unknown stored tags.
  #[error("core error: {0}")]
  Core(#[from] addressbook_core::Error),

  #[error("integrity violation: {0}")]
  Integrity(#[from] IntegrityError),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("party not found: {0}")]
  PartyNotFound(uuid::Uuid),

  /// A person referenced an organization that does not exist.
  #[error("organization not found: {0}")]
  OrganizationNotFound(uuid::Uuid),

  #[error("{} not found: {id}", .kind.as_ref())]
  AttachmentNotFound { kind: AttachmentKind, id: uuid::Uuid },

  /// The owner named by an attachment does not exist.
  #[error("owner not found: {0}")]
  OwnerNotFound(OwnerRef),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
