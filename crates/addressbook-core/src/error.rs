//! Error types for `addressbook-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::party::PartyKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{field} is required")]
  Required { field: &'static str },

  #[error("{field} must be at most {max} characters (got {len})")]
  TooLong {
    field: &'static str,
    max:   usize,
    len:   usize,
  },

  #[error("{field} is not a valid {expected}: {value:?}")]
  Malformed {
    field:    &'static str,
    expected: &'static str,
    value:    String,
  },

  #[error("unknown {field} value: {value:?}")]
  UnknownVariant { field: &'static str, value: String },
}

/// A party whose stored rows break the "exactly one specialisation" rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IntegrityError {
  #[error("party {0} has neither a person nor an organization row")]
  Orphaned(Uuid),

  #[error("party {0} has both a person and an organization row")]
  DoublySpecialised(Uuid),

  #[error("party {id} is a {existing}; it cannot be saved as a {requested}")]
  KindConflict {
    id:        Uuid,
    existing:  PartyKind,
    requested: PartyKind,
  },
}

impl IntegrityError {
  pub fn party_id(&self) -> Uuid {
    match *self {
      Self::Orphaned(id) | Self::DoublySpecialised(id) => id,
      Self::KindConflict { id, .. } => id,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
