//! Audit timestamps shared by every persisted entity and attachment.
//!
//! Every save path funnels through [`stamp`]. The caller passes the
//! `date_added` value currently held in storage for the record's identity
//! (looked up inside the write transaction), never the value carried by the
//! in-memory record, so a pre-assigned identity on a brand-new record is still
//! treated as an insert.

use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The pair of audit timestamps carried by a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
  /// Set once, when the record is first inserted.
  pub date_added:    DateTime<Utc>,
  /// `None` until the first update; then the time of the latest update.
  pub date_modified: Option<DateTime<Utc>>,
}

/// Compute the timestamps for a save happening at `now`.
///
/// `stored_date_added` is `Some` exactly when a row with the same identity
/// already exists in storage.
pub fn stamp(
  stored_date_added: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
) -> Timestamps {
  match stored_date_added {
    None => Timestamps { date_added: now, date_modified: None },
    Some(date_added) => Timestamps { date_added, date_modified: Some(now) },
  }
}

/// A stored record together with its audit timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dated<T> {
  #[serde(flatten)]
  pub record: T,
  #[serde(flatten)]
  pub dates:  Timestamps,
}

impl<T> Dated<T> {
  pub fn new(record: T, dates: Timestamps) -> Self { Self { record, dates } }

  pub fn date_added(&self) -> DateTime<Utc> { self.dates.date_added }

  pub fn date_modified(&self) -> Option<DateTime<Utc>> {
    self.dates.date_modified
  }

  pub fn into_inner(self) -> T { self.record }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Dated<U> {
    Dated { record: f(self.record), dates: self.dates }
  }
}

impl<T> Deref for Dated<T> {
  type Target = T;

  fn deref(&self) -> &T { &self.record }
}
