//! Parties — the contacts of the address book.
//!
//! A party is either a [`Person`] or an [`Organization`]; the two share one
//! identity space (`party_id`). Storage may keep the shared base row and the
//! specialisation row apart, but once loaded a party is always the strict sum
//! type [`Party`], so "neither" and "both" cannot be represented.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Result,
  text::{join_nonblank, max_len, max_len_opt, require},
};

/// Path of the combined people-and-organizations listing.
pub const DASHBOARD_PATH: &str = "/";

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The concrete specialisation of a party.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  EnumString,
  AsRefStr,
  Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PartyKind {
  Person,
  Organization,
}

impl PartyKind {
  /// Path of the listing page for this kind.
  pub fn collection_path(self) -> &'static str {
    match self {
      Self::Person => "/people/",
      Self::Organization => "/organizations/",
    }
  }

  /// Canonical detail-page path for the party `id` of this kind.
  pub fn detail_path(self, id: Uuid) -> String {
    format!("{}{}/", self.collection_path(), id.hyphenated())
  }
}

// ─── Person ──────────────────────────────────────────────────────────────────

/// An individual, optionally belonging to an [`Organization`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub party_id:        Uuid,
  /// Weak "belongs to" reference; cleared when the organization is deleted.
  pub organization_id: Option<Uuid>,
  pub title:           Option<String>,
  pub first_name:      String,
  pub middle_name:     Option<String>,
  pub last_name:       Option<String>,
}

impl Person {
  pub const FIRST_NAME_MAX: usize = 50;
  pub const MIDDLE_NAME_MAX: usize = 50;
  pub const LAST_NAME_MAX: usize = 50;
  pub const TITLE_MAX: usize = 100;

  /// A new person with a fresh identity and only a first name.
  pub fn new(first_name: impl Into<String>) -> Self {
    Self {
      party_id:        Uuid::new_v4(),
      organization_id: None,
      title:           None,
      first_name:      first_name.into(),
      middle_name:     None,
      last_name:       None,
    }
  }

  fn name_fragments(&self) -> [Option<&str>; 3] {
    [
      Some(self.first_name.as_str()),
      self.middle_name.as_deref(),
      self.last_name.as_deref(),
    ]
  }

  /// "first middle last", blank parts omitted.
  pub fn sort_name(&self) -> String { join_nonblank(self.name_fragments()) }

  pub fn search_index(&self) -> String { join_nonblank(self.name_fragments()) }

  pub fn validate(&self) -> Result<()> {
    require("first_name", &self.first_name)?;
    max_len("first_name", &self.first_name, Self::FIRST_NAME_MAX)?;
    max_len_opt("middle_name", self.middle_name.as_deref(), Self::MIDDLE_NAME_MAX)?;
    max_len_opt("last_name", self.last_name.as_deref(), Self::LAST_NAME_MAX)?;
    max_len_opt("title", self.title.as_deref(), Self::TITLE_MAX)
  }
}

impl fmt::Display for Person {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&join_nonblank([
      Some(self.first_name.as_str()),
      self.last_name.as_deref(),
    ]))
  }
}

// ─── Organization ────────────────────────────────────────────────────────────

/// An institution people may be associated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
  pub party_id: Uuid,
  pub name:     String,
}

impl Organization {
  pub const NAME_MAX: usize = 200;

  pub fn new(name: impl Into<String>) -> Self {
    Self { party_id: Uuid::new_v4(), name: name.into() }
  }

  pub fn sort_name(&self) -> String { self.name.clone() }

  pub fn search_index(&self) -> String { self.name.clone() }

  pub fn validate(&self) -> Result<()> {
    require("name", &self.name)?;
    max_len("name", &self.name, Self::NAME_MAX)
  }
}

impl fmt::Display for Organization {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

// ─── Party ───────────────────────────────────────────────────────────────────

/// A party resolved to its one concrete specialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Party {
  Person(Person),
  Organization(Organization),
}

impl Party {
  pub fn party_id(&self) -> Uuid {
    match self {
      Self::Person(p) => p.party_id,
      Self::Organization(o) => o.party_id,
    }
  }

  pub fn kind(&self) -> PartyKind {
    match self {
      Self::Person(_) => PartyKind::Person,
      Self::Organization(_) => PartyKind::Organization,
    }
  }

  /// Ordering key for unified listings.
  pub fn sort_name(&self) -> String {
    match self {
      Self::Person(p) => p.sort_name(),
      Self::Organization(o) => o.sort_name(),
    }
  }

  /// Text fed to the search index for this party.
  pub fn search_index(&self) -> String {
    match self {
      Self::Person(p) => p.search_index(),
      Self::Organization(o) => o.search_index(),
    }
  }

  /// Canonical detail-page path, e.g. `/people/<uuid>/`.
  pub fn detail_path(&self) -> String {
    self.kind().detail_path(self.party_id())
  }

  pub fn validate(&self) -> Result<()> {
    match self {
      Self::Person(p) => p.validate(),
      Self::Organization(o) => o.validate(),
    }
  }
}

impl fmt::Display for Party {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Person(p) => fmt::Display::fmt(p, f),
      Self::Organization(o) => fmt::Display::fmt(o, f),
    }
  }
}

impl From<Person> for Party {
  fn from(p: Person) -> Self { Self::Person(p) }
}

impl From<Organization> for Party {
  fn from(o: Organization) -> Self { Self::Organization(o) }
}
