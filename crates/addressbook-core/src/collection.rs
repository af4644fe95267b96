//! Unified party listings: ordering and integrity policy.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::{dates::Dated, party::Party};

/// The key a listing is ordered by.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PartyOrder {
  /// [`Party::sort_name`], compared byte-wise (so case-sensitive).
  #[default]
  SortName,
  /// Oldest first.
  DateAdded,
}

/// What a listing does with a party row that resolves to neither or both
/// specialisations.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrphanPolicy {
  /// Drop the party from the result and log it.
  #[default]
  Skip,
  /// Fail the whole listing.
  Fail,
}

/// Sort `parties` by `order`, breaking ties by party identity.
pub fn order_parties(parties: &mut [Dated<Party>], order: PartyOrder) {
  match order {
    PartyOrder::SortName => {
      // Compute each key once rather than per comparison.
      parties.sort_by_cached_key(|p| (p.sort_name(), p.party_id()));
    }
    PartyOrder::DateAdded => parties.sort_by(|a, b| {
      a.date_added()
        .cmp(&b.date_added())
        .then_with(|| a.party_id().cmp(&b.party_id()))
    }),
  }
}
