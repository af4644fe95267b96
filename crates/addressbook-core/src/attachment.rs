//! Attachments — typed contact details hung off any owning entity.
//!
//! An attachment points at its owner through an [`OwnerRef`], a
//! `(kind tag, id)` pair rather than a per-kind foreign key, so one table per
//! attachment kind serves every owner kind.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use url::Url;
use uuid::Uuid;

use crate::{
  Error, Result,
  party::{Party, PartyKind},
  text::{join_nonblank, max_len_opt, max_len, require},
};

// ─── Owner ───────────────────────────────────────────────────────────────────

/// Tag naming the entity kind an attachment belongs to.
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
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OwnerKind {
  /// The shared party base row.
  Party,
  Person,
  Organization,
}

impl OwnerKind {
  /// Every tag an owner reference to a party may carry.
  pub const ALL: [Self; 3] = [Self::Party, Self::Person, Self::Organization];
}

/// A generic reference to the owner of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
  pub kind: OwnerKind,
  pub id:   Uuid,
}

impl OwnerRef {
  pub fn new(kind: OwnerKind, id: Uuid) -> Self { Self { kind, id } }

  pub fn party(id: Uuid) -> Self { Self::new(OwnerKind::Party, id) }

  pub fn person(id: Uuid) -> Self { Self::new(OwnerKind::Person, id) }

  pub fn organization(id: Uuid) -> Self {
    Self::new(OwnerKind::Organization, id)
  }

  /// The party whose contact card this attachment appears on.
  pub fn party_id(&self) -> Uuid {
    match self.kind {
      OwnerKind::Party | OwnerKind::Person | OwnerKind::Organization => {
        self.id
      }
    }
  }
}

impl From<PartyKind> for OwnerKind {
  fn from(k: PartyKind) -> Self {
    match k {
      PartyKind::Person => Self::Person,
      PartyKind::Organization => Self::Organization,
    }
  }
}

impl From<&Party> for OwnerRef {
  fn from(p: &Party) -> Self { Self::new(p.kind().into(), p.party_id()) }
}

impl fmt::Display for OwnerRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind.as_ref(), self.id)
  }
}

// ─── Labels ──────────────────────────────────────────────────────────────────

/// Label for an [`EmailAddress`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmailLabel {
  Main,
  Personal,
  Work,
  Other,
}

/// Label for a [`StreetAddress`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AddressLabel {
  Main,
  Home,
  Work,
  Other,
}

/// Label for a [`PhoneNumber`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PhoneLabel {
  Main,
  Home,
  Work,
  Mobile,
  Fax,
  Other,
}

/// Label for a [`Website`] or an [`ImAccount`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OnlineLabel {
  Work,
  Personal,
  Other,
}

/// The network an [`ImAccount`] lives on.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ImService {
  Aim,
  Msn,
  Icq,
  Jabber,
  Yahoo,
  Skype,
  Qq,
  Sametime,
  GaduGadu,
  GoogleTalk,
  Other,
}

impl ImService {
  /// Human-readable service name.
  pub fn display_name(self) -> &'static str {
    match self {
      Self::Aim => "AIM",
      Self::Msn => "MSN",
      Self::Icq => "ICQ",
      Self::Jabber => "Jabber",
      Self::Yahoo => "Yahoo",
      Self::Skype => "Skype",
      Self::Qq => "QQ",
      Self::Sametime => "Sametime",
      Self::GaduGadu => "Gadu-Gadu",
      Self::GoogleTalk => "Google Talk",
      Self::Other => "Other",
    }
  }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
  pub address: Option<String>,
  pub label:   Option<EmailLabel>,
}

impl EmailAddress {
  pub const ADDRESS_MAX: usize = 100;

  pub fn search_index(&self) -> String {
    join_nonblank([self.address.as_deref()])
  }

  pub fn validate(&self) -> Result<()> {
    let Some(address) = self.address.as_deref() else { return Ok(()) };
    max_len("address", address, Self::ADDRESS_MAX)?;
    if !looks_like_email(address) {
      return Err(Error::Malformed {
        field:    "address",
        expected: "email address",
        value:    address.to_owned(),
      });
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreetAddress {
  pub address: Option<String>,
  pub city:    Option<String>,
  pub state:   Option<String>,
  pub zip:     Option<String>,
  pub label:   Option<AddressLabel>,
}

impl StreetAddress {
  pub const CITY_MAX: usize = 100;
  pub const STATE_MAX: usize = 100;
  pub const ZIP_MAX: usize = 10;

  pub fn search_index(&self) -> String {
    join_nonblank([
      self.address.as_deref(),
      self.city.as_deref(),
      self.state.as_deref(),
      self.zip.as_deref(),
    ])
  }

  pub fn validate(&self) -> Result<()> {
    max_len_opt("city", self.city.as_deref(), Self::CITY_MAX)?;
    max_len_opt("state", self.state.as_deref(), Self::STATE_MAX)?;
    max_len_opt("zip", self.zip.as_deref(), Self::ZIP_MAX)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
  pub number: Option<String>,
  pub label:  Option<PhoneLabel>,
}

impl PhoneNumber {
  pub const NUMBER_MAX: usize = 20;

  pub fn search_index(&self) -> String {
    join_nonblank([self.number.as_deref()])
  }

  pub fn validate(&self) -> Result<()> {
    max_len_opt("number", self.number.as_deref(), Self::NUMBER_MAX)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Website {
  pub name:  Option<String>,
  pub url:   Option<String>,
  pub label: Option<OnlineLabel>,
}

impl Website {
  pub const NAME_MAX: usize = 200;
  pub const URL_MAX: usize = 100;

  pub fn search_index(&self) -> String {
    join_nonblank([self.name.as_deref(), self.url.as_deref()])
  }

  pub fn validate(&self) -> Result<()> {
    max_len_opt("name", self.name.as_deref(), Self::NAME_MAX)?;
    let Some(url) = self.url.as_deref() else { return Ok(()) };
    max_len("url", url, Self::URL_MAX)?;
    if !looks_like_url(url) {
      return Err(Error::Malformed {
        field:    "url",
        expected: "http(s) or ftp(s) URL",
        value:    url.to_owned(),
      });
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImAccount {
  pub username: String,
  pub service:  Option<ImService>,
  pub label:    Option<OnlineLabel>,
}

impl ImAccount {
  pub const USERNAME_MAX: usize = 100;

  pub fn search_index(&self) -> String {
    join_nonblank([Some(self.username.as_str())])
  }

  pub fn validate(&self) -> Result<()> {
    require("username", &self.username)?;
    max_len("username", &self.username, Self::USERNAME_MAX)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
  pub content:        String,
  /// The date the note is about, if any; distinct from when it was added.
  pub reference_date: Option<DateTime<Utc>>,
}

impl Note {
  pub fn search_index(&self) -> String {
    join_nonblank([Some(self.content.as_str())])
  }

  pub fn validate(&self) -> Result<()> { require("content", &self.content) }
}

fn looks_like_email(s: &str) -> bool {
  let Some((local, domain)) = s.split_once('@') else { return false };
  !local.is_empty()
    && !domain.is_empty()
    && !domain.contains('@')
    && !s.chars().any(char::is_whitespace)
    && (domain.contains('.') || domain == "localhost")
    && !domain.starts_with('.')
    && !domain.ends_with('.')
}

fn looks_like_url(s: &str) -> bool {
  if s.chars().any(char::is_whitespace) {
    return false;
  }
  match Url::parse(s) {
    Ok(url) => {
      matches!(url.scheme(), "http" | "https" | "ftp" | "ftps")
        && url.host_str().is_some_and(|host| !host.is_empty())
    }
    Err(_) => false,
  }
}

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Which of the six attachment tables a record lives in.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttachmentKind {
  EmailAddress,
  StreetAddress,
  PhoneNumber,
  Website,
  ImAccount,
  Note,
}

impl AttachmentKind {
  pub const ALL: [Self; 6] = [
    Self::EmailAddress,
    Self::StreetAddress,
    Self::PhoneNumber,
    Self::Website,
    Self::ImAccount,
    Self::Note,
  ];
}

// ─── Detail ──────────────────────────────────────────────────────────────────

/// The typed payload of an attachment. The variant is the attachment kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum AttachmentDetail {
  EmailAddress(EmailAddress),
  StreetAddress(StreetAddress),
  PhoneNumber(PhoneNumber),
  Website(Website),
  ImAccount(ImAccount),
  Note(Note),
}

impl AttachmentDetail {
  pub fn kind(&self) -> AttachmentKind {
    match self {
      Self::EmailAddress(_) => AttachmentKind::EmailAddress,
      Self::StreetAddress(_) => AttachmentKind::StreetAddress,
      Self::PhoneNumber(_) => AttachmentKind::PhoneNumber,
      Self::Website(_) => AttachmentKind::Website,
      Self::ImAccount(_) => AttachmentKind::ImAccount,
      Self::Note(_) => AttachmentKind::Note,
    }
  }

  /// Text fed to the search index for this record.
  pub fn search_index(&self) -> String {
    match self {
      Self::EmailAddress(v) => v.search_index(),
      Self::StreetAddress(v) => v.search_index(),
      Self::PhoneNumber(v) => v.search_index(),
      Self::Website(v) => v.search_index(),
      Self::ImAccount(v) => v.search_index(),
      Self::Note(v) => v.search_index(),
    }
  }

  pub fn validate(&self) -> Result<()> {
    match self {
      Self::EmailAddress(v) => v.validate(),
      Self::StreetAddress(v) => v.validate(),
      Self::PhoneNumber(v) => v.validate(),
      Self::Website(v) => v.validate(),
      Self::ImAccount(v) => v.validate(),
      Self::Note(v) => v.validate(),
    }
  }
}

impl fmt::Display for AttachmentDetail {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let or_blank = |s: &Option<String>| s.clone().unwrap_or_default();
    match self {
      Self::EmailAddress(v) => f.write_str(&or_blank(&v.address)),
      Self::StreetAddress(v) => write!(
        f,
        "{}, {}, {} {}",
        or_blank(&v.address),
        or_blank(&v.city),
        or_blank(&v.state),
        or_blank(&v.zip)
      ),
      Self::PhoneNumber(v) => f.write_str(&or_blank(&v.number)),
      Self::Website(v) => f.write_str(&or_blank(&v.url)),
      Self::ImAccount(v) => match v.service {
        Some(s) => write!(f, "{} ({})", v.username, s.display_name()),
        None => f.write_str(&v.username),
      },
      Self::Note(v) => f.write_str(&v.content),
    }
  }
}

// ─── Attachment ──────────────────────────────────────────────────────────────

/// One contact detail owned by exactly one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  pub attachment_id: Uuid,
  pub owner:         OwnerRef,
  pub detail:        AttachmentDetail,
}

impl Attachment {
  /// A new attachment with a fresh identity.
  pub fn new(owner: OwnerRef, detail: AttachmentDetail) -> Self {
    Self { attachment_id: Uuid::new_v4(), owner, detail }
  }

  pub fn kind(&self) -> AttachmentKind { self.detail.kind() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn street_address_search_index_joins_all_parts() {
    let a = StreetAddress {
      address: Some("1 Main St".into()),
      city:    Some("Springfield".into()),
      state:   Some("IL".into()),
      zip:     Some("62701".into()),
      label:   Some(AddressLabel::Home),
    };
    assert_eq!(a.search_index(), "1 Main St Springfield IL 62701");
    assert_eq!(
      AttachmentDetail::StreetAddress(a).to_string(),
      "1 Main St, Springfield, IL 62701"
    );
  }

  #[test]
  fn street_address_search_index_skips_missing_parts() {
    let a = StreetAddress {
      city: Some("Springfield".into()),
      zip: Some("62701".into()),
      ..Default::default()
    };
    assert_eq!(a.search_index(), "Springfield 62701");
  }

  #[test]
  fn website_search_index_is_name_then_url() {
    let w = Website {
      name:  Some("Acme".into()),
      url:   Some("http://acme.test".into()),
      label: None,
    };
    assert_eq!(w.search_index(), "Acme http://acme.test");
    assert!(w.validate().is_ok());
  }

  #[test]
  fn website_rejects_non_url() {
    let w = Website { url: Some("acme dot test".into()), ..Default::default() };
    assert!(matches!(w.validate(), Err(Error::Malformed { field: "url", .. })));
  }

  #[test]
  fn website_rejects_malformed_hosts() {
    for bad in [
      "http://exa<mple.com/",
      "http://[::1/",
      "https://a..b^c",
      "http://:80/",
      "mailto:someone@acme.test",
    ] {
      let w = Website { url: Some(bad.into()), ..Default::default() };
      assert!(
        matches!(w.validate(), Err(Error::Malformed { field: "url", .. })),
        "{bad} should be rejected"
      );
    }
  }

  #[test]
  fn website_accepts_ftp_schemes() {
    for good in ["ftp://files.acme.test/pub/", "ftps://files.acme.test", "https://[::1]:8080/"] {
      let w = Website { url: Some(good.into()), ..Default::default() };
      assert!(w.validate().is_ok(), "{good} should be accepted");
    }
  }

  #[test]
  fn email_validation() {
    let ok = EmailAddress { address: Some("a@b.test".into()), label: None };
    assert!(ok.validate().is_ok());
    let empty = EmailAddress::default();
    assert!(empty.validate().is_ok());
    for bad in ["nobody", "@b.test", "a@", "a b@c.test", "a@b"] {
      let e = EmailAddress { address: Some(bad.into()), label: None };
      assert!(e.validate().is_err(), "{bad} should be rejected");
    }
  }

  #[test]
  fn im_account_requires_username_and_displays_service() {
    let im = ImAccount {
      username: "jdoe".into(),
      service:  Some(ImService::GoogleTalk),
      label:    None,
    };
    assert!(im.validate().is_ok());
    assert_eq!(
      AttachmentDetail::ImAccount(im).to_string(),
      "jdoe (Google Talk)"
    );

    let blank = ImAccount { username: String::new(), service: None, label: None };
    assert!(matches!(blank.validate(), Err(Error::Required { .. })));
  }

  #[test]
  fn im_service_uses_kebab_case_tags() {
    assert_eq!(ImService::GaduGadu.as_ref(), "gadu-gadu");
    assert_eq!("google-talk".parse::<ImService>().ok(), Some(ImService::GoogleTalk));
    assert!("irc".parse::<ImService>().is_err());
  }

  #[test]
  fn note_requires_content() {
    let n = Note { content: " ".into(), reference_date: None };
    assert!(n.validate().is_err());
  }

  #[test]
  fn attachment_kind_tags_are_snake_case() {
    assert_eq!(AttachmentKind::ImAccount.as_ref(), "im_account");
    assert_eq!(
      "street_address".parse::<AttachmentKind>().ok(),
      Some(AttachmentKind::StreetAddress)
    );
  }

  #[test]
  fn owner_refs_map_to_their_party() {
    let id = Uuid::new_v4();
    for owner in [OwnerRef::party(id), OwnerRef::person(id), OwnerRef::organization(id)] {
      assert_eq!(owner.party_id(), id);
    }
  }
}
