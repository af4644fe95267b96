//! SQL schema for the address book SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

use addressbook_core::attachment::AttachmentKind;

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- The shared base row. Exactly one of persons/organizations must hold a row
-- with the same party_id.
CREATE TABLE IF NOT EXISTS parties (
    party_id    TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS organizations (
    party_id      TEXT PRIMARY KEY REFERENCES parties(party_id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    date_added    TEXT NOT NULL,   -- RFC 3339 UTC; set once
    date_modified TEXT             -- NULL until the first update
);

CREATE TABLE IF NOT EXISTS persons (
    party_id        TEXT PRIMARY KEY REFERENCES parties(party_id) ON DELETE CASCADE,
    organization_id TEXT REFERENCES organizations(party_id) ON DELETE SET NULL,
    title           TEXT,
    first_name      TEXT NOT NULL,
    middle_name     TEXT,
    last_name       TEXT,
    date_added      TEXT NOT NULL,
    date_modified   TEXT
);

-- Attachment tables. owner_kind/owner_id form a generic reference, so no
-- foreign key is declared; cascade on owner deletion is done by the store.
CREATE TABLE IF NOT EXISTS email_addresses (
    attachment_id TEXT PRIMARY KEY,
    owner_kind    TEXT NOT NULL,   -- 'party' | 'person' | 'organization'
    owner_id      TEXT NOT NULL,
    date_added    TEXT NOT NULL,
    date_modified TEXT,
    label         TEXT,
    address       TEXT
);

CREATE TABLE IF NOT EXISTS street_addresses (
    attachment_id TEXT PRIMARY KEY,
    owner_kind    TEXT NOT NULL,
    owner_id      TEXT NOT NULL,
    date_added    TEXT NOT NULL,
    date_modified TEXT,
    label         TEXT,
    address       TEXT,
    city          TEXT,
    state         TEXT,
    zip           TEXT
);

CREATE TABLE IF NOT EXISTS phone_numbers (
    attachment_id TEXT PRIMARY KEY,
    owner_kind    TEXT NOT NULL,
    owner_id      TEXT NOT NULL,
    date_added    TEXT NOT NULL,
    date_modified TEXT,
    label         TEXT,
    number        TEXT
);

CREATE TABLE IF NOT EXISTS websites (
    attachment_id TEXT PRIMARY KEY,
    owner_kind    TEXT NOT NULL,
    owner_id      TEXT NOT NULL,
    date_added    TEXT NOT NULL,
    date_modified TEXT,
    label         TEXT,
    name          TEXT,
    url           TEXT
);

CREATE TABLE IF NOT EXISTS im_accounts (
    attachment_id TEXT PRIMARY KEY,
    owner_kind    TEXT NOT NULL,
    owner_id      TEXT NOT NULL,
    date_added    TEXT NOT NULL,
    date_modified TEXT,
    label         TEXT,
    username      TEXT NOT NULL,
    service       TEXT
);

CREATE TABLE IF NOT EXISTS notes (
    attachment_id  TEXT PRIMARY KEY,
    owner_kind     TEXT NOT NULL,
    owner_id       TEXT NOT NULL,
    date_added     TEXT NOT NULL,
    date_modified  TEXT,
    label          TEXT,           -- always NULL; keeps the column layout uniform
    content        TEXT NOT NULL,
    reference_date TEXT
);

-- One row per indexed entity; rewritten on every save.
CREATE TABLE IF NOT EXISTS search_entries (
    entity_kind TEXT NOT NULL,     -- party kind or attachment kind
    entity_id   TEXT NOT NULL,
    party_id    TEXT NOT NULL,
    body        TEXT NOT NULL,
    PRIMARY KEY (entity_kind, entity_id)
);

CREATE INDEX IF NOT EXISTS persons_org_idx         ON persons(organization_id);
CREATE INDEX IF NOT EXISTS email_addresses_owner   ON email_addresses(owner_id, owner_kind);
CREATE INDEX IF NOT EXISTS street_addresses_owner  ON street_addresses(owner_id, owner_kind);
CREATE INDEX IF NOT EXISTS phone_numbers_owner     ON phone_numbers(owner_id, owner_kind);
CREATE INDEX IF NOT EXISTS websites_owner          ON websites(owner_id, owner_kind);
CREATE INDEX IF NOT EXISTS im_accounts_owner       ON im_accounts(owner_id, owner_kind);
CREATE INDEX IF NOT EXISTS notes_owner             ON notes(owner_id, owner_kind);
CREATE INDEX IF NOT EXISTS search_entries_party    ON search_entries(party_id);

PRAGMA user_version = 1;
";

/// Table holding attachments of `kind`.
pub fn attachment_table(kind: AttachmentKind) -> &'static str {
  match kind {
    AttachmentKind::EmailAddress => "email_addresses",
    AttachmentKind::StreetAddress => "street_addresses",
    AttachmentKind::PhoneNumber => "phone_numbers",
    AttachmentKind::Website => "websites",
    AttachmentKind::ImAccount => "im_accounts",
    AttachmentKind::Note => "notes",
  }
}

/// Kind-specific payload columns of an attachment table, in the order
/// produced by `encode::attachment_payload` (the leading `label` included).
pub fn payload_columns(kind: AttachmentKind) -> &'static [&'static str] {
  match kind {
    AttachmentKind::EmailAddress => &["label", "address"],
    AttachmentKind::StreetAddress => {
      &["label", "address", "city", "state", "zip"]
    }
    AttachmentKind::PhoneNumber => &["label", "number"],
    AttachmentKind::Website => &["label", "name", "url"],
    AttachmentKind::ImAccount => &["label", "username", "service"],
    AttachmentKind::Note => &["label", "content", "reference_date"],
  }
}

/// Columns shared by every attachment table, in select order.
pub const ATTACHMENT_HEAD: [&str; 5] =
  ["attachment_id", "owner_kind", "owner_id", "date_added", "date_modified"];
