//! [`SqliteStore`] — the SQLite implementation of [`AddressBookStore`].

use std::path::Path;

use addressbook_core::{
  IntegrityError,
  attachment::{Attachment, AttachmentKind, OwnerKind, OwnerRef},
  card::{Attachments, ContactCard},
  collection::{OrphanPolicy, PartyOrder, order_parties},
  dates::{Dated, Timestamps, stamp},
  party::{Organization, Party, PartyKind, Person},
  store::{AddressBookStore, PartyQuery},
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, Transaction, params};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawAttachment, RawOrganization, RawParty, RawPerson, attachment_payload,
    decode_dt, encode_dt, encode_tag, encode_uuid,
  },
  schema::{ATTACHMENT_HEAD, SCHEMA, attachment_table, payload_columns},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An address book backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  orphan_policy:   OrphanPolicy,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self { conn, orphan_policy: OrphanPolicy::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Choose how listings treat parties that fail to resolve.
  pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
    self.orphan_policy = policy;
    self
  }

  pub fn orphan_policy(&self) -> OrphanPolicy { self.orphan_policy }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside one transaction, committing only if it succeeds.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let out = f(&tx);
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Resolve raw party rows, applying the orphan policy to failures.
  fn resolve_all(&self, raws: Vec<RawParty>) -> Result<Vec<Dated<Party>>> {
    let mut parties = Vec::with_capacity(raws.len());
    for raw in raws {
      match raw.into_party() {
        Ok(party) => parties.push(party),
        Err(Error::Integrity(e)) => {
          error!(party_id = %e.party_id(), error = %e, "unresolvable party in listing");
          if self.orphan_policy == OrphanPolicy::Fail {
            return Err(e.into());
          }
        }
        Err(e) => return Err(e),
      }
    }
    Ok(parties)
  }
}

// ─── Row access ──────────────────────────────────────────────────────────────

const PARTY_SELECT: &str = "
  SELECT p.party_id,
         pe.party_id, pe.organization_id, pe.title, pe.first_name,
         pe.middle_name, pe.last_name, pe.date_added, pe.date_modified,
         o.party_id, o.name, o.date_added, o.date_modified
  FROM parties p
  LEFT JOIN persons       pe ON pe.party_id = p.party_id
  LEFT JOIN organizations o  ON o.party_id  = p.party_id";

fn party_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawParty> {
  let person = match row.get::<_, Option<String>>(1)? {
    Some(party_id) => Some(RawPerson {
      party_id,
      organization_id: row.get(2)?,
      title:           row.get(3)?,
      first_name:      row.get(4)?,
      middle_name:     row.get(5)?,
      last_name:       row.get(6)?,
      date_added:      row.get(7)?,
      date_modified:   row.get(8)?,
    }),
    None => None,
  };
  let organization = match row.get::<_, Option<String>>(9)? {
    Some(party_id) => Some(RawOrganization {
      party_id,
      name:          row.get(10)?,
      date_added:    row.get(11)?,
      date_modified: row.get(12)?,
    }),
    None => None,
  };
  Ok(RawParty { party_id: row.get(0)?, person, organization })
}

fn fetch_parties(
  conn: &Connection,
  filter: &str,
  params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<RawParty>> {
  let mut stmt = conn.prepare(&format!("{PARTY_SELECT} {filter}"))?;
  let rows = stmt
    .query_map(params, party_from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn attachment_select(kind: AttachmentKind) -> String {
  format!(
    "SELECT {}, {} FROM {}",
    ATTACHMENT_HEAD.join(", "),
    payload_columns(kind).join(", "),
    attachment_table(kind)
  )
}

fn attachment_from_row(
  kind: AttachmentKind,
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawAttachment> {
  let head = ATTACHMENT_HEAD.len();
  let payload = (0..payload_columns(kind).len())
    .map(|i| row.get(head + i))
    .collect::<rusqlite::Result<Vec<Option<String>>>>()?;
  Ok(RawAttachment {
    attachment_id: row.get(0)?,
    owner_kind: row.get(1)?,
    owner_id: row.get(2)?,
    date_added: row.get(3)?,
    date_modified: row.get(4)?,
    payload,
  })
}

/// Read attachments of each of `kinds` matching `filter`.
fn fetch_attachments(
  conn: &Connection,
  kinds: &[AttachmentKind],
  filter: &str,
  params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Dated<Attachment>>> {
  let mut raws = Vec::new();
  for &kind in kinds {
    let mut stmt =
      conn.prepare(&format!("{} {filter}", attachment_select(kind)))?;
    for row in stmt.query_map(params, |row| attachment_from_row(kind, row))? {
      raws.push((kind, row?));
    }
  }

  let mut attachments = raws
    .into_iter()
    .map(|(kind, raw)| raw.into_attachment(kind))
    .collect::<Result<Vec<_>>>()?;
  attachments.sort_by(|a, b| {
    a.date_added()
      .cmp(&b.date_added())
      .then_with(|| a.attachment_id.cmp(&b.attachment_id))
  });
  Ok(attachments)
}

fn row_exists(
  conn: &Connection,
  table: &str,
  key: &str,
  id: &str,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        &format!("SELECT 1 FROM {table} WHERE {key} = ?1"),
        params![id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

/// The table an owner reference of `kind` points into.
fn owner_table(kind: OwnerKind) -> &'static str {
  match kind {
    OwnerKind::Party => "parties",
    OwnerKind::Person => "persons",
    OwnerKind::Organization => "organizations",
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Stamp and upsert one row of `table` keyed by `key = id`.
///
/// Every entity and attachment save goes through here: the stored
/// `date_added` (if a row exists) decides between insert and update.
/// `columns`/`values` exclude the key and the two date columns.
fn upsert(
  tx: &Transaction<'_>,
  table: &str,
  key: &str,
  id: &str,
  columns: &[&str],
  values: Vec<Option<String>>,
  now: DateTime<Utc>,
) -> Result<Timestamps> {
  let stored: Option<String> = tx
    .query_row(
      &format!("SELECT date_added FROM {table} WHERE {key} = ?1"),
      params![id],
      |r| r.get(0),
    )
    .optional()?;
  let dates = stamp(stored.as_deref().map(decode_dt).transpose()?, now);

  let mut all_columns = Vec::with_capacity(columns.len() + 3);
  all_columns.push(key);
  all_columns.extend_from_slice(columns);
  all_columns.extend(["date_added", "date_modified"]);

  let placeholders = (1..=all_columns.len())
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ");
  let updates = all_columns[1..]
    .iter()
    .map(|c| format!("{c} = excluded.{c}"))
    .collect::<Vec<_>>()
    .join(", ");
  let sql = format!(
    "INSERT INTO {table} ({}) VALUES ({placeholders})
     ON CONFLICT({key}) DO UPDATE SET {updates}",
    all_columns.join(", ")
  );

  let mut row = Vec::with_capacity(all_columns.len());
  row.push(Some(id.to_owned()));
  row.extend(values);
  row.push(Some(encode_dt(dates.date_added)));
  row.push(dates.date_modified.map(encode_dt));
  tx.execute(&sql, rusqlite::params_from_iter(row))?;

  Ok(dates)
}

/// Replace the search-index entry for one entity.
fn index_entry(
  tx: &Transaction<'_>,
  entity_kind: &str,
  entity_id: &str,
  party_id: &str,
  body: &str,
) -> rusqlite::Result<()> {
  tx.execute(
    "INSERT OR REPLACE INTO search_entries (entity_kind, entity_id, party_id, body)
     VALUES (?1, ?2, ?3, ?4)",
    params![entity_kind, entity_id, party_id, body],
  )?;
  Ok(())
}

/// Ensure the shared party row exists and that no other specialisation holds
/// the identity.
fn claim_party(
  tx: &Transaction<'_>,
  party_id: Uuid,
  requested: PartyKind,
) -> Result<()> {
  let id = encode_uuid(party_id);
  let (other, other_table) = match requested {
    PartyKind::Person => (PartyKind::Organization, "organizations"),
    PartyKind::Organization => (PartyKind::Person, "persons"),
  };
  if row_exists(tx, other_table, "party_id", &id)? {
    return Err(
      IntegrityError::KindConflict { id: party_id, existing: other, requested }
        .into(),
    );
  }
  tx.execute(
    "INSERT OR IGNORE INTO parties (party_id) VALUES (?1)",
    params![id],
  )?;
  Ok(())
}

fn write_person(
  tx: &Transaction<'_>,
  person: &Person,
  now: DateTime<Utc>,
) -> Result<Timestamps> {
  if let Some(org_id) = person.organization_id
    && !row_exists(tx, "organizations", "party_id", &encode_uuid(org_id))?
  {
    return Err(Error::OrganizationNotFound(org_id));
  }
  claim_party(tx, person.party_id, PartyKind::Person)?;

  let id = encode_uuid(person.party_id);
  let dates = upsert(
    tx,
    "persons",
    "party_id",
    &id,
    &["organization_id", "title", "first_name", "middle_name", "last_name"],
    vec![
      person.organization_id.map(encode_uuid),
      person.title.clone(),
      Some(person.first_name.clone()),
      person.middle_name.clone(),
      person.last_name.clone(),
    ],
    now,
  )?;
  index_entry(tx, PartyKind::Person.as_ref(), &id, &id, &person.search_index())?;
  Ok(dates)
}

fn write_organization(
  tx: &Transaction<'_>,
  organization: &Organization,
  now: DateTime<Utc>,
) -> Result<Timestamps> {
  claim_party(tx, organization.party_id, PartyKind::Organization)?;

  let id = encode_uuid(organization.party_id);
  let dates = upsert(
    tx,
    "organizations",
    "party_id",
    &id,
    &["name"],
    vec![Some(organization.name.clone())],
    now,
  )?;
  index_entry(
    tx,
    PartyKind::Organization.as_ref(),
    &id,
    &id,
    &organization.search_index(),
  )?;
  Ok(dates)
}

fn write_attachment(
  tx: &Transaction<'_>,
  attachment: &Attachment,
  now: DateTime<Utc>,
) -> Result<Timestamps> {
  let owner = attachment.owner;
  if !row_exists(tx, owner_table(owner.kind), "party_id", &encode_uuid(owner.id))? {
    return Err(Error::OwnerNotFound(owner));
  }

  let kind = attachment.kind();
  let id = encode_uuid(attachment.attachment_id);

  let mut columns = vec!["owner_kind", "owner_id"];
  columns.extend_from_slice(payload_columns(kind));
  let mut values = vec![Some(encode_tag(owner.kind)), Some(encode_uuid(owner.id))];
  values.extend(attachment_payload(&attachment.detail));

  let dates = upsert(
    tx,
    attachment_table(kind),
    "attachment_id",
    &id,
    &columns,
    values,
    now,
  )?;
  index_entry(
    tx,
    kind.as_ref(),
    &id,
    &encode_uuid(owner.party_id()),
    &attachment.detail.search_index(),
  )?;
  Ok(dates)
}

/// Escape `text` for a `LIKE ... ESCAPE '\'` substring match.
fn like_pattern(text: &str) -> String {
  let escaped = text
    .replace('\\', "\\\\")
    .replace('%', "\\%")
    .replace('_', "\\_");
  format!("%{escaped}%")
}

// ─── AddressBookStore impl ───────────────────────────────────────────────────

impl AddressBookStore for SqliteStore {
  type Error = Error;

  // ── Parties ───────────────────────────────────────────────────────────────

  async fn save_person(&self, person: Person) -> Result<Dated<Person>> {
    person.validate()?;
    let now = Utc::now();

    let saved = self
      .write(move |tx| {
        let dates = write_person(tx, &person, now)?;
        Ok(Dated::new(person, dates))
      })
      .await?;

    info!(
      party_id = %saved.party_id,
      created = saved.date_modified().is_none(),
      "saved person"
    );
    Ok(saved)
  }

  async fn save_organization(
    &self,
    organization: Organization,
  ) -> Result<Dated<Organization>> {
    organization.validate()?;
    let now = Utc::now();

    let saved = self
      .write(move |tx| {
        let dates = write_organization(tx, &organization, now)?;
        Ok(Dated::new(organization, dates))
      })
      .await?;

    info!(
      party_id = %saved.party_id,
      created = saved.date_modified().is_none(),
      "saved organization"
    );
    Ok(saved)
  }

  async fn resolve_party(&self, party_id: Uuid) -> Result<Option<Dated<Party>>> {
    let id = encode_uuid(party_id);

    let raw = self
      .read(move |conn| {
        Ok(fetch_parties(conn, "WHERE p.party_id = ?1", params![id])?.pop())
      })
      .await?;

    let Some(raw) = raw else {
      debug!(%party_id, "party not found");
      return Ok(None);
    };

    match raw.into_party() {
      Ok(party) => Ok(Some(party)),
      Err(Error::Integrity(e)) => {
        error!(%party_id, error = %e, "party failed to resolve");
        Err(e.into())
      }
      Err(e) => Err(e),
    }
  }

  async fn list_parties(
    &self,
    kind: Option<PartyKind>,
  ) -> Result<Vec<Dated<Party>>> {
    let raws = self
      .read(|conn| fetch_parties(conn, "", params![]))
      .await?;

    let mut parties = self.resolve_all(raws)?;
    if let Some(kind) = kind {
      parties.retain(|p| p.kind() == kind);
    }
    order_parties(&mut parties, PartyOrder::SortName);

    debug!(count = parties.len(), ?kind, "listed parties");
    Ok(parties)
  }

  async fn delete_party(&self, party_id: Uuid) -> Result<()> {
    let id = encode_uuid(party_id);

    let removed = self
      .write(move |tx| {
        if !row_exists(tx, "parties", "party_id", &id)? {
          return Err(Error::PartyNotFound(party_id));
        }

        let [a, b, c] = OwnerKind::ALL.map(encode_tag);
        let mut removed = 0;
        for kind in AttachmentKind::ALL {
          removed += tx.execute(
            &format!(
              "DELETE FROM {} WHERE owner_id = ?1 AND owner_kind IN (?2, ?3, ?4)",
              attachment_table(kind)
            ),
            params![id, a, b, c],
          )?;
        }
        tx.execute(
          "DELETE FROM search_entries WHERE party_id = ?1",
          params![id],
        )?;
        // Cascades to persons/organizations and clears persons.organization_id.
        tx.execute("DELETE FROM parties WHERE party_id = ?1", params![id])?;
        Ok(removed)
      })
      .await?;

    info!(%party_id, attachments = removed, "deleted party");
    Ok(())
  }

  // ── Attachments ───────────────────────────────────────────────────────────

  async fn save_attachment(
    &self,
    attachment: Attachment,
  ) -> Result<Dated<Attachment>> {
    attachment.detail.validate()?;
    let now = Utc::now();

    let saved = self
      .write(move |tx| {
        let dates = write_attachment(tx, &attachment, now)?;
        Ok(Dated::new(attachment, dates))
      })
      .await?;

    info!(
      attachment_id = %saved.attachment_id,
      kind = saved.kind().as_ref(),
      owner = %saved.owner,
      created = saved.date_modified().is_none(),
      "saved attachment"
    );
    Ok(saved)
  }

  async fn get_attachment(
    &self,
    kind: AttachmentKind,
    attachment_id: Uuid,
  ) -> Result<Option<Dated<Attachment>>> {
    let id = encode_uuid(attachment_id);

    let mut found = self
      .read(move |conn| {
        fetch_attachments(conn, &[kind], "WHERE attachment_id = ?1", params![id])
      })
      .await?;

    Ok(found.pop())
  }

  async fn list_attachments(
    &self,
    owner: OwnerRef,
    kind: Option<AttachmentKind>,
  ) -> Result<Vec<Dated<Attachment>>> {
    let kinds = kind.map_or(AttachmentKind::ALL.to_vec(), |k| vec![k]);
    let owner_kind = encode_tag(owner.kind);
    let owner_id = encode_uuid(owner.id);

    let attachments = self
      .read(move |conn| {
        fetch_attachments(
          conn,
          &kinds,
          "WHERE owner_kind = ?1 AND owner_id = ?2",
          params![owner_kind, owner_id],
        )
      })
      .await?;

    debug!(%owner, count = attachments.len(), "listed attachments");
    Ok(attachments)
  }

  async fn delete_attachment(
    &self,
    kind: AttachmentKind,
    attachment_id: Uuid,
  ) -> Result<()> {
    let id = encode_uuid(attachment_id);

    self
      .write(move |tx| {
        let deleted = tx.execute(
          &format!("DELETE FROM {} WHERE attachment_id = ?1", attachment_table(kind)),
          params![id],
        )?;
        if deleted == 0 {
          return Err(Error::AttachmentNotFound { kind, id: attachment_id });
        }
        tx.execute(
          "DELETE FROM search_entries WHERE entity_kind = ?1 AND entity_id = ?2",
          params![kind.as_ref(), id],
        )?;
        Ok(())
      })
      .await?;

    info!(%attachment_id, kind = kind.as_ref(), "deleted attachment");
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn contact_card(&self, party_id: Uuid) -> Result<Option<ContactCard>> {
    let party = match self.resolve_party(party_id).await? {
      Some(p) => p,
      None => return Ok(None),
    };

    let id = encode_uuid(party_id);
    let attachments = self
      .read(move |conn| {
        let [a, b, c] = OwnerKind::ALL.map(encode_tag);
        fetch_attachments(
          conn,
          &AttachmentKind::ALL,
          "WHERE owner_id = ?1 AND owner_kind IN (?2, ?3, ?4)",
          params![id, a, b, c],
        )
      })
      .await?;

    Ok(Some(ContactCard::new(
      party,
      attachments.into_iter().collect::<Attachments>(),
    )))
  }

  async fn search(&self, query: &PartyQuery) -> Result<Vec<Dated<Party>>> {
    let pattern = query.text.as_deref().map(like_pattern);

    let raws = self
      .read(move |conn| match pattern {
        Some(pattern) => fetch_parties(
          conn,
          "WHERE p.party_id IN (
             SELECT party_id FROM search_entries WHERE body LIKE ?1 ESCAPE '\\'
           )",
          params![pattern],
        ),
        None => fetch_parties(conn, "", params![]),
      })
      .await?;

    let mut parties = self.resolve_all(raws)?;
    if !query.kinds.is_empty() {
      parties.retain(|p| query.kinds.contains(&p.kind()));
    }
    order_parties(&mut parties, query.order);

    let parties: Vec<_> = parties
      .into_iter()
      .skip(query.offset.unwrap_or(0))
      .take(query.limit.unwrap_or(usize::MAX))
      .collect();

    debug!(text = ?query.text, count = parties.len(), "searched parties");
    Ok(parties)
  }
}
