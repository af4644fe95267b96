//! Integration tests for `SqliteStore` against an in-memory database.

use std::time::Duration;

use addressbook_core::{
  IntegrityError,
  attachment::{
    Attachment, AttachmentDetail, AttachmentKind, EmailAddress, EmailLabel,
    ImAccount, ImService, Note, OnlineLabel, OwnerRef, PhoneLabel, PhoneNumber,
    StreetAddress, Website,
  },
  collection::{OrphanPolicy, PartyOrder},
  party::{Organization, Party, PartyKind, Person},
  store::{AddressBookStore, PartyQuery},
};
use uuid::Uuid;

use crate::{Error, SqliteStore, encode::encode_uuid};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn person(first: &str, last: Option<&str>) -> Person {
  Person { last_name: last.map(Into::into), ..Person::new(first) }
}

fn email(owner: OwnerRef, address: &str) -> Attachment {
  Attachment::new(
    owner,
    AttachmentDetail::EmailAddress(EmailAddress {
      address: Some(address.into()),
      label:   Some(EmailLabel::Work),
    }),
  )
}

fn note(owner: OwnerRef, content: &str) -> Attachment {
  Attachment::new(
    owner,
    AttachmentDetail::Note(Note { content: content.into(), reference_date: None }),
  )
}

/// Insert rows directly, bypassing the store's write paths.
async fn raw_sql(s: &SqliteStore, sql: String) {
  s.conn
    .call(move |conn| {
      conn.execute_batch(&sql)?;
      Ok(())
    })
    .await
    .unwrap();
}

async fn tick() { tokio::time::sleep(Duration::from_millis(5)).await }

// ─── Parties ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_and_resolve_person() {
  let s = store().await;

  let saved = s.save_person(person("Alice", Some("Zed"))).await.unwrap();
  assert!(saved.date_modified().is_none());

  let party = s.resolve_party(saved.party_id).await.unwrap().unwrap();
  match &*party {
    Party::Person(p) => {
      assert_eq!(p.first_name, "Alice");
      assert_eq!(p.last_name.as_deref(), Some("Zed"));
    }
    other => panic!("expected a person, got {other:?}"),
  }
  assert_eq!(party.date_added(), saved.date_added());
  assert_eq!(party.detail_path(), format!("/people/{}/", saved.party_id));
}

#[tokio::test]
async fn save_and_resolve_organization() {
  let s = store().await;

  let saved = s.save_organization(Organization::new("Acme")).await.unwrap();
  let party = s.resolve_party(saved.party_id).await.unwrap().unwrap();

  assert_eq!(party.kind(), PartyKind::Organization);
  assert_eq!(party.sort_name(), "Acme");
  assert_eq!(
    party.detail_path(),
    format!("/organizations/{}/", saved.party_id)
  );
}

#[tokio::test]
async fn resolve_missing_party_returns_none() {
  let s = store().await;
  assert!(s.resolve_party(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn resolve_orphaned_party_is_integrity_error() {
  let s = store().await;
  let id = Uuid::new_v4();
  raw_sql(
    &s,
    format!("INSERT INTO parties (party_id) VALUES ('{}');", encode_uuid(id)),
  )
  .await;

  let err = s.resolve_party(id).await.unwrap_err();
  assert!(matches!(err, Error::Integrity(IntegrityError::Orphaned(got)) if got == id));
}

#[tokio::test]
async fn resolve_doubly_specialised_party_is_integrity_error() {
  let s = store().await;
  let saved = s.save_person(Person::new("Alice")).await.unwrap();
  raw_sql(
    &s,
    format!(
      "INSERT INTO organizations (party_id, name, date_added)
       VALUES ('{}', 'Acme', '2024-01-01T00:00:00+00:00');",
      encode_uuid(saved.party_id)
    ),
  )
  .await;

  let err = s.resolve_party(saved.party_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Integrity(IntegrityError::DoublySpecialised(_))
  ));
}

#[tokio::test]
async fn identity_cannot_change_kind() {
  let s = store().await;
  let org = s.save_organization(Organization::new("Acme")).await.unwrap();

  let clash = Person { party_id: org.party_id, ..Person::new("Alice") };
  let err = s.save_person(clash).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Integrity(IntegrityError::KindConflict {
      existing: PartyKind::Organization,
      requested: PartyKind::Person,
      ..
    })
  ));

  // The organization is untouched.
  let party = s.resolve_party(org.party_id).await.unwrap().unwrap();
  assert_eq!(party.kind(), PartyKind::Organization);
}

#[tokio::test]
async fn invalid_person_is_rejected_before_storage() {
  let s = store().await;
  let blank = Person::new("   ");

  let err = s.save_person(blank.clone()).await.unwrap_err();
  assert!(matches!(err, Error::Core(_)));
  assert!(s.resolve_party(blank.party_id).await.unwrap().is_none());

  let long = Person::new("x".repeat(Person::FIRST_NAME_MAX + 1));
  assert!(matches!(s.save_person(long).await, Err(Error::Core(_))));
}

#[tokio::test]
async fn person_must_reference_existing_organization() {
  let s = store().await;
  let missing = Uuid::new_v4();
  let p = Person { organization_id: Some(missing), ..Person::new("Alice") };

  let err = s.save_person(p).await.unwrap_err();
  assert!(matches!(err, Error::OrganizationNotFound(id) if id == missing));
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_parties_orders_by_sort_name_across_kinds() {
  let s = store().await;
  s.save_person(person("Bob", Some("Young"))).await.unwrap();
  s.save_organization(Organization::new("Acme")).await.unwrap();
  s.save_person(person("Alice", Some("Zed"))).await.unwrap();

  let names: Vec<_> = s
    .list_parties(None)
    .await
    .unwrap()
    .iter()
    .map(|p| p.sort_name())
    .collect();
  assert_eq!(names, ["Acme", "Alice Zed", "Bob Young"]);
}

#[tokio::test]
async fn list_parties_filtered_by_kind() {
  let s = store().await;
  s.save_person(Person::new("Alice")).await.unwrap();
  s.save_organization(Organization::new("Acme")).await.unwrap();
  s.save_person(Person::new("Bob")).await.unwrap();

  let people = s.list_parties(Some(PartyKind::Person)).await.unwrap();
  assert_eq!(people.len(), 2);
  assert!(people.iter().all(|p| p.kind() == PartyKind::Person));

  let orgs = s.list_parties(Some(PartyKind::Organization)).await.unwrap();
  assert_eq!(orgs.len(), 1);
}

#[tokio::test]
async fn list_parties_skips_orphans_by_default() {
  let s = store().await;
  s.save_person(Person::new("Alice")).await.unwrap();
  raw_sql(
    &s,
    format!(
      "INSERT INTO parties (party_id) VALUES ('{}');",
      encode_uuid(Uuid::new_v4())
    ),
  )
  .await;

  let all = s.list_parties(None).await.unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn list_parties_fails_on_orphans_when_strict() {
  let s = store().await.with_orphan_policy(OrphanPolicy::Fail);
  s.save_person(Person::new("Alice")).await.unwrap();
  raw_sql(
    &s,
    format!(
      "INSERT INTO parties (party_id) VALUES ('{}');",
      encode_uuid(Uuid::new_v4())
    ),
  )
  .await;

  let err = s.list_parties(None).await.unwrap_err();
  assert!(matches!(err, Error::Integrity(IntegrityError::Orphaned(_))));
}

/// Give an existing person an organization row as well.
async fn add_second_specialisation(s: &SqliteStore, party_id: Uuid) {
  raw_sql(
    s,
    format!(
      "INSERT INTO organizations (party_id, name, date_added)
       VALUES ('{}', 'Shadow', '2024-01-01T00:00:00+00:00');",
      encode_uuid(party_id)
    ),
  )
  .await;
}

#[tokio::test]
async fn list_parties_skips_doubly_specialised_by_default() {
  let s = store().await;
  let alice = s.save_person(Person::new("Alice")).await.unwrap();
  let bob = s.save_person(Person::new("Bob")).await.unwrap();
  add_second_specialisation(&s, bob.party_id).await;

  let all = s.list_parties(None).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].party_id(), alice.party_id);

  let hits = s
    .search(&PartyQuery { text: Some("bob".into()), ..Default::default() })
    .await
    .unwrap();
  assert!(hits.is_empty());
}

#[tokio::test]
async fn list_parties_fails_on_doubly_specialised_when_strict() {
  let s = store().await.with_orphan_policy(OrphanPolicy::Fail);
  s.save_person(Person::new("Alice")).await.unwrap();
  let bob = s.save_person(Person::new("Bob")).await.unwrap();
  add_second_specialisation(&s, bob.party_id).await;

  let err = s.list_parties(None).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Integrity(IntegrityError::DoublySpecialised(id)) if id == bob.party_id
  ));
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_keeps_date_added_and_sets_date_modified() {
  let s = store().await;
  let first = s.save_person(Person::new("Alice")).await.unwrap();
  tick().await;

  let mut edited = first.clone().into_inner();
  edited.last_name = Some("Liddell".into());
  let second = s.save_person(edited).await.unwrap();

  assert_eq!(second.date_added(), first.date_added());
  let modified = second.date_modified().expect("date_modified set on update");
  assert!(modified > second.date_added());

  let stored = s.resolve_party(first.party_id).await.unwrap().unwrap();
  assert_eq!(stored.date_added(), first.date_added());
  assert_eq!(stored.date_modified(), Some(modified));
  assert_eq!(stored.sort_name(), "Alice Liddell");
}

#[tokio::test]
async fn preassigned_identity_is_an_insert() {
  let s = store().await;
  let org = Organization { party_id: Uuid::new_v4(), name: "Acme".into() };

  let saved = s.save_organization(org).await.unwrap();
  assert!(saved.date_modified().is_none());
}

#[tokio::test]
async fn every_attachment_kind_is_stamped_centrally() {
  let s = store().await;
  let p = s.save_person(Person::new("Alice")).await.unwrap();
  let owner = OwnerRef::person(p.party_id);

  let details = [
    AttachmentDetail::EmailAddress(EmailAddress {
      address: Some("alice@example.com".into()),
      label:   Some(EmailLabel::Personal),
    }),
    AttachmentDetail::StreetAddress(StreetAddress {
      city: Some("Springfield".into()),
      ..Default::default()
    }),
    AttachmentDetail::PhoneNumber(PhoneNumber {
      number: Some("555-0100".into()),
      label:  Some(PhoneLabel::Mobile),
    }),
    AttachmentDetail::Website(Website {
      name:  Some("Blog".into()),
      url:   Some("https://alice.test".into()),
      label: Some(OnlineLabel::Personal),
    }),
    AttachmentDetail::ImAccount(ImAccount {
      username: "alice".into(),
      service:  Some(ImService::Jabber),
      label:    None,
    }),
    AttachmentDetail::Note(Note {
      content:        "Met at the conference".into(),
      reference_date: Some(chrono::Utc::now()),
    }),
  ];

  for detail in details {
    let kind = detail.kind();
    let created = s
      .save_attachment(Attachment::new(owner, detail))
      .await
      .unwrap();
    assert!(created.date_modified().is_none(), "{kind:?} insert");
    tick().await;

    let updated = s.save_attachment(created.clone().into_inner()).await.unwrap();
    assert_eq!(updated.date_added(), created.date_added(), "{kind:?}");
    assert!(
      updated.date_modified().is_some_and(|m| m > created.date_added()),
      "{kind:?} update"
    );

    let fetched = s
      .get_attachment(kind, created.attachment_id)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(*fetched, *created, "{kind:?} round trip");
    assert_eq!(fetched.date_modified(), updated.date_modified());
  }
}

// ─── Attachments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn attachment_requires_existing_owner() {
  let s = store().await;
  let owner = OwnerRef::person(Uuid::new_v4());

  let err = s
    .save_attachment(email(owner, "ghost@example.com"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::OwnerNotFound(o) if o == owner));
}

#[tokio::test]
async fn attachment_owner_tag_must_match_specialisation() {
  let s = store().await;
  let org = s.save_organization(Organization::new("Acme")).await.unwrap();

  // The identity exists, but not as a person.
  let err = s
    .save_attachment(email(OwnerRef::person(org.party_id), "x@acme.test"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::OwnerNotFound(_)));

  s.save_attachment(email(OwnerRef::party(org.party_id), "x@acme.test"))
    .await
    .unwrap();
}

#[tokio::test]
async fn invalid_attachment_is_rejected() {
  let s = store().await;
  let p = s.save_person(Person::new("Alice")).await.unwrap();

  let err = s
    .save_attachment(email(OwnerRef::person(p.party_id), "not-an-email"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(_)));
}

#[tokio::test]
async fn list_attachments_by_exact_owner_and_kind() {
  let s = store().await;
  let p = s.save_person(Person::new("Alice")).await.unwrap();
  let as_person = OwnerRef::person(p.party_id);
  let as_party = OwnerRef::party(p.party_id);

  let first = s.save_attachment(email(as_person, "a@example.com")).await.unwrap();
  tick().await;
  s.save_attachment(email(as_person, "b@example.com")).await.unwrap();
  s.save_attachment(note(as_person, "likes tea")).await.unwrap();
  s.save_attachment(note(as_party, "shared note")).await.unwrap();

  let all = s.list_attachments(as_person, None).await.unwrap();
  assert_eq!(all.len(), 3);

  let emails = s
    .list_attachments(as_person, Some(AttachmentKind::EmailAddress))
    .await
    .unwrap();
  assert_eq!(emails.len(), 2);
  assert_eq!(emails[0].attachment_id, first.attachment_id);

  let party_level = s.list_attachments(as_party, None).await.unwrap();
  assert_eq!(party_level.len(), 1);
}

#[tokio::test]
async fn delete_attachment_removes_it() {
  let s = store().await;
  let p = s.save_person(Person::new("Alice")).await.unwrap();
  let a = s
    .save_attachment(note(OwnerRef::person(p.party_id), "temporary"))
    .await
    .unwrap();

  s.delete_attachment(AttachmentKind::Note, a.attachment_id)
    .await
    .unwrap();
  assert!(
    s.get_attachment(AttachmentKind::Note, a.attachment_id)
      .await
      .unwrap()
      .is_none()
  );

  let err = s
    .delete_attachment(AttachmentKind::Note, a.attachment_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::AttachmentNotFound { .. }));

  let hits = s
    .search(&PartyQuery { text: Some("temporary".into()), ..Default::default() })
    .await
    .unwrap();
  assert!(hits.is_empty());
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_party_cascades_to_attachments() {
  let s = store().await;
  let p = s.save_person(Person::new("Alice")).await.unwrap();
  let a = s
    .save_attachment(email(OwnerRef::person(p.party_id), "a@example.com"))
    .await
    .unwrap();
  let b = s
    .save_attachment(note(OwnerRef::party(p.party_id), "shared"))
    .await
    .unwrap();

  s.delete_party(p.party_id).await.unwrap();

  assert!(s.resolve_party(p.party_id).await.unwrap().is_none());
  assert!(
    s.get_attachment(AttachmentKind::EmailAddress, a.attachment_id)
      .await
      .unwrap()
      .is_none()
  );
  assert!(
    s.get_attachment(AttachmentKind::Note, b.attachment_id)
      .await
      .unwrap()
      .is_none()
  );
  for owner in [OwnerRef::person(p.party_id), OwnerRef::party(p.party_id)] {
    assert!(s.list_attachments(owner, None).await.unwrap().is_empty());
  }
  assert!(s.list_parties(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_organization_cascades_under_every_owner_tag() {
  let s = store().await;
  let org = s.save_organization(Organization::new("Acme")).await.unwrap();
  let as_org = OwnerRef::organization(org.party_id);
  let as_party = OwnerRef::party(org.party_id);

  s.save_attachment(email(as_org, "info@acme.test")).await.unwrap();
  s.save_attachment(Attachment::new(
    as_org,
    AttachmentDetail::Website(Website {
      name:  Some("Acme".into()),
      url:   Some("http://acme.test".into()),
      label: Some(OnlineLabel::Work),
    }),
  ))
  .await
  .unwrap();
  s.save_attachment(note(as_party, "founded 1999")).await.unwrap();
  assert_eq!(s.list_attachments(as_org, None).await.unwrap().len(), 2);

  s.delete_party(org.party_id).await.unwrap();

  assert!(s.list_attachments(as_org, None).await.unwrap().is_empty());
  assert!(s.list_attachments(as_party, None).await.unwrap().is_empty());
  let hits = s
    .search(&PartyQuery { text: Some("acme".into()), ..Default::default() })
    .await
    .unwrap();
  assert!(hits.is_empty());
}

#[tokio::test]
async fn deleting_organization_clears_member_reference() {
  let s = store().await;
  let org = s.save_organization(Organization::new("Acme")).await.unwrap();
  let member = Person {
    organization_id: Some(org.party_id),
    ..Person::new("Alice")
  };
  let member = s.save_person(member).await.unwrap();

  s.delete_party(org.party_id).await.unwrap();

  let party = s.resolve_party(member.party_id).await.unwrap().unwrap();
  match &*party {
    Party::Person(p) => assert_eq!(p.organization_id, None),
    other => panic!("expected a person, got {other:?}"),
  }
}

#[tokio::test]
async fn delete_missing_party_is_not_found() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = s.delete_party(id).await.unwrap_err();
  assert!(matches!(err, Error::PartyNotFound(got) if got == id));
}

// ─── Contact card ────────────────────────────────────────────────────────────

#[tokio::test]
async fn contact_card_gathers_attachments_under_every_owner_tag() {
  let s = store().await;
  let p = s.save_person(person("Alice", Some("Zed"))).await.unwrap();
  let other = s.save_person(Person::new("Bob")).await.unwrap();

  s.save_attachment(email(OwnerRef::person(p.party_id), "a@example.com"))
    .await
    .unwrap();
  s.save_attachment(note(OwnerRef::party(p.party_id), "party-level note"))
    .await
    .unwrap();
  s.save_attachment(note(OwnerRef::person(other.party_id), "not hers"))
    .await
    .unwrap();

  let card = s.contact_card(p.party_id).await.unwrap().unwrap();
  assert_eq!(card.party.sort_name(), "Alice Zed");
  assert_eq!(card.detail_path, format!("/people/{}/", p.party_id));
  assert_eq!(card.attachments.len(), 2);
  assert_eq!(card.attachments.email_addresses.len(), 1);
  assert_eq!(card.attachments.notes.len(), 1);
  assert_eq!(card.attachments.notes[0].value.content, "party-level note");
}

#[tokio::test]
async fn contact_card_for_missing_party_is_none() {
  let s = store().await;
  assert!(s.contact_card(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_matches_names_and_attachment_text() {
  let s = store().await;
  let alice = s.save_person(person("Alice", Some("Zed"))).await.unwrap();
  let acme = s.save_organization(Organization::new("Acme")).await.unwrap();
  s.save_person(Person::new("Bob")).await.unwrap();
  s.save_attachment(Attachment::new(
    OwnerRef::organization(acme.party_id),
    AttachmentDetail::StreetAddress(StreetAddress {
      city: Some("Springfield".into()),
      ..Default::default()
    }),
  ))
  .await
  .unwrap();

  let by_name = s
    .search(&PartyQuery { text: Some("zed".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_name.len(), 1);
  assert_eq!(by_name[0].party_id(), alice.party_id);

  let by_city = s
    .search(&PartyQuery { text: Some("Springfield".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_city.len(), 1);
  assert_eq!(by_city[0].party_id(), acme.party_id);
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
  let s = store().await;
  s.save_organization(Organization::new("100% Cotton")).await.unwrap();
  s.save_organization(Organization::new("1000 Cottons")).await.unwrap();

  let hits = s
    .search(&PartyQuery { text: Some("100%".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].sort_name(), "100% Cotton");
}

#[tokio::test]
async fn search_filters_kinds_orders_and_pages() {
  let s = store().await;
  let first = s.save_person(Person::new("Carol")).await.unwrap();
  tick().await;
  s.save_organization(Organization::new("Acme")).await.unwrap();
  tick().await;
  let third = s.save_person(Person::new("Alice")).await.unwrap();

  let people = s
    .search(&PartyQuery { kinds: vec![PartyKind::Person], ..Default::default() })
    .await
    .unwrap();
  let names: Vec<_> = people.iter().map(|p| p.sort_name()).collect();
  assert_eq!(names, ["Alice", "Carol"]);

  let by_date = s
    .search(&PartyQuery { order: PartyOrder::DateAdded, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_date[0].party_id(), first.party_id);
  assert_eq!(by_date[2].party_id(), third.party_id);

  let page = s
    .search(&PartyQuery {
      offset: Some(1),
      limit: Some(1),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.len(), 1);
  assert_eq!(page[0].sort_name(), "Alice");
}
