//! Subcommands and their execution against an [`AddressBookStore`].

use addressbook_core::{
  attachment::{
    AddressLabel, Attachment, AttachmentDetail, AttachmentKind, EmailAddress,
    EmailLabel, ImAccount, ImService, Note, OnlineLabel, OwnerKind, OwnerRef,
    PhoneLabel, PhoneNumber, StreetAddress, Website,
  },
  collection::PartyOrder,
  dates::Dated,
  party::{Organization, Party, PartyKind, Person},
  store::{AddressBookStore, PartyQuery},
  text::nonblank,
};
use anyhow::{anyhow, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum Command {
  /// List every party, ordered by name.
  List {
    /// `person` or `organization`.
    #[arg(long)]
    kind: Option<PartyKind>,
  },

  /// Search names and contact details.
  Search {
    text:   Option<String>,
    /// Restrict to a party kind; may be repeated.
    #[arg(long = "kind")]
    kinds:  Vec<PartyKind>,
    /// `sort_name` or `date_added`.
    #[arg(long, default_value = "sort_name")]
    order:  PartyOrder,
    #[arg(long)]
    limit:  Option<usize>,
    #[arg(long)]
    offset: Option<usize>,
  },

  /// Show the contact card of one party.
  Show { id: Uuid },

  /// Create a person. With `--id`, saves under that identity instead.
  AddPerson {
    first:  String,
    #[arg(long)]
    id:     Option<Uuid>,
    #[command(flatten)]
    fields: PersonFields,
  },

  /// Change fields of an existing person. An empty value clears a field.
  EditPerson {
    id:                 Uuid,
    #[arg(long)]
    first:              Option<String>,
    #[command(flatten)]
    fields:             PersonFields,
    /// Drop the person's organization.
    #[arg(long, conflicts_with = "organization")]
    clear_organization: bool,
  },

  /// Create an organization. With `--id`, saves under that identity instead.
  AddOrganization {
    name: String,
    #[arg(long)]
    id:   Option<Uuid>,
  },

  RenameOrganization { id: Uuid, name: String },

  /// Delete a party together with everything attached to it.
  Delete { id: Uuid },

  /// Attach a contact detail to a party.
  Attach {
    party:      Uuid,
    /// Owner tag; defaults to the party's own kind.
    #[arg(long = "as")]
    owner_kind: Option<OwnerKind>,
    /// Overwrite the attachment with this identity.
    #[arg(long)]
    id:         Option<Uuid>,
    #[command(subcommand)]
    detail:     DetailArgs,
  },

  /// List attachments held by a party under one owner tag.
  Attachments {
    party:      Uuid,
    #[arg(long = "as")]
    owner_kind: Option<OwnerKind>,
    #[arg(long)]
    kind:       Option<AttachmentKind>,
  },

  GetAttachment { kind: AttachmentKind, id: Uuid },

  Detach { kind: AttachmentKind, id: Uuid },
}

/// Optional person fields shared by `add-person` and `edit-person`.
#[derive(Args)]
pub struct PersonFields {
  #[arg(long)]
  middle:       Option<String>,
  #[arg(long)]
  last:         Option<String>,
  #[arg(long)]
  title:        Option<String>,
  #[arg(long)]
  organization: Option<Uuid>,
}

impl PersonFields {
  fn apply(self, person: &mut Person) {
    if let Some(v) = self.middle {
      person.middle_name = nonblank(Some(v));
    }
    if let Some(v) = self.last {
      person.last_name = nonblank(Some(v));
    }
    if let Some(v) = self.title {
      person.title = nonblank(Some(v));
    }
    if let Some(id) = self.organization {
      person.organization_id = Some(id);
    }
  }
}

#[derive(Subcommand)]
pub enum DetailArgs {
  Email {
    address: String,
    #[arg(long)]
    label:   Option<EmailLabel>,
  },
  Address {
    #[arg(long)]
    street: Option<String>,
    #[arg(long)]
    city:   Option<String>,
    #[arg(long)]
    state:  Option<String>,
    #[arg(long)]
    zip:    Option<String>,
    #[arg(long)]
    label:  Option<AddressLabel>,
  },
  Phone {
    number: String,
    #[arg(long)]
    label:  Option<PhoneLabel>,
  },
  Website {
    url:   String,
    #[arg(long)]
    name:  Option<String>,
    #[arg(long)]
    label: Option<OnlineLabel>,
  },
  Im {
    username: String,
    #[arg(long)]
    service:  Option<ImService>,
    #[arg(long)]
    label:    Option<OnlineLabel>,
  },
  Note {
    content: String,
    /// RFC 3339 date the note refers to.
    #[arg(long)]
    date:    Option<DateTime<Utc>>,
  },
}

impl From<DetailArgs> for AttachmentDetail {
  fn from(args: DetailArgs) -> Self {
    match args {
      DetailArgs::Email { address, label } => Self::EmailAddress(EmailAddress {
        address: nonblank(Some(address)),
        label,
      }),
      DetailArgs::Address { street, city, state, zip, label } => {
        Self::StreetAddress(StreetAddress {
          address: nonblank(street),
          city: nonblank(city),
          state: nonblank(state),
          zip: nonblank(zip),
          label,
        })
      }
      DetailArgs::Phone { number, label } => Self::PhoneNumber(PhoneNumber {
        number: nonblank(Some(number)),
        label,
      }),
      DetailArgs::Website { url, name, label } => Self::Website(Website {
        name: nonblank(name),
        url: nonblank(Some(url)),
        label,
      }),
      DetailArgs::Im { username, service, label } => {
        Self::ImAccount(ImAccount { username, service, label })
      }
      DetailArgs::Note { content, date } => {
        Self::Note(Note { content, reference_date: date })
      }
    }
  }
}

// ─── Execution ───────────────────────────────────────────────────────────────

impl Command {
  /// Run against `store`, returning the JSON to print.
  pub async fn run<S: AddressBookStore>(self, store: &S) -> anyhow::Result<Value> {
    match self {
      Self::List { kind } => to_json(store.list_parties(kind).await?),

      Self::Search { text, kinds, order, limit, offset } => {
        let query = PartyQuery { text, kinds, order, limit, offset };
        to_json(store.search(&query).await?)
      }

      Self::Show { id } => match store.contact_card(id).await? {
        Some(card) => to_json(card),
        None => Err(not_found(id)),
      },

      Self::AddPerson { first, id, fields } => {
        let mut person = Person::new(first);
        if let Some(id) = id {
          person.party_id = id;
        }
        fields.apply(&mut person);
        to_json(store.save_person(person).await?)
      }

      Self::EditPerson { id, first, fields, clear_organization } => {
        let Party::Person(mut person) = require_party(store, id).await?.into_inner()
        else {
          bail!("party {id} is not a person");
        };
        if let Some(first) = first {
          person.first_name = first;
        }
        fields.apply(&mut person);
        if clear_organization {
          person.organization_id = None;
        }
        to_json(store.save_person(person).await?)
      }

      Self::AddOrganization { name, id } => {
        let mut organization = Organization::new(name);
        if let Some(id) = id {
          organization.party_id = id;
        }
        to_json(store.save_organization(organization).await?)
      }

      Self::RenameOrganization { id, name } => {
        let Party::Organization(mut organization) =
          require_party(store, id).await?.into_inner()
        else {
          bail!("party {id} is not an organization");
        };
        organization.name = name;
        to_json(store.save_organization(organization).await?)
      }

      Self::Delete { id } => {
        store.delete_party(id).await?;
        Ok(json!({ "deleted": id.to_string() }))
      }

      Self::Attach { party, owner_kind, id, detail } => {
        let owner = owner_ref(store, party, owner_kind).await?;
        let mut attachment = Attachment::new(owner, detail.into());
        if let Some(id) = id {
          attachment.attachment_id = id;
        }
        to_json(store.save_attachment(attachment).await?)
      }

      Self::Attachments { party, owner_kind, kind } => {
        let owner = owner_ref(store, party, owner_kind).await?;
        to_json(store.list_attachments(owner, kind).await?)
      }

      Self::GetAttachment { kind, id } => {
        match store.get_attachment(kind, id).await? {
          Some(a) => to_json(a),
          None => Err(anyhow!("no {} with id {id}", kind.as_ref())),
        }
      }

      Self::Detach { kind, id } => {
        store.delete_attachment(kind, id).await?;
        Ok(json!({ "deleted": id.to_string(), "kind": kind.as_ref() }))
      }
    }
  }
}

fn to_json(value: impl Serialize) -> anyhow::Result<Value> {
  Ok(serde_json::to_value(value)?)
}

fn not_found(id: Uuid) -> anyhow::Error { anyhow!("no party with id {id}") }

async fn require_party<S: AddressBookStore>(
  store: &S,
  id: Uuid,
) -> anyhow::Result<Dated<Party>> {
  store.resolve_party(id).await?.ok_or_else(|| not_found(id))
}

/// The owner reference for `party`: the explicit tag if given, otherwise the
/// party's own kind.
async fn owner_ref<S: AddressBookStore>(
  store: &S,
  party: Uuid,
  kind: Option<OwnerKind>,
) -> anyhow::Result<OwnerRef> {
  match kind {
    Some(kind) => Ok(OwnerRef::new(kind, party)),
    None => Ok(OwnerRef::from(&*require_party(store, party).await?)),
  }
}
