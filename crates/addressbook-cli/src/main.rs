//! `addressbook` — command-line front end for the address book.
//!
//! Reads `addressbook.toml` (or the path given with `--config`), opens the
//! SQLite store and runs one subcommand, printing the result as JSON on
//! stdout. Logs go to stderr; set `RUST_LOG` to adjust verbosity.

mod commands;
mod settings;

use std::path::PathBuf;

use addressbook_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{
  commands::Command,
  settings::{AppConfig, expand_tilde},
};

#[derive(Parser)]
#[command(author, version, about = "Address book of people and organizations")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "addressbook.toml")]
  config: PathBuf,

  /// Database file; overrides `store_path` from the configuration.
  #[arg(long)]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let mut cfg = AppConfig::load(&cli.config)?;
  if let Some(store) = cli.store {
    cfg.store_path = store;
  }
  let store_path = expand_tilde(&cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_orphan_policy(cfg.orphan_policy);
  tracing::debug!(
    ?store_path,
    orphan_policy = cfg.orphan_policy.as_ref(),
    "opened store"
  );

  let output = cli.command.run(&store).await?;
  println!("{}", serde_json::to_string_pretty(&output)?);

  Ok(())
}

#[cfg(test)]
mod tests {
  use addressbook_core::attachment::OwnerKind;

  use super::*;
  use crate::commands::DetailArgs;

  #[test]
  fn store_flag_and_default_config() {
    let cli =
      Cli::try_parse_from(["addressbook", "--store", "/tmp/a.db", "list"]).unwrap();
    assert_eq!(cli.config, PathBuf::from("addressbook.toml"));
    assert_eq!(cli.store, Some(PathBuf::from("/tmp/a.db")));
    assert!(matches!(cli.command, Command::List { kind: None }));
  }

  #[test]
  fn attach_parses_owner_tag_and_detail() {
    let id = uuid::Uuid::new_v4().to_string();
    let cli = Cli::try_parse_from([
      "addressbook",
      "attach",
      id.as_str(),
      "--as",
      "party",
      "email",
      "alice@example.com",
      "--label",
      "work",
    ])
    .unwrap();

    let Command::Attach { owner_kind, detail, .. } = cli.command else {
      panic!("expected attach");
    };
    assert_eq!(owner_kind, Some(OwnerKind::Party));
    assert!(matches!(detail, DetailArgs::Email { .. }));
  }

  #[test]
  fn unknown_label_is_rejected() {
    let id = uuid::Uuid::new_v4().to_string();
    let parsed = Cli::try_parse_from([
      "addressbook",
      "attach",
      id.as_str(),
      "phone",
      "555-0100",
      "--label",
      "pager",
    ]);
    assert!(parsed.is_err());
  }
}
