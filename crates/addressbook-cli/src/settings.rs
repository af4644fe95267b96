//! Runtime configuration: an optional TOML file layered with `ADDRESSBOOK_*`
//! environment variables.

use std::path::{Path, PathBuf};

use addressbook_core::collection::OrphanPolicy;
use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// SQLite database file. A leading `~/` is expanded at startup.
  pub store_path:    PathBuf,
  pub orphan_policy: OrphanPolicy,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      store_path:    PathBuf::from("addressbook.db"),
      orphan_policy: OrphanPolicy::default(),
    }
  }
}

impl AppConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ADDRESSBOOK"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
