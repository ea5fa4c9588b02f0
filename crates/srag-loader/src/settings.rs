//! Configuration loading for the loader binary.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML file, `SRAG_*`
//! environment variables (nested keys joined with `__`, e.g.
//! `SRAG_COLUMNS__STATE_CODE`), then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use srag_core::config::IngestConfig;

use crate::Cli;

pub fn load(cli: &Cli) -> anyhow::Result<IngestConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(
      config::Environment::with_prefix("SRAG")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .set_override_option("data_dir", cli.data_dir.as_deref().map(path_string))?
    .set_override_option("store_path", cli.store.as_deref().map(path_string))?
    .set_override_option("batch_size", cli.batch_size)?
    .build()
    .with_context(|| format!("failed to read config file {:?}", cli.config))?;

  let mut cfg: IngestConfig = settings
    .try_deserialize()
    .context("failed to deserialise IngestConfig")?;

  cfg.data_dir = expand_tilde(&cfg.data_dir);
  cfg.store_path = expand_tilde(&cfg.store_path);
  cfg.validate()?;

  tracing::debug!(?cfg, "configuration loaded");
  Ok(cfg)
}

fn path_string(p: &Path) -> String { p.to_string_lossy().into_owned() }

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
