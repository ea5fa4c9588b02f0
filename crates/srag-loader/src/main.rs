//! `srag-load`: incremental loader for SRAG CSV extracts.
//!
//! Reads `srag.toml` (or the path given with `--config`), layers `SRAG_*`
//! environment variables and command-line flags on top, then ingests every
//! source file in the data directory into the SQLite store.
//!
//! ```
//! srag-load --data-dir data/srag_csvs --store srag.db
//! srag-load --config srag.toml --json
//! ```
//!
//! Ctrl-C stops the run after the batch in flight has committed or rolled
//! back. Every batch committed before that point stays committed.

mod settings;
mod summary;

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use clap::Parser;
use srag_core::store::CaseStore as _;
use srag_ingest::Ingestor;
use srag_store_sqlite::SqliteStore;
use tokio::sync::watch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Load SRAG CSV extracts into a deduplicated SQLite store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "srag.toml")]
  config: PathBuf,

  /// Directory containing the source CSV files.
  #[arg(long, value_name = "DIR")]
  data_dir: Option<PathBuf>,

  /// SQLite database file to create or update.
  #[arg(long, value_name = "PATH")]
  store: Option<PathBuf>,

  /// Rows per batch window.
  #[arg(long, value_name = "N")]
  batch_size: Option<u64>,

  /// Print the run report as JSON instead of a text summary.
  #[arg(long)]
  json: bool,

  /// Exit with status 2 when the data directory holds no source files.
  #[arg(long)]
  fail_if_empty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let config = settings::load(&cli)?;

  let store = SqliteStore::open(&config.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", config.store_path))?;

  let ingestor = Ingestor::new(store, config).context("invalid configuration")?;

  // Ctrl-C requests a cooperative stop between batches.
  let (cancel_tx, cancel_rx) = watch::channel(false);
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      tracing::warn!("interrupt received; finishing current batch");
      cancel_tx.send_replace(true);
    }
  });

  let report = ingestor.run(cancel_rx).await.context("ingestion run failed")?;
  let total = ingestor
    .store()
    .count_cases()
    .await
    .context("failed to count stored cases")?;

  if cli.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print!("{}", summary::render(&report, total));
  }

  if cli.fail_if_empty && report.files_found == 0 {
    return Ok(ExitCode::from(2));
  }
  Ok(ExitCode::SUCCESS)
}
