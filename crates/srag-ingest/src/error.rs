//! Error types for `srag-ingest`.
//!
//! Only file- and run-level failures surface as [`Error`]. Row defects are
//! absorbed by the normaliser and batch failures are recorded in the
//! [`RunReport`](crate::RunReport).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] srag_core::Error),

  #[error("cannot read {}: {source}", .path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("cannot list data directory {}: {source}", .path.display())]
  DataDir {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("schema initialisation failed: {0}")]
  Schema(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("blocking task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
