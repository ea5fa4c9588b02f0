//! Error types for `srag-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("unknown {field} value: {value:?}")]
  UnknownCategory { field: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
