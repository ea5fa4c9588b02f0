//! SQLite backend for the SRAG case store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each batch is staged into a
//! connection-local temporary table and merged into `cases` inside a single
//! transaction.

mod encode;
mod schema;
mod staging;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
