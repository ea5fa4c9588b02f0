//! Core types and trait definitions for the SRAG case loader.
//!
//! No file or database dependencies live here. The store backend and the
//! ingestion pipeline both depend on this crate.

pub mod case;
pub mod config;
pub mod error;
pub mod store;

pub use error::{Error, Result};
