//! The `CaseStore` trait.
//!
//! Implemented by storage backends (e.g. `srag-store-sqlite`). The ingestion
//! pipeline depends on this abstraction, not on a concrete backend.

use std::future::Future;

use crate::case::CaseRecord;

/// Abstraction over the permanent case store.
///
/// Writes are insert-only: a `notification_id` already present is never
/// overwritten. All methods return `Send` futures so the trait can be driven
/// from a multi-threaded tokio runtime.
pub trait CaseStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create the case table and its date index if absent. Idempotent.
  fn ensure_schema(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Stage one deduplicated batch and fold the keys absent from the store
  /// into it, as a single transaction. Returns the number of rows inserted.
  ///
  /// On error nothing from the batch is persisted.
  fn merge_batch(
    &self,
    records: Vec<CaseRecord>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Remove any leftover staging area. Safe to call when none exists.
  fn drop_staging(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Total number of cases in the store.
  fn count_cases(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Fetch one case by key. Returns `None` if absent.
  fn get_case(
    &self,
    notification_id: i64,
  ) -> impl Future<Output = Result<Option<CaseRecord>, Self::Error>> + Send + '_;
}
