//! [`SqliteStore`]: the SQLite implementation of [`CaseStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use srag_core::{case::CaseRecord, store::CaseStore};

use crate::{
  Result,
  encode::{EncodedCase, RawCase},
  schema::{CASE_COLUMNS, DROP_STAGING, SCHEMA},
  staging::StagingArea,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A case store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All clones
/// share one connection, so batches issued through them are serialised.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) the database file at `path`. The schema is not touched
  /// until [`CaseStore::ensure_schema`] is called.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Ok(Self { conn })
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Ok(Self { conn })
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }
}

// ─── CaseStore impl ──────────────────────────────────────────────────────────

impl CaseStore for SqliteStore {
  type Error = crate::Error;

  async fn ensure_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn merge_batch(&self, records: Vec<CaseRecord>) -> Result<u64> {
    let rows: Vec<EncodedCase> = records.into_iter().map(EncodedCase::from).collect();

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let staging = StagingArea::create(&tx)?;
        staging.stage(&rows)?;
        let inserted = staging.merge()?;
        staging.finish()?;
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    Ok(inserted as u64)
  }

  async fn drop_staging(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(DROP_STAGING)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count_cases(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM cases", [], |r| r.get(0))?)
      })
      .await?;
    Ok(count as u64)
  }

  async fn get_case(&self, notification_id: i64) -> Result<Option<CaseRecord>> {
    let raw: Option<RawCase> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CASE_COLUMNS} FROM cases WHERE notification_id = ?1"),
              rusqlite::params![notification_id],
              RawCase::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCase::into_case).transpose()
  }
}
