//! Batch-scoped staging area and the merge that folds it into `cases`.
//!
//! A [`StagingArea`] borrows the batch transaction. The temporary table it
//! owns is dropped when the area is finished or dropped, on every exit path;
//! on failure the enclosing transaction is rolled back as well, so nothing of
//! the batch survives.

use rusqlite::Connection;

use crate::{
  encode::EncodedCase,
  schema::{CASE_COLUMNS, DROP_STAGING, RESET_STAGING},
};

pub struct StagingArea<'c> {
  conn:     &'c Connection,
  finished: bool,
}

impl<'c> StagingArea<'c> {
  /// Replace any previous staging table with an empty one.
  pub fn create(conn: &'c Connection) -> rusqlite::Result<Self> {
    conn.execute_batch(RESET_STAGING)?;
    Ok(Self { conn, finished: false })
  }

  /// Write a deduplicated batch into the staging table.
  pub fn stage(&self, rows: &[EncodedCase]) -> rusqlite::Result<usize> {
    let mut stmt = self.conn.prepare(&format!(
      "INSERT INTO temp.staging_cases ({CASE_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    ))?;
    for row in rows {
      stmt.execute(rusqlite::params![
        row.notification_id,
        row.notification_date,
        row.patient_sex,
        row.outcome,
        row.final_classification,
        row.icu_admission,
        row.covid_vaccinated,
        row.flu_vaccinated,
        row.state_code,
      ])?;
    }
    Ok(rows.len())
  }

  /// Insert every staged row whose key is absent from `cases`. Returns the
  /// number of rows actually inserted.
  pub fn merge(&self) -> rusqlite::Result<usize> {
    self.conn.execute(
      &format!(
        "INSERT OR IGNORE INTO cases ({CASE_COLUMNS})
         SELECT {CASE_COLUMNS} FROM temp.staging_cases"
      ),
      [],
    )
  }

  /// Drop the staging table, surfacing any error.
  pub fn finish(mut self) -> rusqlite::Result<()> {
    self.finished = true;
    self.conn.execute_batch(DROP_STAGING)
  }
}

impl Drop for StagingArea<'_> {
  fn drop(&mut self) {
    if self.finished {
      return;
    }
    if let Err(e) = self.conn.execute_batch(DROP_STAGING) {
      tracing::warn!(error = %e, "failed to drop staging table");
    }
  }
}
