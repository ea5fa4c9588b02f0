//! Progress and outcome reporting for ingestion runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

// ─── Batch ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchStatus {
  Committed,
  /// The batch transaction was rolled back; nothing from it was persisted.
  Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
  /// 1-based position of the batch within its file.
  pub index:      usize,
  /// Rows delivered by the reader, including those later dropped.
  pub rows_read:  u64,
  /// Lines skipped by the reader because they were malformed.
  pub malformed:  u64,
  pub null_keys:  u64,
  pub duplicates: u64,
  /// Rows written to the staging area.
  pub staged:     u64,
  pub inserted:   u64,
  #[serde(flatten)]
  pub status:     BatchStatus,
}

impl BatchReport {
  pub fn is_committed(&self) -> bool { self.status == BatchStatus::Committed }
}

// ─── File ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
  Completed,
  /// The file could not be opened or stopped being readable part-way;
  /// batches committed before that point remain committed.
  Failed { error: String },
  /// Cancellation was requested before the file was fully consumed.
  Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
  pub file:           String,
  pub rows_read:      u64,
  pub inserted:       u64,
  pub failed_batches: usize,
  pub batches:        Vec<BatchReport>,
  #[serde(flatten)]
  pub status:         FileStatus,
}

impl FileReport {
  pub fn new(file: impl Into<String>) -> Self {
    Self {
      file:           file.into(),
      rows_read:      0,
      inserted:       0,
      failed_batches: 0,
      batches:        Vec::new(),
      status:         FileStatus::Completed,
    }
  }

  pub fn record_batch(&mut self, batch: BatchReport) {
    self.rows_read += batch.rows_read;
    self.inserted += batch.inserted;
    if !batch.is_committed() {
      self.failed_batches += 1;
    }
    self.batches.push(batch);
  }
}

// ─── Run ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub run_id:         Uuid,
  pub started_at:     DateTime<Utc>,
  pub finished_at:    Option<DateTime<Utc>>,
  pub files_found:    usize,
  pub files:          Vec<FileReport>,
  pub rows_read:      u64,
  pub inserted:       u64,
  pub failed_batches: usize,
  pub failed_files:   usize,
  pub cancelled:      bool,
}

impl RunReport {
  pub fn new() -> Self {
    Self {
      run_id:         Uuid::new_v4(),
      started_at:     Utc::now(),
      finished_at:    None,
      files_found:    0,
      files:          Vec::new(),
      rows_read:      0,
      inserted:       0,
      failed_batches: 0,
      failed_files:   0,
      cancelled:      false,
    }
  }

  pub fn record_file(&mut self, file: FileReport) {
    self.rows_read += file.rows_read;
    self.inserted += file.inserted;
    self.failed_batches += file.failed_batches;
    match file.status {
      FileStatus::Failed { .. } => self.failed_files += 1,
      FileStatus::Cancelled => self.cancelled = true,
      FileStatus::Completed => {}
    }
    self.files.push(file);
  }

  pub fn finish(&mut self) { self.finished_at = Some(Utc::now()); }

  /// True when every batch of every file committed.
  pub fn is_clean(&self) -> bool {
    self.failed_batches == 0 && self.failed_files == 0
  }
}

impl Default for RunReport {
  fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn batch(index: usize, inserted: u64, status: BatchStatus) -> BatchReport {
    BatchReport {
      index,
      rows_read: 10,
      malformed: 0,
      null_keys: 0,
      duplicates: 0,
      staged: 10,
      inserted,
      status,
    }
  }

  #[test]
  fn totals_accumulate_across_batches_and_files() {
    let mut file = FileReport::new("a.csv");
    file.record_batch(batch(1, 10, BatchStatus::Committed));
    file.record_batch(batch(2, 0, BatchStatus::Failed { error: "boom".into() }));
    assert_eq!(file.rows_read, 20);
    assert_eq!(file.inserted, 10);
    assert_eq!(file.failed_batches, 1);

    let mut run = RunReport::new();
    run.record_file(file);
    let mut broken = FileReport::new("b.csv");
    broken.status = FileStatus::Failed { error: "unreadable".into() };
    run.record_file(broken);

    assert_eq!(run.rows_read, 20);
    assert_eq!(run.inserted, 10);
    assert_eq!(run.failed_batches, 1);
    assert_eq!(run.failed_files, 1);
    assert!(!run.is_clean());
  }

  #[test]
  fn serialises_status_inline() {
    let json = serde_json::to_value(batch(
      3,
      0,
      BatchStatus::Failed { error: "merge failed".into() },
    ))
    .unwrap();
    assert_eq!(json["status"], "failed");
    assert_eq!(json["error"], "merge failed");
    assert_eq!(json["index"], 3);
  }
}
