//! [`Ingestor`] drives files and batches through the pipeline.
//!
//! Per file:
//!   START → READING_BATCH → NORMALIZING → MERGING → COMMITTED | FAILED_BATCH
//!         → next batch | DONE
//!
//! A failed batch is rolled back by the store and skipped; a file that cannot
//! be read is skipped; only a schema failure or an unreadable data directory
//! stops the run. Reading and normalising run on the blocking pool, one window
//! at a time.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use srag_core::{case::CaseRecord, config::IngestConfig, store::CaseStore};
use tokio::sync::watch;

use crate::{
  BatchReader, Error, Normalizer, RawWindow, Result, dedupe,
  report::{BatchReport, BatchStatus, FileReport, FileStatus, RunReport},
};

/// A window that has been normalised and deduplicated, ready to merge.
struct PreparedBatch {
  report:  BatchReport,
  records: Vec<CaseRecord>,
}

impl PreparedBatch {
  fn prepare(normalizer: &Normalizer, window: RawWindow) -> Self {
    let rows_read = window.len() as u64;
    let deduped = dedupe(normalizer.normalize(&window));
    Self {
      report:  BatchReport {
        index:      window.index,
        rows_read,
        malformed:  window.malformed as u64,
        null_keys:  deduped.null_keys as u64,
        duplicates: deduped.duplicates as u64,
        staged:     deduped.records.len() as u64,
        inserted:   0,
        status:     BatchStatus::Committed,
      },
      records: deduped.records,
    }
  }
}

/// Loads every source file of a data directory into a [`CaseStore`].
pub struct Ingestor<S> {
  store:      S,
  config:     Arc<IngestConfig>,
  normalizer: Normalizer,
}

impl<S: CaseStore> Ingestor<S> {
  /// Validate `config` and build an ingestor over `store`.
  pub fn new(store: S, config: IngestConfig) -> Result<Self> {
    config.validate()?;
    let config = Arc::new(config);
    let normalizer = Normalizer::new(Arc::clone(&config))?;
    Ok(Self { store, config, normalizer })
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &IngestConfig { &self.config }

  /// Run one ingestion pass over the data directory.
  ///
  /// `cancel` is polled between files and between batches; once it holds
  /// `true` the run stops after the in-flight batch has committed or rolled
  /// back.
  pub async fn run(&self, cancel: watch::Receiver<bool>) -> Result<RunReport> {
    let mut report = RunReport::new();
    tracing::info!(
      run_id = %report.run_id,
      data_dir = %self.config.data_dir.display(),
      batch_size = self.config.batch_size,
      "starting ingestion run"
    );

    self
      .store
      .ensure_schema()
      .await
      .map_err(|e| Error::Schema(Box::new(e)))?;

    let files = self.discover_files().await?;
    report.files_found = files.len();
    if files.is_empty() {
      tracing::warn!(
        data_dir = %self.config.data_dir.display(),
        extension = %self.config.file_extension,
        "no source files found"
      );
    } else {
      tracing::info!(count = files.len(), "found source files");
    }

    for path in &files {
      if *cancel.borrow() {
        tracing::info!("cancellation requested; stopping before next file");
        report.cancelled = true;
        break;
      }
      let file_report = self.ingest_file(path, &cancel).await;
      let stop = file_report.status == FileStatus::Cancelled;
      report.record_file(file_report);
      if stop {
        break;
      }
    }

    if let Err(e) = self.store.drop_staging().await {
      tracing::warn!(error = %e, "could not drop staging area");
    }

    report.finish();
    tracing::info!(
      run_id = %report.run_id,
      files = report.files.len(),
      rows_read = report.rows_read,
      inserted = report.inserted,
      failed_batches = report.failed_batches,
      failed_files = report.failed_files,
      cancelled = report.cancelled,
      "ingestion run finished"
    );
    Ok(report)
  }

  /// Source files in the data directory, in lexicographic order.
  pub async fn discover_files(&self) -> Result<Vec<PathBuf>> {
    let dir = &self.config.data_dir;
    let dir_err = |source| Error::DataDir { path: dir.clone(), source };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(dir_err)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(dir_err)? {
      let path = entry.path();
      let matches_ext = path
        .extension()
        .is_some_and(|ext| ext == self.config.file_extension.as_str());
      if !matches_ext {
        continue;
      }
      match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => files.push(path),
        Ok(_) => {}
        Err(e) => tracing::warn!(file = %path.display(), error = %e, "cannot stat file; skipping"),
      }
    }
    files.sort();
    Ok(files)
  }

  /// Ingest one file. Never fails: problems are recorded in the report.
  pub async fn ingest_file(
    &self,
    path: &Path,
    cancel: &watch::Receiver<bool>,
  ) -> FileReport {
    let name = path
      .file_name()
      .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let mut report = FileReport::new(name.clone());
    tracing::info!(file = %name, "processing file");

    let opened = {
      let path = path.to_path_buf();
      let config = Arc::clone(&self.config);
      tokio::task::spawn_blocking(move || BatchReader::open(&path, &config)).await
    };
    let mut reader = match opened.map_err(Error::from).and_then(|r| r) {
      Ok(reader) => reader,
      Err(e) => {
        tracing::error!(file = %name, error = %e, "cannot open file; skipping");
        report.status = FileStatus::Failed { error: e.to_string() };
        return report;
      }
    };

    loop {
      if *cancel.borrow() {
        tracing::info!(file = %name, "cancellation requested; stopping file");
        report.status = FileStatus::Cancelled;
        break;
      }

      let normalizer = self.normalizer.clone();
      let step = tokio::task::spawn_blocking(move || {
        let next = reader
          .next()
          .map(|window| window.map(|w| PreparedBatch::prepare(&normalizer, w)));
        (reader, next)
      })
      .await;

      let next = match step {
        Ok((r, next)) => {
          reader = r;
          next
        }
        Err(e) => {
          tracing::error!(file = %name, error = %e, "reader task failed; skipping rest of file");
          report.status = FileStatus::Failed { error: e.to_string() };
          break;
        }
      };

      let batch = match next {
        None => break,
        Some(Ok(batch)) => batch,
        Some(Err(e)) => {
          tracing::error!(file = %name, error = %e, "read failed; skipping rest of file");
          report.status = FileStatus::Failed { error: e.to_string() };
          break;
        }
      };

      report.record_batch(self.merge(&name, batch).await);
    }

    tracing::info!(
      file = %name,
      rows_read = report.rows_read,
      inserted = report.inserted,
      failed_batches = report.failed_batches,
      "file done"
    );
    report
  }

  async fn merge(&self, file: &str, batch: PreparedBatch) -> BatchReport {
    let PreparedBatch { mut report, records } = batch;

    let result = if records.is_empty() {
      Ok(0)
    } else {
      self.store.merge_batch(records).await
    };

    match result {
      Ok(inserted) => {
        report.inserted = inserted;
        tracing::info!(
          file,
          batch = report.index,
          rows_read = report.rows_read,
          staged = report.staged,
          inserted,
          "batch committed"
        );
      }
      Err(e) => {
        tracing::error!(
          file,
          batch = report.index,
          error = %e,
          "batch failed; rolled back"
        );
        report.status = BatchStatus::Failed { error: e.to_string() };
      }
    }
    report
  }
}
