//! Incremental, idempotent ingestion of SRAG CSV extracts.
//!
//! Pipeline:
//!   source file
//!     └─ BatchReader        → RawWindow (≤ batch_size raw rows)
//!          └─ Normalizer    → Vec<CaseCandidate>
//!               └─ dedupe() → Vec<CaseRecord>, one per key
//!                    └─ CaseStore::merge_batch → rows inserted
//!
//! [`Ingestor`] drives the pipeline over every file in the data directory and
//! isolates failures to the batch or file that caused them.

pub mod dedupe;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod reader;
pub mod report;

pub use dedupe::{Deduped, dedupe};
pub use error::{Error, Result};
pub use normalize::Normalizer;
pub use pipeline::Ingestor;
pub use reader::{BatchReader, RawWindow};
pub use report::{BatchReport, BatchStatus, FileReport, FileStatus, RunReport};
