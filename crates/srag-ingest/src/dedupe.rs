//! Intra-batch deduplication.
//!
//! Drops candidates whose key failed to parse and keeps only the first
//! candidate seen for each key. No cross-field conflict resolution is done:
//! the policy is "at most one row per key per batch", not "latest wins".

use std::collections::HashSet;

use srag_core::case::{CaseCandidate, CaseRecord};

/// Result of [`dedupe`], with counts of what was discarded.
#[derive(Debug, Default)]
pub struct Deduped {
  pub records:    Vec<CaseRecord>,
  pub null_keys:  usize,
  pub duplicates: usize,
}

pub fn dedupe(candidates: Vec<CaseCandidate>) -> Deduped {
  let mut seen = HashSet::with_capacity(candidates.len());
  let mut out = Deduped {
    records: Vec::with_capacity(candidates.len()),
    ..Default::default()
  };

  for candidate in candidates {
    let Some(record) = candidate.into_record() else {
      out.null_keys += 1;
      continue;
    };
    if seen.insert(record.notification_id) {
      out.records.push(record);
    } else {
      out.duplicates += 1;
    }
  }

  out
}
