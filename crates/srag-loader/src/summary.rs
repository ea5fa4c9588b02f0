//! Plain-text rendering of a [`RunReport`].

use std::fmt::Write as _;

use srag_ingest::{FileReport, FileStatus, RunReport};

pub fn render(report: &RunReport, total: u64) -> String {
  let mut out = String::new();

  if report.files_found == 0 {
    out.push_str("no source files found\n");
  }

  let width = report.files.iter().map(|f| f.file.len()).max().unwrap_or(0);
  for file in &report.files {
    let _ = writeln!(
      out,
      "{:<width$}  read {:>10}  inserted {:>10}  failed batches {:>3}  {}",
      file.file,
      file.rows_read,
      file.inserted,
      file.failed_batches,
      status_label(file),
    );
  }

  let _ = writeln!(
    out,
    "run {}: {} of {} file(s), {} row(s) read, {} inserted, {} failed batch(es), {} failed file(s){}",
    report.run_id,
    report.files.len(),
    report.files_found,
    report.rows_read,
    report.inserted,
    report.failed_batches,
    report.failed_files,
    if report.cancelled { ", cancelled" } else { "" },
  );
  let _ = writeln!(out, "store now holds {total} case(s)");
  out
}

fn status_label(file: &FileReport) -> String {
  match &file.status {
    FileStatus::Completed => "ok".to_owned(),
    FileStatus::Cancelled => "cancelled".to_owned(),
    FileStatus::Failed { error } => format!("failed: {error}"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lists_files_and_totals() {
    let mut run = RunReport::new();
    run.files_found = 2;
    let mut a = FileReport::new("2023.csv");
    a.rows_read = 1001;
    a.inserted = 1000;
    run.record_file(a);
    let mut b = FileReport::new("2024.csv");
    b.status = FileStatus::Failed { error: "permission denied".into() };
    run.record_file(b);

    let text = render(&run, 1500);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("2023.csv"));
    assert!(lines[0].ends_with("ok"));
    assert!(lines[1].ends_with("failed: permission denied"));
    assert!(lines[2].contains("1001 row(s) read, 1000 inserted"));
    assert!(lines[2].contains("1 failed file(s)"));
    assert_eq!(lines[3], "store now holds 1500 case(s)");
  }

  #[test]
  fn empty_run_says_so() {
    let text = render(&RunReport::new(), 0);
    assert!(text.starts_with("no source files found\n"));
    assert!(!text.contains("cancelled"));
  }

  #[test]
  fn cancelled_run_is_flagged() {
    let mut run = RunReport::new();
    run.files_found = 1;
    let mut f = FileReport::new("a.csv");
    f.status = FileStatus::Cancelled;
    run.record_file(f);

    let text = render(&run, 0);
    assert!(text.lines().next().is_some_and(|l| l.ends_with("cancelled")));
    assert!(text.contains(", cancelled\n"));
  }
}
