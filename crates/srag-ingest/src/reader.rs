//! Streaming reader that cuts a delimited source file into fixed-size windows.
//!
//! Rows are kept as undecoded [`ByteRecord`]s; the legacy encoding is applied
//! field by field during normalisation, so bytes that are not valid UTF-8
//! never stop the reader.

use std::{
  fs::File,
  io::{BufRead as _, BufReader, Seek as _},
  path::{Path, PathBuf},
  sync::Arc,
};

use csv::ByteRecord;
use encoding_rs::Encoding;
use srag_core::config::IngestConfig;

use crate::{Error, Result};

/// Delimiters considered when the configured one is absent from the header.
const DELIMITER_CANDIDATES: [u8; 4] = [b';', b',', b'\t', b'|'];

/// A window of at most `batch_size` raw rows.
#[derive(Debug)]
pub struct RawWindow {
  /// 1-based position of the window within its file.
  pub index:     usize,
  pub headers:   Arc<[String]>,
  pub records:   Vec<ByteRecord>,
  /// Lines skipped because they had more fields than the header.
  pub malformed: usize,
}

impl RawWindow {
  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

/// Lazy, single-pass iterator over the windows of one file.
///
/// Re-opening the file restarts from the first data row.
pub struct BatchReader {
  path:       PathBuf,
  inner:      Option<csv::Reader<File>>,
  headers:    Arc<[String]>,
  batch_size: usize,
  next_index: usize,
}

impl BatchReader {
  /// Open `path` and read its header.
  ///
  /// A file without a usable header (empty, or lacking the key column)
  /// yields no windows rather than an error.
  pub fn open(path: &Path, config: &IngestConfig) -> Result<Self> {
    let io_err = |source| Error::Io { path: path.to_path_buf(), source };

    let configured = config.delimiter_byte()?;
    let encoding = config.source_encoding()?;

    let mut file = File::open(path).map_err(io_err)?;
    let mut first_line = Vec::new();
    BufReader::new(&mut file)
      .read_until(b'\n', &mut first_line)
      .map_err(io_err)?;
    file.rewind().map_err(io_err)?;

    let delimiter = sniff_delimiter(&first_line, configured);
    if delimiter != configured {
      tracing::warn!(
        file = %path.display(),
        configured = %char::from(configured),
        detected = %char::from(delimiter),
        "header does not use the configured delimiter; using detected one"
      );
    }

    let mut inner = csv::ReaderBuilder::new()
      .delimiter(delimiter)
      .has_headers(true)
      .flexible(true)
      .from_reader(file);

    let headers: Arc<[String]> = decode_headers(inner.byte_headers()?, encoding).into();

    let mut reader = Self {
      path: path.to_path_buf(),
      inner: Some(inner),
      headers,
      batch_size: config.batch_size,
      next_index: 1,
    };

    if reader.headers.iter().all(String::is_empty) {
      tracing::warn!(file = %path.display(), "file has no header; skipping");
      reader.inner = None;
    } else if !reader
      .headers
      .iter()
      .any(|h| h == &config.columns.notification_id)
    {
      tracing::warn!(
        file = %path.display(),
        column = %config.columns.notification_id,
        "header lacks the key column; skipping"
      );
      reader.inner = None;
    }

    Ok(reader)
  }

  pub fn headers(&self) -> &Arc<[String]> { &self.headers }

  pub fn path(&self) -> &Path { &self.path }
}

impl Iterator for BatchReader {
  type Item = Result<RawWindow>;

  fn next(&mut self) -> Option<Self::Item> {
    let inner = self.inner.as_mut()?;
    let width = self.headers.len();
    let mut records = Vec::with_capacity(self.batch_size.min(8192));
    let mut malformed = 0usize;
    let mut exhausted = false;

    while records.len() < self.batch_size {
      let mut record = ByteRecord::new();
      match inner.read_byte_record(&mut record) {
        Ok(true) if record.len() > width => {
          malformed += 1;
          tracing::warn!(
            file = %self.path.display(),
            line = record.position().map(|p| p.line()),
            fields = record.len(),
            expected = width,
            "skipping malformed line"
          );
        }
        Ok(true) => records.push(record),
        Ok(false) => {
          exhausted = true;
          break;
        }
        Err(e) if e.is_io_error() => {
          self.inner = None;
          return Some(Err(e.into()));
        }
        Err(e) => {
          malformed += 1;
          tracing::warn!(
            file = %self.path.display(),
            error = %e,
            "skipping unreadable line"
          );
        }
      }
    }

    if exhausted {
      self.inner = None;
    }
    if records.is_empty() && malformed == 0 {
      return None;
    }

    let index = self.next_index;
    self.next_index += 1;
    Some(Ok(RawWindow {
      index,
      headers: Arc::clone(&self.headers),
      records,
      malformed,
    }))
  }
}

/// Pick the field delimiter from the header line.
///
/// The configured delimiter wins whenever it appears; otherwise the most
/// frequent candidate does. With no candidate present the configured one is
/// kept (single-column file).
pub fn sniff_delimiter(header_line: &[u8], configured: u8) -> u8 {
  if header_line.contains(&configured) {
    return configured;
  }
  DELIMITER_CANDIDATES
    .iter()
    .map(|&d| (d, header_line.iter().filter(|&&b| b == d).count()))
    .filter(|&(_, n)| n > 0)
    .max_by_key(|&(_, n)| n)
    .map_or(configured, |(d, _)| d)
}

/// Decode header names, trimming whitespace and any byte-order mark.
fn decode_headers(record: &ByteRecord, encoding: &'static Encoding) -> Vec<String> {
  record
    .iter()
    .map(|field| {
      let (decoded, _) = encoding.decode_without_bom_handling(field);
      decoded
        .strip_prefix('\u{feff}')
        .or_else(|| decoded.strip_prefix("ï»¿"))
        .unwrap_or(&decoded)
        .trim()
        .to_owned()
    })
    .collect()
}
