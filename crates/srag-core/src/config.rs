//! Immutable ingestion configuration.
//!
//! Everything the pipeline needs to know about the source files (delimiter,
//! encoding, column names, categorical code tables) lives here and is passed
//! to the engine at construction. The loader binary deserialises it from a
//! TOML file and `SRAG_*` environment variables; every field has a default
//! matching the OpenDataSUS SRAG extracts.

use std::{collections::BTreeMap, path::PathBuf};

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  case::{Classification, Outcome, Sex, YesNo},
};

pub const DEFAULT_BATCH_SIZE: usize = 200_000;

// ─── Top-level ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
  /// Directory scanned for source files.
  pub data_dir:       PathBuf,
  /// SQLite database file holding the permanent store.
  pub store_path:     PathBuf,
  /// Single ASCII field delimiter.
  pub delimiter:      String,
  /// WHATWG encoding label of the source bytes (e.g. `latin1`).
  ///
  /// Labels resolve through `encoding_rs`, so `latin1` and `iso-8859-1` mean
  /// windows-1252: bytes 0x80 to 0x9F decode to the printable characters of
  /// that code page (0x80 is `€`), not to C1 control codes.
  pub encoding:       String,
  /// Maximum number of rows per batch window.
  pub batch_size:     usize,
  /// Only files with this extension are ingested.
  pub file_extension: String,
  /// `chrono` formats tried in order for the notification date.
  pub date_formats:   Vec<String>,
  pub columns:        ColumnMapping,
  pub defaults:       MissingCodes,
  pub lookups:        LookupTables,
}

impl Default for IngestConfig {
  fn default() -> Self {
    Self {
      data_dir:       PathBuf::from("data/srag_csvs"),
      store_path:     PathBuf::from("srag.db"),
      delimiter:      ";".into(),
      encoding:       "latin1".into(),
      batch_size:     DEFAULT_BATCH_SIZE,
      file_extension: "csv".into(),
      date_formats:   vec![
        "%Y-%m-%d".into(),
        "%d/%m/%Y".into(),
        "%Y-%m-%d %H:%M:%S".into(),
        "%d/%m/%Y %H:%M:%S".into(),
      ],
      columns:        ColumnMapping::default(),
      defaults:       MissingCodes::default(),
      lookups:        LookupTables::default(),
    }
  }
}

impl IngestConfig {
  /// Reject settings the pipeline cannot work with.
  pub fn validate(&self) -> Result<()> {
    if self.batch_size == 0 {
      return Err(Error::InvalidConfig("batch_size must be positive".into()));
    }
    self.delimiter_byte()?;
    self.source_encoding()?;
    if let Some((field, _)) = self
      .columns
      .pairs()
      .into_iter()
      .find(|(_, source)| source.trim().is_empty())
    {
      return Err(Error::InvalidConfig(format!(
        "empty source column name for {field}"
      )));
    }
    if self.date_formats.is_empty() {
      return Err(Error::InvalidConfig("date_formats must not be empty".into()));
    }
    Ok(())
  }

  pub fn delimiter_byte(&self) -> Result<u8> {
    match self.delimiter.as_bytes() {
      [b] if b.is_ascii() => Ok(*b),
      _ => Err(Error::InvalidConfig(format!(
        "delimiter must be a single ASCII character, got {:?}",
        self.delimiter
      ))),
    }
  }

  pub fn source_encoding(&self) -> Result<&'static Encoding> {
    Encoding::for_label(self.encoding.trim().as_bytes()).ok_or_else(|| {
      Error::InvalidConfig(format!("unknown encoding label {:?}", self.encoding))
    })
  }
}

// ─── Column mapping ──────────────────────────────────────────────────────────

/// Source column name for each canonical field (fixed 1:1 rename table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
  pub notification_id:      String,
  pub notification_date:    String,
  pub patient_sex:          String,
  pub outcome:              String,
  pub final_classification: String,
  pub icu_admission:        String,
  pub covid_vaccinated:     String,
  pub flu_vaccinated:       String,
  pub state_code:           String,
}

impl Default for ColumnMapping {
  fn default() -> Self {
    Self {
      notification_id:      "NU_NOTIFIC".into(),
      notification_date:    "DT_NOTIFIC".into(),
      patient_sex:          "CS_SEXO".into(),
      outcome:              "EVOLUCAO".into(),
      final_classification: "CLASSI_FIN".into(),
      icu_admission:        "UTI".into(),
      covid_vaccinated:     "VACINA_COV".into(),
      flu_vaccinated:       "VACINA".into(),
      state_code:           "SG_UF".into(),
    }
  }
}

impl ColumnMapping {
  /// `(canonical, source)` pairs in store column order.
  pub fn pairs(&self) -> [(&'static str, &str); 9] {
    [
      ("notification_id", self.notification_id.as_str()),
      ("notification_date", self.notification_date.as_str()),
      ("patient_sex", self.patient_sex.as_str()),
      ("outcome", self.outcome.as_str()),
      ("final_classification", self.final_classification.as_str()),
      ("icu_admission", self.icu_admission.as_str()),
      ("covid_vaccinated", self.covid_vaccinated.as_str()),
      ("flu_vaccinated", self.flu_vaccinated.as_str()),
      ("state_code", self.state_code.as_str()),
    ]
  }
}

// ─── Defaults for missing codes ──────────────────────────────────────────────

/// Raw code substituted for a blank or absent categorical field before
/// translation, so that "missing" and "explicitly ignored" land in the same
/// category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingCodes {
  pub patient_sex:          String,
  pub outcome:              String,
  pub final_classification: String,
  pub icu_admission:        String,
  pub covid_vaccinated:     String,
  pub flu_vaccinated:       String,
}

impl Default for MissingCodes {
  fn default() -> Self {
    Self {
      patient_sex:          "I".into(),
      outcome:              "9".into(),
      final_classification: "4".into(),
      icu_admission:        "9".into(),
      covid_vaccinated:     "9".into(),
      flu_vaccinated:       "9".into(),
    }
  }
}

// ─── Lookup tables ───────────────────────────────────────────────────────────

/// Raw code → display value, per categorical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupTables {
  pub patient_sex:          BTreeMap<String, Sex>,
  pub outcome:              BTreeMap<String, Outcome>,
  pub final_classification: BTreeMap<String, Classification>,
  pub icu_admission:        BTreeMap<String, YesNo>,
  pub covid_vaccinated:     BTreeMap<String, YesNo>,
  pub flu_vaccinated:       BTreeMap<String, YesNo>,
}

fn table<C: Copy>(entries: &[(&str, C)]) -> BTreeMap<String, C> {
  entries.iter().map(|(code, v)| ((*code).to_owned(), *v)).collect()
}

fn yes_no_table() -> BTreeMap<String, YesNo> {
  table(&[("1", YesNo::Yes), ("2", YesNo::No), ("9", YesNo::Ignored)])
}

impl Default for LookupTables {
  fn default() -> Self {
    Self {
      patient_sex:          table(&[
        ("M", Sex::Male),
        ("F", Sex::Female),
        ("I", Sex::Ignored),
      ]),
      outcome:              table(&[
        ("1", Outcome::Cure),
        ("2", Outcome::Death),
        ("3", Outcome::DeathOtherCauses),
        ("9", Outcome::Ignored),
      ]),
      final_classification: table(&[
        ("1", Classification::Influenza),
        ("2", Classification::OtherRespiratoryVirus),
        ("3", Classification::OtherEtiologicAgent),
        ("4", Classification::Unspecified),
        ("5", Classification::Covid19),
      ]),
      icu_admission:        yes_no_table(),
      covid_vaccinated:     yes_no_table(),
      flu_vaccinated:       yes_no_table(),
    }
  }
}
