//! Encoding and decoding helpers between [`CaseRecord`] and the plain-text
//! representation stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD` strings so that lexical order matches
//! calendar order. Categorical fields are stored as their display values.

use chrono::NaiveDate;
use srag_core::case::{CaseRecord, Category, Classification, Outcome, Sex, YesNo};

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A case flattened into owned column values, ready to be moved onto the
/// database thread.
pub struct EncodedCase {
  pub notification_id:      i64,
  pub notification_date:    Option<String>,
  pub patient_sex:          &'static str,
  pub outcome:              &'static str,
  pub final_classification: &'static str,
  pub icu_admission:        &'static str,
  pub covid_vaccinated:     &'static str,
  pub flu_vaccinated:       &'static str,
  pub state_code:           Option<String>,
}

impl From<CaseRecord> for EncodedCase {
  fn from(c: CaseRecord) -> Self {
    Self {
      notification_id:      c.notification_id,
      notification_date:    c.notification_date.map(encode_date),
      patient_sex:          c.patient_sex.into(),
      outcome:              c.outcome.into(),
      final_classification: c.final_classification.into(),
      icu_admission:        c.icu_admission.into(),
      covid_vaccinated:     c.covid_vaccinated.into(),
      flu_vaccinated:       c.flu_vaccinated.into(),
      state_code:           c.state_code,
    }
  }
}

/// Raw values read directly from a `cases` row.
pub struct RawCase {
  pub notification_id:      i64,
  pub notification_date:    Option<String>,
  pub patient_sex:          String,
  pub outcome:              String,
  pub final_classification: String,
  pub icu_admission:        String,
  pub covid_vaccinated:     String,
  pub flu_vaccinated:       String,
  pub state_code:           Option<String>,
}

impl RawCase {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id:      row.get(0)?,
      notification_date:    row.get(1)?,
      patient_sex:          row.get(2)?,
      outcome:              row.get(3)?,
      final_classification: row.get(4)?,
      icu_admission:        row.get(5)?,
      covid_vaccinated:     row.get(6)?,
      flu_vaccinated:       row.get(7)?,
      state_code:           row.get(8)?,
    })
  }

  pub fn into_case(self) -> Result<CaseRecord> {
    Ok(CaseRecord {
      notification_id:      self.notification_id,
      notification_date:    self
        .notification_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      patient_sex:          Sex::from_column("patient_sex", &self.patient_sex)?,
      outcome:              Outcome::from_column("outcome", &self.outcome)?,
      final_classification: Classification::from_column(
        "final_classification",
        &self.final_classification,
      )?,
      icu_admission:        YesNo::from_column("icu_admission", &self.icu_admission)?,
      covid_vaccinated:     YesNo::from_column("covid_vaccinated", &self.covid_vaccinated)?,
      flu_vaccinated:       YesNo::from_column("flu_vaccinated", &self.flu_vaccinated)?,
      state_code:           self.state_code,
    })
  }
}
