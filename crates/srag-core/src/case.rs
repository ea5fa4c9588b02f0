//! Case records, the canonical unit of storage.
//!
//! A case is one SRAG notification. It is written exactly once, the first time
//! its `notification_id` is seen, and never updated afterwards.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{Error, Result};

// ─── Categories ──────────────────────────────────────────────────────────────

/// A categorical field with a closed set of display values.
///
/// Every persisted categorical column holds one of `Self::iter()`'s display
/// strings. Raw codes that cannot be translated collapse to
/// [`Category::UNSPECIFIED`].
pub trait Category:
  Copy + Eq + AsRef<str> + FromStr + IntoEnumIterator + 'static
{
  /// Category name, used in diagnostics when the column is not known.
  const FIELD: &'static str;

  /// The bucket for missing, ignored, or untranslatable codes.
  const UNSPECIFIED: Self;

  /// Parse a stored display value back into the enum.
  fn from_display(s: &str) -> Result<Self> { Self::from_column(Self::FIELD, s) }

  /// Like [`Category::from_display`], naming `column` in the error.
  fn from_column(column: &'static str, s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownCategory {
      field: column,
      value: s.to_owned(),
    })
  }

  /// All display values, in declaration order.
  fn display_values() -> Vec<&'static str>
  where
    Self: Into<&'static str>,
  {
    Self::iter().map(Into::into).collect()
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
  AsRefStr, Display, EnumIter, EnumString, strum::IntoStaticStr,
)]
pub enum Sex {
  #[serde(rename = "Masculino")]
  #[strum(to_string = "Masculino")]
  Male,
  #[serde(rename = "Feminino")]
  #[strum(to_string = "Feminino")]
  Female,
  #[serde(rename = "Ignorado")]
  #[strum(to_string = "Ignorado")]
  Ignored,
}

impl Category for Sex {
  const FIELD: &'static str = "patient_sex";
  const UNSPECIFIED: Self = Self::Ignored;
}

/// How the case evolved.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
  AsRefStr, Display, EnumIter, EnumString, strum::IntoStaticStr,
)]
pub enum Outcome {
  #[serde(rename = "Cura")]
  #[strum(to_string = "Cura")]
  Cure,
  #[serde(rename = "Óbito")]
  #[strum(to_string = "Óbito")]
  Death,
  #[serde(rename = "Óbito por outras causas")]
  #[strum(to_string = "Óbito por outras causas")]
  DeathOtherCauses,
  #[serde(rename = "Ignorado")]
  #[strum(to_string = "Ignorado")]
  Ignored,
}

impl Category for Outcome {
  const FIELD: &'static str = "outcome";
  const UNSPECIFIED: Self = Self::Ignored;
}

/// Final SRAG classification. There is no separate "ignored" value; the
/// unspecified sub-type doubles as the bucket for missing codes.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
  AsRefStr, Display, EnumIter, EnumString, strum::IntoStaticStr,
)]
pub enum Classification {
  #[serde(rename = "SRAG por Influenza")]
  #[strum(to_string = "SRAG por Influenza")]
  Influenza,
  #[serde(rename = "SRAG por outro vírus respiratório")]
  #[strum(to_string = "SRAG por outro vírus respiratório")]
  OtherRespiratoryVirus,
  #[serde(rename = "SRAG por outro agente etiológico")]
  #[strum(to_string = "SRAG por outro agente etiológico")]
  OtherEtiologicAgent,
  #[serde(rename = "SRAG não especificado")]
  #[strum(to_string = "SRAG não especificado")]
  Unspecified,
  #[serde(rename = "SRAG por COVID-19")]
  #[strum(to_string = "SRAG por COVID-19")]
  Covid19,
}

impl Category for Classification {
  const FIELD: &'static str = "final_classification";
  const UNSPECIFIED: Self = Self::Unspecified;
}

/// Shared yes/no/ignored answer used by the ICU and vaccination fields.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
  AsRefStr, Display, EnumIter, EnumString, strum::IntoStaticStr,
)]
pub enum YesNo {
  #[serde(rename = "Sim")]
  #[strum(to_string = "Sim")]
  Yes,
  #[serde(rename = "Não")]
  #[strum(to_string = "Não")]
  No,
  #[serde(rename = "Ignorado")]
  #[strum(to_string = "Ignorado")]
  Ignored,
}

impl Category for YesNo {
  const FIELD: &'static str = "yes/no answer";
  const UNSPECIFIED: Self = Self::Ignored;
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A normalised case, ready to be staged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
  pub notification_id:      i64,
  pub notification_date:    Option<NaiveDate>,
  pub patient_sex:          Sex,
  pub outcome:              Outcome,
  pub final_classification: Classification,
  pub icu_admission:        YesNo,
  pub covid_vaccinated:     YesNo,
  pub flu_vaccinated:       YesNo,
  pub state_code:           Option<String>,
}

/// Output of normalisation. Identical to [`CaseRecord`] except that the key
/// may have failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseCandidate {
  pub notification_id:      Option<i64>,
  pub notification_date:    Option<NaiveDate>,
  pub patient_sex:          Sex,
  pub outcome:              Outcome,
  pub final_classification: Classification,
  pub icu_admission:        YesNo,
  pub covid_vaccinated:     YesNo,
  pub flu_vaccinated:       YesNo,
  pub state_code:           Option<String>,
}

impl CaseCandidate {
  /// Promote to a [`CaseRecord`]; `None` when the key is missing.
  pub fn into_record(self) -> Option<CaseRecord> {
    Some(CaseRecord {
      notification_id:      self.notification_id?,
      notification_date:    self.notification_date,
      patient_sex:          self.patient_sex,
      outcome:              self.outcome,
      final_classification: self.final_classification,
      icu_admission:        self.icu_admission,
      covid_vaccinated:     self.covid_vaccinated,
      flu_vaccinated:       self.flu_vaccinated,
      state_code:           self.state_code,
    })
  }
}
