//! Raw rows → [`CaseCandidate`]s.
//!
//! Steps, applied per row:
//!   1. project the configured source columns (others are ignored)
//!   2. rename them onto the canonical fields
//!   3. coerce the key to an integer (failure → `None`)
//!   4. parse the notification date (failure → `None`)
//!   5. substitute the default code for blank categorical fields
//!   6. translate codes through the lookup tables (unknown → unspecified)
//!
//! No step can fail the row; a bad field only degrades that field.

use std::{borrow::Cow, collections::BTreeMap, sync::Arc};

use chrono::NaiveDate;
use csv::ByteRecord;
use encoding_rs::Encoding;
use srag_core::{
  case::{CaseCandidate, Category, Classification, Outcome, Sex, YesNo},
  config::{IngestConfig, LookupTables},
};

use crate::{RawWindow, Result};

/// Positions of the projected columns within one file's header.
#[derive(Debug, Clone, Copy, Default)]
struct Projection {
  notification_id:      Option<usize>,
  notification_date:    Option<usize>,
  patient_sex:          Option<usize>,
  outcome:              Option<usize>,
  final_classification: Option<usize>,
  icu_admission:        Option<usize>,
  covid_vaccinated:     Option<usize>,
  flu_vaccinated:       Option<usize>,
  state_code:           Option<usize>,
}

impl Projection {
  fn resolve(headers: &[String], config: &IngestConfig) -> Self {
    let find = |name: &str| headers.iter().position(|h| h == name);
    let c = &config.columns;
    Self {
      notification_id:      find(&c.notification_id),
      notification_date:    find(&c.notification_date),
      patient_sex:          find(&c.patient_sex),
      outcome:              find(&c.outcome),
      final_classification: find(&c.final_classification),
      icu_admission:        find(&c.icu_admission),
      covid_vaccinated:     find(&c.covid_vaccinated),
      flu_vaccinated:       find(&c.flu_vaccinated),
      state_code:           find(&c.state_code),
    }
  }
}

/// Lookup tables keyed by canonical code, so `"01"`, `"1.0"` and `"1"` (or
/// `"m"` and `"M"`) find the same entry.
#[derive(Debug)]
struct CodeTables {
  patient_sex:          BTreeMap<String, Sex>,
  outcome:              BTreeMap<String, Outcome>,
  final_classification: BTreeMap<String, Classification>,
  icu_admission:        BTreeMap<String, YesNo>,
  covid_vaccinated:     BTreeMap<String, YesNo>,
  flu_vaccinated:       BTreeMap<String, YesNo>,
}

impl CodeTables {
  fn from_lookups(l: &LookupTables) -> Self {
    Self {
      patient_sex:          canonical_table(&l.patient_sex),
      outcome:              canonical_table(&l.outcome),
      final_classification: canonical_table(&l.final_classification),
      icu_admission:        canonical_table(&l.icu_admission),
      covid_vaccinated:     canonical_table(&l.covid_vaccinated),
      flu_vaccinated:       canonical_table(&l.flu_vaccinated),
    }
  }
}

fn canonical_table<C: Category>(table: &BTreeMap<String, C>) -> BTreeMap<String, C> {
  table
    .iter()
    .map(|(code, value)| (canonical_code(code.trim()).into_owned(), *value))
    .collect()
}

/// Turns raw windows into case candidates according to an [`IngestConfig`].
///
/// Cheap to clone; the configuration is shared.
#[derive(Debug, Clone)]
pub struct Normalizer {
  config:   Arc<IngestConfig>,
  tables:   Arc<CodeTables>,
  encoding: &'static Encoding,
}

impl Normalizer {
  pub fn new(config: Arc<IngestConfig>) -> Result<Self> {
    let encoding = config.source_encoding()?;
    let tables = Arc::new(CodeTables::from_lookups(&config.lookups));
    Ok(Self { config, tables, encoding })
  }

  pub fn normalize(&self, window: &RawWindow) -> Vec<CaseCandidate> {
    let projection = Projection::resolve(&window.headers, &self.config);
    window
      .records
      .iter()
      .map(|record| self.normalize_row(record, &projection))
      .collect()
  }

  fn normalize_row(&self, record: &ByteRecord, p: &Projection) -> CaseCandidate {
    let field = |pos| decode_field(self.encoding, record, pos);

    let defaults = &self.config.defaults;
    let lookups = &*self.tables;

    CaseCandidate {
      notification_id:      field(p.notification_id).as_deref().and_then(parse_key),
      notification_date:    field(p.notification_date)
        .as_deref()
        .and_then(|s| parse_date(s, &self.config.date_formats)),
      patient_sex:          translate(
        &lookups.patient_sex,
        field(p.patient_sex).as_deref(),
        &defaults.patient_sex,
      ),
      outcome:              translate(
        &lookups.outcome,
        field(p.outcome).as_deref(),
        &defaults.outcome,
      ),
      final_classification: translate(
        &lookups.final_classification,
        field(p.final_classification).as_deref(),
        &defaults.final_classification,
      ),
      icu_admission:        translate(
        &lookups.icu_admission,
        field(p.icu_admission).as_deref(),
        &defaults.icu_admission,
      ),
      covid_vaccinated:     translate(
        &lookups.covid_vaccinated,
        field(p.covid_vaccinated).as_deref(),
        &defaults.covid_vaccinated,
      ),
      flu_vaccinated:       translate(
        &lookups.flu_vaccinated,
        field(p.flu_vaccinated).as_deref(),
        &defaults.flu_vaccinated,
      ),
      state_code:           field(p.state_code).map(Cow::into_owned),
    }
  }
}

// ─── Field conversions ───────────────────────────────────────────────────────

/// Decode and trim one field; blank or absent fields are `None`.
fn decode_field<'r>(
  encoding: &'static Encoding,
  record: &'r ByteRecord,
  pos: Option<usize>,
) -> Option<Cow<'r, str>> {
  let (decoded, _) = encoding.decode_without_bom_handling(record.get(pos?)?);
  match decoded {
    Cow::Borrowed(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(Cow::Borrowed),
    Cow::Owned(s) => Some(s.trim().to_owned())
      .filter(|s| !s.is_empty())
      .map(Cow::Owned),
  }
}

/// Integer key, accepting a float spelling with no fractional part.
pub fn parse_key(s: &str) -> Option<i64> {
  if let Ok(n) = s.parse::<i64>() {
    return Some(n);
  }
  let f = s.parse::<f64>().ok()?;
  (f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15).then_some(f as i64)
}

pub fn parse_date(s: &str, formats: &[String]) -> Option<NaiveDate> {
  formats
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Canonical spelling of a code: `"01"` and `"1.0"` both become `"1"`.
/// Non-numeric codes are upper-cased.
pub fn canonical_code(code: &str) -> Cow<'_, str> {
  match code.parse::<f64>() {
    Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
      let n = f as i64;
      if n.to_string() == code {
        Cow::Borrowed(code)
      } else {
        Cow::Owned(n.to_string())
      }
    }
    _ if code.chars().any(char::is_lowercase) => Cow::Owned(code.to_uppercase()),
    _ => Cow::Borrowed(code),
  }
}

/// Translate a raw code, substituting `default` when it is missing.
pub fn translate<C: Category>(
  table: &BTreeMap<String, C>,
  raw: Option<&str>,
  default: &str,
) -> C {
  let code = raw.unwrap_or(default);
  table
    .get(canonical_code(code).as_ref())
    .copied()
    .unwrap_or(C::UNSPECIFIED)
}

#[cfg(test)]
mod tests {
  use srag_core::case::{Classification, Outcome, Sex, YesNo};

  use super::*;

  fn window(headers: &[&str], rows: &[&[&[u8]]]) -> RawWindow {
    RawWindow {
      index:     1,
      headers:   headers.iter().map(|h| (*h).to_owned()).collect(),
      records:   rows.iter().map(|r| ByteRecord::from(r.to_vec())).collect(),
      malformed: 0,
    }
  }

  fn normalizer() -> Normalizer {
    Normalizer::new(Arc::new(IngestConfig::default())).unwrap()
  }

  const HEADERS: [&str; 10] = [
    "NU_NOTIFIC", "DT_NOTIFIC", "CS_SEXO", "EVOLUCAO", "CLASSI_FIN",
    "UTI", "VACINA_COV", "VACINA", "SG_UF", "UNRELATED",
  ];

  #[test]
  fn translates_a_complete_row() {
    let w = window(&HEADERS, &[&[
      b"1001", b"2024-01-05", b"M", b"1", b"5", b"1", b"1", b"2", b"SP", b"x",
    ]]);
    let c = &normalizer().normalize(&w)[0];

    assert_eq!(c.notification_id, Some(1001));
    assert_eq!(c.notification_date, NaiveDate::from_ymd_opt(2024, 1, 5));
    assert_eq!(c.patient_sex, Sex::Male);
    assert_eq!(c.outcome, Outcome::Cure);
    assert_eq!(c.final_classification, Classification::Covid19);
    assert_eq!(c.icu_admission, YesNo::Yes);
    assert_eq!(c.covid_vaccinated, YesNo::Yes);
    assert_eq!(c.flu_vaccinated, YesNo::No);
    assert_eq!(c.state_code.as_deref(), Some("SP"));
  }

  #[test]
  fn blank_fields_fall_back_to_defaults() {
    let w = window(&HEADERS, &[&[b"7", b"", b" ", b"", b"", b"", b"", b"", b"", b""]]);
    let c = &normalizer().normalize(&w)[0];

    assert_eq!(c.notification_date, None);
    assert_eq!(c.patient_sex, Sex::Ignored);
    assert_eq!(c.outcome, Outcome::Ignored);
    assert_eq!(c.final_classification, Classification::Unspecified);
    assert_eq!(c.icu_admission, YesNo::Ignored);
    assert_eq!(c.state_code, None);
  }

  #[test]
  fn missing_columns_fall_back_to_defaults() {
    let w = window(&["NU_NOTIFIC"], &[&[b"7"]]);
    let c = &normalizer().normalize(&w)[0];
    assert_eq!(c.notification_id, Some(7));
    assert_eq!(c.covid_vaccinated, YesNo::Ignored);
    assert_eq!(c.final_classification, Classification::Unspecified);
  }

  #[test]
  fn short_rows_are_padded_with_defaults() {
    let w = window(&HEADERS, &[&[b"8", b"05/01/2024", b"F"]]);
    let c = &normalizer().normalize(&w)[0];
    assert_eq!(c.patient_sex, Sex::Female);
    assert_eq!(c.notification_date, NaiveDate::from_ymd_opt(2024, 1, 5));
    assert_eq!(c.outcome, Outcome::Ignored);
  }

  #[test]
  fn unknown_codes_become_unspecified() {
    let w = window(&HEADERS, &[&[
      b"9", b"not a date", b"X", b"7", b"99", b"abc", b"3", b"-1", b"RS", b"",
    ]]);
    let c = &normalizer().normalize(&w)[0];

    assert_eq!(c.notification_date, None);
    assert_eq!(c.patient_sex, Sex::Ignored);
    assert_eq!(c.outcome, Outcome::Ignored);
    assert_eq!(c.final_classification, Classification::Unspecified);
    assert_eq!(c.icu_admission, YesNo::Ignored);
    assert_eq!(c.covid_vaccinated, YesNo::Ignored);
    assert_eq!(c.flu_vaccinated, YesNo::Ignored);
  }

  #[test]
  fn bad_keys_become_none() {
    let w = window(&HEADERS, &[&[b""], &[b"abc"], &[b"12.5"], &[b" 42 "], &[b"43.0"]]);
    let keys: Vec<Option<i64>> = normalizer()
      .normalize(&w)
      .into_iter()
      .map(|c| c.notification_id)
      .collect();
    assert_eq!(keys, [None, None, None, Some(42), Some(43)]);
  }

  #[test]
  fn decodes_latin1_bytes() {
    let w = window(&HEADERS, &[&[
      b"1", b"", b"", b"", b"", b"", b"", b"", b"S\xc3O", b"",
    ]]);
    let c = &normalizer().normalize(&w)[0];
    assert_eq!(c.state_code.as_deref(), Some("SÃO"));
  }

  #[test]
  fn float_codes_are_canonicalised() {
    assert_eq!(canonical_code("1.0"), "1");
    assert_eq!(canonical_code("09"), "9");
    assert_eq!(canonical_code("M"), "M");
    assert_eq!(canonical_code("f"), "F");
    assert_eq!(canonical_code("nan"), "NAN");
  }

  #[test]
  fn table_keys_are_matched_canonically() {
    let mut config = IngestConfig::default();
    // Keys as a case-folding config source would hand them over.
    config.lookups.patient_sex = [("m", Sex::Male), ("f", Sex::Female), ("i", Sex::Ignored)]
      .into_iter()
      .map(|(k, v)| (k.to_owned(), v))
      .collect();
    config.lookups.outcome.insert("02".into(), Outcome::Death);
    let n = Normalizer::new(Arc::new(config)).unwrap();

    let w = window(&HEADERS, &[&[b"1", b"", b"M", b"2.0"], &[b"2", b"", b"f", b"2"]]);
    let cs = n.normalize(&w);
    assert_eq!(cs[0].patient_sex, Sex::Male);
    assert_eq!(cs[0].outcome, Outcome::Death);
    assert_eq!(cs[1].patient_sex, Sex::Female);
    assert_eq!(cs[1].outcome, Outcome::Death);
  }

  #[test]
  fn parse_date_tries_formats_in_order() {
    let formats = IngestConfig::default().date_formats;
    let expected = NaiveDate::from_ymd_opt(2024, 1, 5);
    assert_eq!(parse_date("2024-01-05", &formats), expected);
    assert_eq!(parse_date("05/01/2024", &formats), expected);
    assert_eq!(parse_date("2024-01-05 13:45:00", &formats), expected);
    assert_eq!(parse_date("2024-13-45", &formats), None);
  }
}
