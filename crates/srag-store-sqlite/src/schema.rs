//! SQL schema for the SRAG case store.
//!
//! Executed by [`CaseStore::ensure_schema`](srag_core::store::CaseStore) at the
//! start of every run. Future migrations will be gated on `user_version`.

/// Permanent store DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Insert-only. The first row written for a notification_id wins.
CREATE TABLE IF NOT EXISTS cases (
    notification_id      INTEGER PRIMARY KEY,
    notification_date    TEXT,            -- YYYY-MM-DD or NULL
    patient_sex          TEXT NOT NULL,
    outcome              TEXT NOT NULL,
    final_classification TEXT NOT NULL,
    icu_admission        TEXT NOT NULL,
    covid_vaccinated     TEXT NOT NULL,
    flu_vaccinated       TEXT NOT NULL,
    state_code           TEXT
);

CREATE INDEX IF NOT EXISTS cases_notification_date_idx
    ON cases(notification_date);

PRAGMA user_version = 1;
";

/// Recreates the batch-scoped staging table. It lives in the `temp` schema,
/// so it is private to the connection, and carries no key constraint.
pub const RESET_STAGING: &str = "
DROP TABLE IF EXISTS temp.staging_cases;
CREATE TEMP TABLE staging_cases (
    notification_id      INTEGER NOT NULL,
    notification_date    TEXT,
    patient_sex          TEXT NOT NULL,
    outcome              TEXT NOT NULL,
    final_classification TEXT NOT NULL,
    icu_admission        TEXT NOT NULL,
    covid_vaccinated     TEXT NOT NULL,
    flu_vaccinated       TEXT NOT NULL,
    state_code           TEXT
);
";

pub const DROP_STAGING: &str = "DROP TABLE IF EXISTS temp.staging_cases;";

/// Column list shared by the staging insert and the merge.
pub const CASE_COLUMNS: &str = "notification_id, notification_date, patient_sex, outcome, \
   final_classification, icu_admission, covid_vaccinated, flu_vaccinated, state_code";
