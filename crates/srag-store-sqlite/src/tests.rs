//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use srag_core::{
  case::{CaseRecord, Classification, Outcome, Sex, YesNo},
  store::CaseStore,
};
use strum::IntoEnumIterator;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  let s = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  s.ensure_schema().await.expect("schema");
  s
}

fn case(id: i64, outcome: Outcome) -> CaseRecord {
  CaseRecord {
    notification_id:      id,
    notification_date:    NaiveDate::from_ymd_opt(2024, 1, 5),
    patient_sex:          Sex::Male,
    outcome,
    final_classification: Classification::Covid19,
    icu_admission:        YesNo::Yes,
    covid_vaccinated:     YesNo::Yes,
    flu_vaccinated:       YesNo::No,
    state_code:           Some("SP".into()),
  }
}

async fn staging_exists(s: &SqliteStore) -> bool {
  s.connection()
    .call(|conn| {
      let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_temp_master WHERE name = 'staging_cases'",
        [],
        |r| r.get(0),
      )?;
      Ok(n > 0)
    })
    .await
    .unwrap()
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ensure_schema_is_idempotent() {
  let s = store().await;
  s.ensure_schema().await.unwrap();
  s.ensure_schema().await.unwrap();
  assert_eq!(s.count_cases().await.unwrap(), 0);
}

#[tokio::test]
async fn schema_creates_date_index() {
  let s = store().await;
  let found: i64 = s
    .connection()
    .call(|conn| {
      Ok(conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master
         WHERE type = 'index' AND name = 'cases_notification_date_idx'",
        [],
        |r| r.get(0),
      )?)
    })
    .await
    .unwrap();
  assert_eq!(found, 1);
}

#[tokio::test]
async fn schema_persists_across_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("srag.db");

  let s = SqliteStore::open(&path).await.unwrap();
  s.ensure_schema().await.unwrap();
  s.merge_batch(vec![case(1, Outcome::Cure)]).await.unwrap();
  drop(s);

  let reopened = SqliteStore::open(&path).await.unwrap();
  reopened.ensure_schema().await.unwrap();
  assert_eq!(reopened.count_cases().await.unwrap(), 1);
}

// ─── Merge ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn merge_inserts_and_reports_count() {
  let s = store().await;
  let inserted = s
    .merge_batch(vec![case(1, Outcome::Cure), case(2, Outcome::Death)])
    .await
    .unwrap();
  assert_eq!(inserted, 2);
  assert_eq!(s.count_cases().await.unwrap(), 2);
}

#[tokio::test]
async fn merging_same_batch_twice_inserts_nothing() {
  let s = store().await;
  let batch = vec![case(1, Outcome::Cure), case(2, Outcome::Death)];

  assert_eq!(s.merge_batch(batch.clone()).await.unwrap(), 2);
  assert_eq!(s.merge_batch(batch).await.unwrap(), 0);
  assert_eq!(s.count_cases().await.unwrap(), 2);
}

#[tokio::test]
async fn first_write_wins() {
  let s = store().await;
  s.merge_batch(vec![case(10, Outcome::Cure)]).await.unwrap();

  let inserted = s
    .merge_batch(vec![case(10, Outcome::Death), case(11, Outcome::Death)])
    .await
    .unwrap();
  assert_eq!(inserted, 1);

  let kept = s.get_case(10).await.unwrap().unwrap();
  assert_eq!(kept.outcome, Outcome::Cure);
}

#[tokio::test]
async fn empty_batch_inserts_nothing() {
  let s = store().await;
  assert_eq!(s.merge_batch(vec![]).await.unwrap(), 0);
}

#[tokio::test]
async fn get_case_round_trips_all_fields() {
  let s = store().await;
  let mut original = case(42, Outcome::DeathOtherCauses);
  original.notification_date = None;
  original.state_code = None;
  original.patient_sex = Sex::Female;
  original.final_classification = Classification::OtherEtiologicAgent;
  original.covid_vaccinated = YesNo::Ignored;

  s.merge_batch(vec![original.clone()]).await.unwrap();
  assert_eq!(s.get_case(42).await.unwrap(), Some(original));
}

#[tokio::test]
async fn get_case_missing_returns_none() {
  let s = store().await;
  assert!(s.get_case(999).await.unwrap().is_none());
}

#[tokio::test]
async fn stored_categories_are_display_values() {
  let s = store().await;
  let batch: Vec<CaseRecord> = Outcome::iter()
    .enumerate()
    .map(|(i, o)| case(i as i64, o))
    .collect();
  s.merge_batch(batch).await.unwrap();

  let outcomes: Vec<String> = s
    .connection()
    .call(|conn| {
      let mut stmt = conn.prepare("SELECT outcome FROM cases ORDER BY notification_id")?;
      let rows = stmt
        .query_map([], |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
      Ok(rows)
    })
    .await
    .unwrap();
  assert_eq!(outcomes, ["Cura", "Óbito", "Óbito por outras causas", "Ignorado"]);
}

// ─── Staging ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn staging_is_dropped_after_merge() {
  let s = store().await;
  s.merge_batch(vec![case(1, Outcome::Cure)]).await.unwrap();
  assert!(!staging_exists(&s).await);
}

#[tokio::test]
async fn failed_merge_rolls_back_and_cleans_staging() {
  let s = store().await;
  s.merge_batch(vec![case(1, Outcome::Cure)]).await.unwrap();

  // Make the merge fail after staging has been populated.
  s.connection()
    .call(|conn| {
      conn.execute_batch(
        "CREATE TRIGGER reject_seven BEFORE INSERT ON cases
         WHEN NEW.notification_id = 7
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let result = s
    .merge_batch(vec![case(6, Outcome::Cure), case(7, Outcome::Cure)])
    .await;
  assert!(result.is_err());

  assert_eq!(s.count_cases().await.unwrap(), 1);
  assert!(s.get_case(6).await.unwrap().is_none());
  assert!(!staging_exists(&s).await);

  // The store is still usable afterwards.
  assert_eq!(s.merge_batch(vec![case(8, Outcome::Cure)]).await.unwrap(), 1);
}

#[tokio::test]
async fn drop_staging_without_staging_is_a_no_op() {
  let s = store().await;
  s.drop_staging().await.unwrap();
  s.drop_staging().await.unwrap();
}

// ─── Read-back ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn unreadable_category_names_its_column() {
  let s = store().await;
  s.merge_batch(vec![case(3, Outcome::Cure)]).await.unwrap();
  s.connection()
    .call(|conn| {
      conn.execute("UPDATE cases SET covid_vaccinated = 'S' WHERE notification_id = 3", [])?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.get_case(3).await.unwrap_err();
  assert!(
    matches!(
      err,
      crate::Error::Core(srag_core::Error::UnknownCategory { field: "covid_vaccinated", .. })
    ),
    "{err}"
  );
}
