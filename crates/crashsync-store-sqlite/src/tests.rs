//! Integration tests for `SqliteStore` against in-memory and on-disk databases.

use crashsync_core::{
  batch::{CandidateMatch, ResolutionBatch},
  report::UploadId,
  store::{MissDisposition, ReportStore},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn seeded(names: &[&str]) -> SqliteStore {
  let s = store().await;
  for name in names {
    s.insert_report(name).await.unwrap();
  }
  s
}

fn batch(pairs: &[(i64, &str)]) -> ResolutionBatch {
  pairs
    .iter()
    .map(|(id, name)| CandidateMatch {
      upload_id: UploadId::new(*id).unwrap(),
      file_name: name.to_string(),
    })
    .collect()
}

fn id(raw: i64) -> Option<UploadId> { Some(UploadId::new(raw).unwrap()) }

// ─── Selector ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_records_in_insertion_order() {
  let s = seeded(&["c.dmp", "a.dmp", "b.dmp"]).await;

  let names = s.missing_records(10).await.unwrap();
  assert_eq!(names, ["c.dmp", "a.dmp", "b.dmp"]);
}

#[tokio::test]
async fn missing_records_is_bounded() {
  let s = seeded(&["a.dmp", "b.dmp", "c.dmp"]).await;

  assert_eq!(s.missing_records(1).await.unwrap(), ["a.dmp"]);
  assert_eq!(s.missing_records(2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn missing_records_excludes_resolved_and_skipped() {
  let s = seeded(&["a.dmp", "b.dmp", "c.dmp"]).await;
  s.apply_batch(&batch(&[(5, "a.dmp")])).await.unwrap();
  s.record_miss("b.dmp", 1).await.unwrap();

  assert_eq!(s.missing_records(10).await.unwrap(), ["c.dmp"]);
}

#[tokio::test]
async fn missing_records_returns_each_name_once() {
  let s = seeded(&["dup.dmp", "a.dmp", "dup.dmp", "b.dmp"]).await;

  assert_eq!(s.missing_records(10).await.unwrap(), ["dup.dmp", "a.dmp", "b.dmp"]);
  assert_eq!(s.missing_records(2).await.unwrap(), ["dup.dmp", "a.dmp"]);
}

#[tokio::test]
async fn missing_records_empty_store() {
  let s = store().await;
  assert!(s.missing_records(5).await.unwrap().is_empty());
}

// ─── Writer ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn apply_batch_sets_upload_id() {
  let s = seeded(&["abc.dmp"]).await;

  let changed = s.apply_batch(&batch(&[(42, "abc.dmp")])).await.unwrap();

  assert_eq!(changed, 1);
  let rows = s.reports_named("abc.dmp").await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].upload_id, id(42));
}

#[tokio::test]
async fn apply_batch_never_overwrites_resolved_record() {
  let s = seeded(&["abc.dmp"]).await;
  s.apply_batch(&batch(&[(42, "abc.dmp")])).await.unwrap();

  let changed = s.apply_batch(&batch(&[(99, "abc.dmp")])).await.unwrap();

  assert_eq!(changed, 0);
  assert_eq!(s.reports_named("abc.dmp").await.unwrap()[0].upload_id, id(42));
}

#[tokio::test]
async fn apply_batch_unknown_name_is_noop() {
  let s = seeded(&["abc.dmp"]).await;

  let changed = s.apply_batch(&batch(&[(7, "nope.dmp")])).await.unwrap();

  assert_eq!(changed, 0);
  assert_eq!(s.reports_named("abc.dmp").await.unwrap()[0].upload_id, None);
}

#[tokio::test]
async fn apply_batch_updates_every_pair() {
  let s = seeded(&["a.dmp", "b.dmp", "c.dmp"]).await;

  let changed = s
    .apply_batch(&batch(&[(1, "a.dmp"), (2, "b.dmp"), (3, "c.dmp")]))
    .await
    .unwrap();

  assert_eq!(changed, 3);
  assert_eq!(s.reports_named("c.dmp").await.unwrap()[0].upload_id, id(3));
}

#[tokio::test]
async fn apply_batch_updates_duplicate_names() {
  let s = seeded(&["dup.dmp", "dup.dmp"]).await;

  let changed = s.apply_batch(&batch(&[(8, "dup.dmp")])).await.unwrap();

  assert_eq!(changed, 2);
  let rows = s.reports_named("dup.dmp").await.unwrap();
  assert!(rows.iter().all(|r| r.upload_id == id(8)));
}

// ─── Misses ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_miss_counts_then_skips() {
  let s = seeded(&["gone.dmp"]).await;

  assert_eq!(
    s.record_miss("gone.dmp", 3).await.unwrap(),
    MissDisposition::RetryLater { attempts: 1 }
  );
  assert_eq!(
    s.record_miss("gone.dmp", 3).await.unwrap(),
    MissDisposition::RetryLater { attempts: 2 }
  );
  assert_eq!(s.record_miss("gone.dmp", 3).await.unwrap(), MissDisposition::Skipped);

  let row = &s.reports_named("gone.dmp").await.unwrap()[0];
  assert_eq!(row.upload_id, Some(UploadId::SKIPPED));
  assert_eq!(row.lookup_attempts, 3);
}

#[tokio::test]
async fn record_miss_leaves_resolved_records_alone() {
  let s = seeded(&["abc.dmp"]).await;
  s.apply_batch(&batch(&[(42, "abc.dmp")])).await.unwrap();

  let disposition = s.record_miss("abc.dmp", 1).await.unwrap();

  assert_eq!(disposition, MissDisposition::AlreadyResolved);
  let row = &s.reports_named("abc.dmp").await.unwrap()[0];
  assert_eq!(row.upload_id, id(42));
  assert_eq!(row.lookup_attempts, 0);
}

#[tokio::test]
async fn duplicate_rows_count_one_miss_per_lookup() {
  let s = seeded(&["dup.dmp", "dup.dmp"]).await;

  for expected in 1..=2 {
    let names = s.missing_records(10).await.unwrap();
    assert_eq!(names, ["dup.dmp"]);
    assert_eq!(
      s.record_miss(&names[0], 3).await.unwrap(),
      MissDisposition::RetryLater { attempts: expected }
    );
  }
  assert_eq!(s.record_miss("dup.dmp", 3).await.unwrap(), MissDisposition::Skipped);

  let rows = s.reports_named("dup.dmp").await.unwrap();
  assert!(rows.iter().all(|r| r.lookup_attempts == 3));
  assert!(rows.iter().all(|r| r.upload_id == Some(UploadId::SKIPPED)));
}

#[tokio::test]
async fn skipped_record_is_not_resolved_later() {
  let s = seeded(&["gone.dmp"]).await;
  s.record_miss("gone.dmp", 1).await.unwrap();

  let changed = s.apply_batch(&batch(&[(42, "gone.dmp")])).await.unwrap();

  assert_eq!(changed, 0);
  assert!(s.reports_named("gone.dmp").await.unwrap()[0].upload_id.unwrap().is_skipped());
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reopening_preserves_rows() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("reports.db");

  let s = SqliteStore::open(&path).await.unwrap();
  s.insert_report("a.dmp").await.unwrap();
  s.apply_batch(&batch(&[(3, "a.dmp")])).await.unwrap();
  s.close().await.unwrap();

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.reports_named("a.dmp").await.unwrap()[0].upload_id, id(3));
}

#[tokio::test]
async fn legacy_table_gains_attempt_counter() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("legacy.db");
  {
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn
      .execute_batch(
        "CREATE TABLE crash_reports (name TEXT NOT NULL, upload_id INTEGER);
         INSERT INTO crash_reports (name, upload_id) VALUES ('old.dmp', NULL);
         INSERT INTO crash_reports (name, upload_id) VALUES ('done.dmp', 17);",
      )
      .unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();

  assert_eq!(s.missing_records(10).await.unwrap(), ["old.dmp"]);
  assert_eq!(
    s.record_miss("old.dmp", 5).await.unwrap(),
    MissDisposition::RetryLater { attempts: 1 }
  );
  assert_eq!(s.reports_named("done.dmp").await.unwrap()[0].upload_id, id(17));
}
