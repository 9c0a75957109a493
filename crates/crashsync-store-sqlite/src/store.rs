//! [`SqliteStore`] — the SQLite implementation of [`ReportStore`].

use std::path::Path;

use tracing::debug;

use crashsync_core::{
  batch::ResolutionBatch,
  report::{CrashReport, UploadId},
  store::{MissDisposition, ReportStore},
};

use crate::{Result, schema};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A crash report store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. The selector
/// and the writer share that one connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema migration.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        schema::migrate(conn)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Close the underlying connection, surfacing any error from SQLite.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  /// Insert an unresolved record.
  ///
  /// Records normally arrive from the crash ingestion pipeline; this exists
  /// for seeding and tests.
  pub async fn insert_report(&self, name: &str) -> Result<()> {
    let name = name.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO crash_reports (name) VALUES (?1)",
          rusqlite::params![name],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Every row stored under `name`, in insertion order.
  pub async fn reports_named(&self, name: &str) -> Result<Vec<CrashReport>> {
    let name = name.to_owned();
    let raws: Vec<(String, Option<i64>, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT name, upload_id, lookup_attempts
           FROM crash_reports
           WHERE name = ?1
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![name], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(name, upload_id, attempts)| -> Result<CrashReport> {
        Ok(CrashReport {
          name,
          upload_id: upload_id.map(UploadId::from_stored).transpose()?,
          lookup_attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
        })
      })
      .collect()
  }
}

// ─── ReportStore impl ────────────────────────────────────────────────────────

impl ReportStore for SqliteStore {
  type Error = crate::Error;

  async fn missing_records(&self, limit: usize) -> Result<Vec<String>> {
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let names = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT name FROM crash_reports
           WHERE upload_id IS NULL
           GROUP BY name
           ORDER BY MIN(rowid)
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(names)
  }

  async fn apply_batch(&self, batch: &ResolutionBatch) -> Result<usize> {
    let pairs: Vec<(i64, String)> = batch
      .iter()
      .map(|c| (c.upload_id.get(), c.file_name.clone()))
      .collect();

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut changed = 0;
        {
          let mut stmt = tx.prepare_cached(
            "UPDATE crash_reports SET upload_id = ?1
             WHERE name = ?2 AND upload_id IS NULL",
          )?;
          for (upload_id, name) in &pairs {
            changed += stmt.execute(rusqlite::params![upload_id, name])?;
          }
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;

    debug!(pairs = batch.len(), changed, "applied resolution batch");
    Ok(changed)
  }

  async fn record_miss(&self, name: &str, max_attempts: u32) -> Result<MissDisposition> {
    let name = name.to_owned();

    let (counted, skipped, attempts): (usize, usize, Option<i64>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let counted = tx.execute(
          "UPDATE crash_reports SET lookup_attempts = lookup_attempts + 1
           WHERE name = ?1 AND upload_id IS NULL",
          rusqlite::params![name],
        )?;
        let skipped = tx.execute(
          "UPDATE crash_reports SET upload_id = 0
           WHERE name = ?1 AND upload_id IS NULL AND lookup_attempts >= ?2",
          rusqlite::params![name, max_attempts],
        )?;
        let attempts: Option<i64> = tx.query_row(
          "SELECT MAX(lookup_attempts) FROM crash_reports
           WHERE name = ?1 AND upload_id IS NULL",
          rusqlite::params![name],
          |row| row.get(0),
        )?;
        tx.commit()?;
        Ok((counted, skipped, attempts))
      })
      .await?;

    if counted == 0 {
      return Ok(MissDisposition::AlreadyResolved);
    }
    if skipped > 0 {
      return Ok(MissDisposition::Skipped);
    }
    let attempts = attempts
      .and_then(|a| u32::try_from(a).ok())
      .unwrap_or(0);
    Ok(MissDisposition::RetryLater { attempts })
  }
}
