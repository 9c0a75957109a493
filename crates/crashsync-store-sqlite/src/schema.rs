//! SQL schema for the crashsync SQLite store.
//!
//! Tracked with `PRAGMA user_version`. Version 1 adds the `lookup_attempts`
//! counter; tables created before it are migrated in place.

use tracing::info;

pub const SCHEMA_VERSION: i64 = 1;

/// Base DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS crash_reports (
    id              INTEGER PRIMARY KEY,
    name            TEXT NOT NULL,    -- dump file name; unique in practice, not enforced
    upload_id       INTEGER,          -- NULL = unresolved, 0 = given up
    lookup_attempts INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS crash_reports_name_idx ON crash_reports(name);
";

const ADD_LOOKUP_ATTEMPTS: &str =
  "ALTER TABLE crash_reports ADD COLUMN lookup_attempts INTEGER NOT NULL DEFAULT 0";

/// Create the schema or bring an older one up to [`SCHEMA_VERSION`].
pub fn migrate(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.execute_batch(SCHEMA)?;

  let version: i64 = conn.pragma_query_value(None, "user_version", |r| r.get(0))?;
  if version >= SCHEMA_VERSION {
    return Ok(());
  }

  let has_attempts = conn
    .prepare(
      "SELECT 1 FROM pragma_table_info('crash_reports') WHERE name = 'lookup_attempts'",
    )?
    .exists([])?;
  if !has_attempts {
    info!("adding lookup_attempts column to crash_reports");
    conn.execute_batch(ADD_LOOKUP_ATTEMPTS)?;
  }

  conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
  Ok(())
}
