//! SQLite backend for the crashsync report store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Implements both the missing-record
//! selector and the conditional writer of [`ReportStore`](crashsync_core::store::ReportStore).

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
