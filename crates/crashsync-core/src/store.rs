//! The `ReportStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `crashsync-store-sqlite`).
//! It covers both ends of a reconciliation pass: selecting unresolved records
//! and writing resolutions back.

use std::future::Future;

use crate::batch::ResolutionBatch;

/// What the store did with a record that the remote service had no match for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissDisposition {
  /// Still unresolved; will be selected again on the next run.
  RetryLater { attempts: u32 },
  /// Attempts exhausted; the sentinel upload id was written.
  Skipped,
  /// No unresolved record carries that name any more.
  AlreadyResolved,
}

/// Abstraction over the crash report store.
///
/// Every write is conditional on `upload_id` still being unset, so a record
/// transitions out of the unresolved state at most once no matter how many
/// runs overlap.
pub trait ReportStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Up to `limit` distinct names whose upload id is unset, oldest first.
  fn missing_records(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Set the upload id of every record named in `batch` whose id is still
  /// unset, and commit. Returns the number of rows changed; zero is not an
  /// error.
  fn apply_batch<'a>(
    &'a self,
    batch: &'a ResolutionBatch,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Count a lookup without a match against the unresolved records named
  /// `name`. Once `max_attempts` is reached they are marked with
  /// [`UploadId::SKIPPED`](crate::report::UploadId::SKIPPED).
  fn record_miss<'a>(
    &'a self,
    name: &'a str,
    max_attempts: u32,
  ) -> impl Future<Output = Result<MissDisposition, Self::Error>> + Send + 'a;
}
