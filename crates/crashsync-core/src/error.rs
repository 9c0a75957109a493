//! Error types for `crashsync-core`.

use thiserror::Error;

/// Boxed error from a store backend, erased so the engine stays generic.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("batch size must be at least 1")]
  ZeroBatchSize,

  #[error("max attempts must be at least 1")]
  ZeroMaxAttempts,

  #[error("invalid upload id: {0}")]
  InvalidUploadId(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A failure that aborts a reconciliation run.
///
/// Everything written before the failure has already been committed.
#[derive(Debug, Error)]
pub enum ReconcileError {
  #[error("failed to select unresolved records: {0}")]
  Select(#[source] BoxError),

  #[error("failed to persist result for {name:?}: {source}")]
  Persist {
    name:   String,
    #[source]
    source: BoxError,
  },
}
