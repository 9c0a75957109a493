//! Error type for `crashsync-remote`.

use thiserror::Error;

/// The client could not be constructed. Lookup failures are reported as
/// [`LookupError`](crashsync_core::lookup::LookupError) instead.
#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Build(#[from] reqwest::Error),

  #[error("credentials cannot be sent in an HTTP header")]
  InvalidCredentials,
}
