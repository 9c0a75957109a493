//! The `RemoteLookup` trait and its outcome types.
//!
//! Implemented by `crashsync-remote` over HTTPS. The engine only sees this
//! abstraction, which keeps it testable with scripted responses.

use std::future::Future;

use thiserror::Error;

use crate::{batch::CandidateMatch, error::BoxError};

/// Why a lookup produced nothing to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatchReason {
  /// HTTP 200 with an empty `crash_reports` array.
  EmptyResult,
  /// Any status other than 200.
  Status(u16),
}

/// Result of a single lookup that reached the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
  Matches(Vec<CandidateMatch>),
  NoMatch(NoMatchReason),
}

/// The remote service could not be asked, or its answer could not be read.
///
/// Distinct from [`LookupOutcome::NoMatch`]: the record stays unresolved and
/// its attempt counter is left alone.
#[derive(Debug, Error)]
pub enum LookupError {
  #[error("transport error: {0}")]
  Transport(#[source] BoxError),

  #[error("undecodable response: {0}")]
  Decode(#[source] BoxError),
}

/// Authenticated search against the remote crash-report service.
pub trait RemoteLookup: Send + Sync {
  /// Search for crash reports whose uuid matches `name`.
  fn lookup<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<LookupOutcome, LookupError>> + Send + 'a;
}
