//! Crash report records and the remote identifier assigned to them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The remote service's identifier for an uploaded crash artifact.
///
/// Real ids are strictly positive. [`UploadId::SKIPPED`] (`0`) is reserved
/// for records the remote service could not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(i64);

impl UploadId {
  /// Sentinel written for records that must not be looked up again.
  pub const SKIPPED: UploadId = UploadId(0);

  /// Wrap an id received from the remote service. Rejects the sentinel and
  /// negative values.
  pub fn new(raw: i64) -> Result<Self> {
    if raw > 0 { Ok(Self(raw)) } else { Err(Error::InvalidUploadId(raw)) }
  }

  /// Wrap a value read back from the store, where the sentinel is legal.
  pub fn from_stored(raw: i64) -> Result<Self> {
    if raw >= 0 { Ok(Self(raw)) } else { Err(Error::InvalidUploadId(raw)) }
  }

  pub fn get(self) -> i64 { self.0 }

  pub fn is_skipped(self) -> bool { self == Self::SKIPPED }
}

impl fmt::Display for UploadId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// A stored crash report row.
///
/// `name` is the business key (usually the dump's file name). It is expected
/// to be unique but the store does not enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashReport {
  pub name:            String,
  /// `None` until resolved; [`UploadId::SKIPPED`] once given up on.
  pub upload_id:       Option<UploadId>,
  /// Lookups that came back without a match.
  pub lookup_attempts: u32,
}

impl CrashReport {
  pub fn is_unresolved(&self) -> bool { self.upload_id.is_none() }
}
