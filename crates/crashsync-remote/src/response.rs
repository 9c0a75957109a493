//! Wire format of the `search.json` response.

use serde::Deserialize;
use tracing::warn;

use crashsync_core::{batch::CandidateMatch, report::UploadId};

/// Body of a successful search.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
  pub crash_reports: Vec<RawCrashReport>,
}

#[derive(Debug, Deserialize)]
pub struct RawCrashReport {
  pub id:   RawId,
  pub file: RawFile,
}

/// The service has sent ids both as numbers and as numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawId {
  Number(i64),
  Text(String),
}

#[derive(Debug, Deserialize)]
pub struct RawFile {
  pub name: String,
}

impl RawId {
  fn to_upload_id(&self) -> Option<UploadId> {
    let raw = match self {
      RawId::Number(n) => *n,
      RawId::Text(s) => s.trim().parse().ok()?,
    };
    UploadId::new(raw).ok()
  }
}

impl SearchResponse {
  pub fn is_empty(&self) -> bool { self.crash_reports.is_empty() }

  /// Convert to candidates in response order, dropping entries whose id is
  /// not a positive integer.
  pub fn into_candidates(self) -> Vec<CandidateMatch> {
    self
      .crash_reports
      .into_iter()
      .filter_map(|report| match report.id.to_upload_id() {
        Some(upload_id) => Some(CandidateMatch { upload_id, file_name: report.file.name }),
        None => {
          warn!(id = ?report.id, file_name = %report.file.name, "ignoring candidate with unusable id");
          None
        }
      })
      .collect()
  }
}
