//! Candidate matches and the per-lookup resolution batch.

use serde::{Deserialize, Serialize};

use crate::report::UploadId;

/// One entry of a remote lookup response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMatch {
  pub upload_id: UploadId,
  /// Correlates back to [`CrashReport::name`](crate::report::CrashReport::name).
  pub file_name: String,
}

/// `(upload id, file name)` pairs extracted from a single lookup response.
///
/// A batch is built fresh for every lookup and handed to the writer straight
/// away. Pairs are unique by upload id and by file name: inserting a pair that
/// collides on either replaces the earlier pair, so the last entry in
/// response order wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionBatch {
  entries: Vec<CandidateMatch>,
}

impl ResolutionBatch {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, candidate: CandidateMatch) {
    self.entries.retain(|e| {
      e.upload_id != candidate.upload_id && e.file_name != candidate.file_name
    });
    self.entries.push(candidate);
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &CandidateMatch> { self.entries.iter() }

  /// Upload id this batch assigns to `file_name`, if any.
  pub fn upload_id_for(&self, file_name: &str) -> Option<UploadId> {
    self
      .entries
      .iter()
      .find(|e| e.file_name == file_name)
      .map(|e| e.upload_id)
  }
}

impl FromIterator<CandidateMatch> for ResolutionBatch {
  fn from_iter<I: IntoIterator<Item = CandidateMatch>>(iter: I) -> Self {
    let mut batch = Self::new();
    for candidate in iter {
      batch.insert(candidate);
    }
    batch
  }
}

impl<'a> IntoIterator for &'a ResolutionBatch {
  type Item = &'a CandidateMatch;
  type IntoIter = std::slice::Iter<'a, CandidateMatch>;

  fn into_iter(self) -> Self::IntoIter { self.entries.iter() }
}
