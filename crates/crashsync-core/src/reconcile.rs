//! The reconciliation engine.
//!
//! One pass selects a bounded number of unresolved records, looks each one up
//! on the remote service in turn, and writes whatever was found back to the
//! store before moving to the next record. Lookups are never concurrent and
//! each is followed by a fixed pacing delay.

use std::{collections::HashSet, fmt, time::Duration};

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  batch::ResolutionBatch,
  error::ReconcileError,
  lookup::{LookupOutcome, NoMatchReason, RemoteLookup},
  store::{MissDisposition, ReportStore},
};

/// Lower bound on the wait after each remote call.
pub const MIN_PACING_DELAY: Duration = Duration::from_millis(100);

// ─── Configuration ───────────────────────────────────────────────────────────

/// Tuning for a single reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
  /// Maximum number of records selected per run.
  pub batch_size:   usize,
  /// Wait after every remote call. Raised to [`MIN_PACING_DELAY`].
  pub delay:        Duration,
  /// Misses after which a record is marked as skipped.
  pub max_attempts: u32,
  /// Look records up but write nothing.
  pub dry_run:      bool,
  /// No new lookup is started once this instant has passed.
  pub deadline:     Option<Instant>,
}

impl Default for ReconcileConfig {
  fn default() -> Self {
    Self {
      batch_size:   1,
      delay:        MIN_PACING_DELAY,
      max_attempts: 3,
      dry_run:      false,
      deadline:     None,
    }
  }
}

impl ReconcileConfig {
  /// Reject unusable settings and clamp the pacing delay.
  pub fn validate(mut self) -> Result<Self> {
    if self.batch_size == 0 {
      return Err(Error::ZeroBatchSize);
    }
    if self.max_attempts == 0 {
      return Err(Error::ZeroMaxAttempts);
    }
    if self.delay < MIN_PACING_DELAY {
      warn!(
        requested_ms = self.delay.as_millis() as u64,
        minimum_ms = MIN_PACING_DELAY.as_millis() as u64,
        "pacing delay below minimum; using minimum"
      );
      self.delay = MIN_PACING_DELAY;
    }
    Ok(self)
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// What happened to a single record during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  /// The remote service returned matches and they were handed to the store.
  Resolved {
    batch:        ResolutionBatch,
    rows_updated: usize,
  },
  /// No match this time; the record will be selected again.
  RetryLater,
  /// No match and attempts are exhausted; the sentinel was written.
  PermanentlySkipped,
  /// No match, but the record had been resolved by the time the miss was
  /// recorded.
  AlreadyResolved,
  /// The remote service could not be reached or understood.
  LookupFailed,
}

/// Why a run ended before working through every selected record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
  Cancelled,
  DeadlineReached,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
  pub selected:      usize,
  pub attempted:     usize,
  pub resolved:      usize,
  pub rows_updated:  usize,
  pub retry_later:   usize,
  pub skipped:       usize,
  pub lookup_errors: usize,
  pub dry_run:       bool,
  pub stopped:       Option<StopReason>,
}

impl RunSummary {
  fn record(&mut self, resolution: &Resolution) {
    self.attempted += 1;
    match resolution {
      Resolution::Resolved { rows_updated, .. } => {
        self.resolved += 1;
        self.rows_updated += rows_updated;
      }
      Resolution::RetryLater => self.retry_later += 1,
      Resolution::PermanentlySkipped => self.skipped += 1,
      Resolution::AlreadyResolved => {}
      Resolution::LookupFailed => self.lookup_errors += 1,
    }
  }
}

impl fmt::Display for RunSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "selected {}, attempted {}, resolved {} ({} rows), retry later {}, skipped {}, lookup errors {}",
      self.selected,
      self.attempted,
      self.resolved,
      self.rows_updated,
      self.retry_later,
      self.skipped,
      self.lookup_errors,
    )?;
    if self.dry_run {
      f.write_str(" [dry run]")?;
    }
    match self.stopped {
      Some(StopReason::Cancelled) => f.write_str(" [cancelled]"),
      Some(StopReason::DeadlineReached) => f.write_str(" [deadline reached]"),
      None => Ok(()),
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Drives one reconciliation pass over a [`ReportStore`] and a
/// [`RemoteLookup`].
pub struct Reconciler<S, L> {
  store:  S,
  lookup: L,
  config: ReconcileConfig,
}

impl<S, L> Reconciler<S, L>
where
  S: ReportStore,
  L: RemoteLookup,
{
  pub fn new(store: S, lookup: L, config: ReconcileConfig) -> Self {
    Self { store, lookup, config }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn into_store(self) -> S { self.store }

  /// Run a single pass.
  ///
  /// `cancel` is checked between records. A record whose lookup has already
  /// been issued is always persisted before the run stops. Names settled
  /// earlier in the same run, by their own lookup or by another record's
  /// response, are not looked up again.
  pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary, ReconcileError> {
    let names = self
      .store
      .missing_records(self.config.batch_size)
      .await
      .map_err(|e| ReconcileError::Select(Box::new(e)))?;

    info!(count = names.len(), "selected unresolved crash reports");

    let mut summary = RunSummary {
      selected: names.len(),
      dry_run: self.config.dry_run,
      ..RunSummary::default()
    };

    let mut settled: HashSet<String> = HashSet::new();
    for (index, name) in names.iter().enumerate() {
      if settled.contains(name) {
        debug!(name, "already settled in this run");
        continue;
      }
      if let Some(reason) = self.stop_reason(cancel) {
        info!(?reason, remaining = names.len() - index, "stopping before remaining records");
        summary.stopped = Some(reason);
        break;
      }
      let resolution = self.resolve_one(name, cancel).await?;
      summary.record(&resolution);

      if let Resolution::Resolved { batch, .. } = &resolution {
        settled.extend(batch.iter().map(|c| c.file_name.clone()));
      }
      settled.insert(name.clone());
    }

    // A signal that lands during the last pacing wait still counts.
    if summary.stopped.is_none() && cancel.is_cancelled() {
      summary.stopped = Some(StopReason::Cancelled);
    }

    info!(%summary, "reconciliation finished");
    Ok(summary)
  }

  /// Look up one record, pace, and persist the outcome.
  pub async fn resolve_one(
    &self,
    name: &str,
    cancel: &CancellationToken,
  ) -> Result<Resolution, ReconcileError> {
    info!(name, "looking up crash report");
    let result = self.lookup.lookup(name).await;
    self.pace(cancel).await;

    let outcome = match result {
      Ok(outcome) => outcome,
      Err(error) => {
        warn!(name, %error, "lookup failed; will retry on next run");
        return Ok(Resolution::LookupFailed);
      }
    };

    let candidates = match outcome {
      LookupOutcome::Matches(candidates) => candidates,
      LookupOutcome::NoMatch(reason) => return self.handle_miss(name, reason).await,
    };

    let batch: ResolutionBatch = candidates.into_iter().collect();
    if batch.is_empty() {
      // The service found something, just nothing with a usable id.
      warn!(name, "remote matches carried no usable upload id; will retry on next run");
      return Ok(Resolution::LookupFailed);
    }
    for candidate in &batch {
      debug!(
        file_name = %candidate.file_name,
        upload_id = %candidate.upload_id,
        "parsed crash report candidate"
      );
    }

    let rows_updated = if self.config.dry_run {
      info!(name, candidates = batch.len(), "dry run: not applying resolution");
      0
    } else {
      self
        .store
        .apply_batch(&batch)
        .await
        .map_err(|e| persist_error(name, e))?
    };

    info!(name, candidates = batch.len(), rows_updated, "resolved crash report");
    Ok(Resolution::Resolved { batch, rows_updated })
  }

  async fn handle_miss(
    &self,
    name: &str,
    reason: NoMatchReason,
  ) -> Result<Resolution, ReconcileError> {
    if self.config.dry_run {
      info!(name, ?reason, "dry run: no match, nothing recorded");
      return Ok(Resolution::RetryLater);
    }

    let disposition = self
      .store
      .record_miss(name, self.config.max_attempts)
      .await
      .map_err(|e| persist_error(name, e))?;

    match disposition {
      MissDisposition::RetryLater { attempts } => {
        debug!(
          name,
          ?reason,
          attempts,
          max_attempts = self.config.max_attempts,
          "no match; will retry on next run"
        );
        Ok(Resolution::RetryLater)
      }
      MissDisposition::Skipped => {
        info!(name, ?reason, "no match and attempts exhausted; marked as skipped");
        Ok(Resolution::PermanentlySkipped)
      }
      MissDisposition::AlreadyResolved => {
        info!(name, ?reason, "no match, but record is already resolved");
        Ok(Resolution::AlreadyResolved)
      }
    }
  }

  /// Hard wait after a remote call. Cancellation cuts it short; no further
  /// lookup follows in that case.
  async fn pace(&self, cancel: &CancellationToken) {
    tokio::select! {
      _ = tokio::time::sleep(self.config.delay) => {}
      _ = cancel.cancelled() => debug!("pacing wait interrupted"),
    }
  }

  fn stop_reason(&self, cancel: &CancellationToken) -> Option<StopReason> {
    if cancel.is_cancelled() {
      return Some(StopReason::Cancelled);
    }
    match self.config.deadline {
      Some(deadline) if Instant::now() >= deadline => Some(StopReason::DeadlineReached),
      _ => None,
    }
  }
}

fn persist_error<E>(name: &str, source: E) -> ReconcileError
where
  E: std::error::Error + Send + Sync + 'static,
{
  ReconcileError::Persist { name: name.to_owned(), source: Box::new(source) }
}
