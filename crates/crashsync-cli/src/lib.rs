//! Wiring for the `crashsync` binary: settings, store, remote client and the
//! reconciliation engine, plus the mapping from failures to exit codes.

pub mod settings;

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crashsync_core::{
  ReconcileError,
  reconcile::{Reconciler, RunSummary, StopReason},
};
use crashsync_remote::CrashReportsClient;
use crashsync_store_sqlite::SqliteStore;

use settings::{ConfigError, Overrides, Settings};

/// Exit status when a signal stopped the run.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Exit status for a run that returned a summary. A deadline stop is a
/// normal completion.
pub fn summary_exit_code(summary: &RunSummary) -> u8 {
  match summary.stopped {
    Some(StopReason::Cancelled) => EXIT_INTERRUPTED,
    Some(StopReason::DeadlineReached) | None => 0,
  }
}

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
  name = "crashsync",
  version,
  about = "Fill in missing upload ids for stored crash reports"
)]
pub struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "crashsync.toml")]
  pub config: PathBuf,

  /// Maximum number of unresolved records to process in this run.
  #[arg(long)]
  pub batch_size: Option<usize>,

  /// Wait after each remote lookup, in milliseconds (minimum 100).
  #[arg(long)]
  pub delay_ms: Option<u64>,

  /// Misses before a record is marked as unresolvable.
  #[arg(long)]
  pub max_attempts: Option<u32>,

  /// Stop starting new lookups after this many seconds.
  #[arg(long, value_name = "SECS")]
  pub max_runtime: Option<u64>,

  /// Look records up but do not write anything.
  #[arg(long)]
  pub dry_run: bool,

  /// Print the final summary as JSON.
  #[arg(long)]
  pub json: bool,
}

impl Cli {
  pub fn overrides(&self) -> Overrides {
    Overrides {
      batch_size:   self.batch_size,
      delay_ms:     self.delay_ms,
      max_attempts: self.max_attempts,
    }
  }

  pub fn run_options(&self) -> RunOptions {
    RunOptions {
      dry_run:     self.dry_run,
      max_runtime: self.max_runtime.map(Duration::from_secs),
    }
  }
}

/// Per-invocation switches that are not part of the stored configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
  pub dry_run:     bool,
  pub max_runtime: Option<Duration>,
}

// ─── Errors ───────────────────────────────────────────────────────────────────

/// A failure that ends the process with a non-zero status.
#[derive(Debug, Error)]
pub enum Fatal {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("failed to set up crash-report client: {0}")]
  Client(#[from] crashsync_remote::Error),

  #[error("failed to open store at {path:?}: {source}")]
  OpenStore {
    path:   PathBuf,
    #[source]
    source: crashsync_store_sqlite::Error,
  },

  #[error("failed to close store: {0}")]
  CloseStore(#[source] crashsync_store_sqlite::Error),

  #[error(transparent)]
  Reconcile(#[from] ReconcileError),
}

impl Fatal {
  pub fn exit_code(&self) -> u8 {
    match self {
      Fatal::Config(_) | Fatal::Client(_) => 2,
      Fatal::OpenStore { .. } | Fatal::Reconcile(ReconcileError::Select(_)) => 3,
      Fatal::CloseStore(_) | Fatal::Reconcile(ReconcileError::Persist { .. }) => 4,
    }
  }
}

// ─── Entry points ─────────────────────────────────────────────────────────────

/// Load settings named by `cli` and run one reconciliation pass.
pub async fn run(cli: &Cli, cancel: CancellationToken) -> Result<RunSummary, Fatal> {
  let settings = Settings::load(&cli.config)?
    .with_overrides(&cli.overrides())
    .validate()?;
  reconcile(&settings, cli.run_options(), cancel).await
}

/// Run one reconciliation pass with already-validated settings.
///
/// The store is closed before returning, on success and on failure.
pub async fn reconcile(
  settings: &Settings,
  options: RunOptions,
  cancel: CancellationToken,
) -> Result<RunSummary, Fatal> {
  let mut config = settings.reconcile_config()?;
  config.dry_run = options.dry_run;
  config.deadline = options.max_runtime.map(|limit| Instant::now() + limit);

  let client = CrashReportsClient::new(settings.client_config())?;

  let path = &settings.store.path;
  let store = SqliteStore::open(path)
    .await
    .map_err(|source| Fatal::OpenStore { path: path.clone(), source })?;
  info!(path = %path.display(), "opened crash report store");

  let engine = Reconciler::new(store, client, config);
  let summary = engine.run(&cancel).await;
  let closed = engine.into_store().close().await;

  let summary = summary?;
  closed.map_err(Fatal::CloseStore)?;
  Ok(summary)
}
