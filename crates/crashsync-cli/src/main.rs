//! `crashsync` — resolve missing upload ids for stored crash reports.
//!
//! # Usage
//!
//! ```
//! crashsync --config /etc/crashsync.toml
//! crashsync --batch-size 50 --max-runtime 600 --dry-run
//! ```
//!
//! Exit status: 0 on completion, 2 for configuration errors, 3 when the store
//! cannot be opened or read, 4 when a write fails, 130 when interrupted.

use std::process::ExitCode;

use clap::Parser;
use crashsync_cli::{Cli, summary_exit_code};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
  // Logs go to stderr; stdout carries the summary.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let cancel = CancellationToken::new();
  tokio::spawn(shutdown_signal(cancel.clone()));

  let summary = match crashsync_cli::run(&cli, cancel).await {
    Ok(summary) => summary,
    Err(err) => {
      error!(error = %err, "reconciliation aborted");
      return ExitCode::from(err.exit_code());
    }
  };

  if cli.json {
    match serde_json::to_string(&summary) {
      Ok(line) => println!("{line}"),
      Err(err) => error!(error = %err, "failed to serialise summary"),
    }
  } else {
    println!("{summary}");
  }

  ExitCode::from(summary_exit_code(&summary))
}

/// Cancel `token` on Ctrl+C or SIGTERM. The engine finishes the record in
/// hand, commits it, and stops.
async fn shutdown_signal(token: CancellationToken) {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      error!("failed to install Ctrl+C handler: {e}");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        error!("failed to install SIGTERM handler: {e}");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => info!("received Ctrl+C, finishing current record"),
    _ = terminate => info!("received SIGTERM, finishing current record"),
  }

  token.cancel();
}
