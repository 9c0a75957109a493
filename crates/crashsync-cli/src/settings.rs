//! Runtime configuration, read from a TOML file and `CRASHSYNC_*` environment
//! variables.
//!
//! ```toml
//! [store]
//! path = "crash_reports.db"
//!
//! [remote]
//! username = "reporter"
//! password = "..."
//!
//! [reconcile]
//! batch_size = 1
//! ```
//!
//! Nested keys map to environment variables with a double underscore, e.g.
//! `CRASHSYNC_REMOTE__PASSWORD`.

use std::{path::PathBuf, time::Duration};

use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;
use thiserror::Error;

use crashsync_core::reconcile::ReconcileConfig;
use crashsync_remote::{ClientConfig, DEFAULT_BASE_URL};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to load configuration: {0}")]
  Load(#[from] config::ConfigError),

  #[error("missing required setting `{0}`")]
  Missing(&'static str),

  #[error("invalid setting `{key}`: {reason}")]
  Invalid { key: &'static str, reason: String },

  #[error("invalid reconcile settings: {0}")]
  Reconcile(#[from] crashsync_core::Error),
}

// ─── Settings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  pub store:     StoreSettings,
  pub remote:    RemoteSettings,
  #[serde(default)]
  pub reconcile: ReconcileSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
  /// SQLite database file holding the `crash_reports` table.
  pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSettings {
  #[serde(default = "default_base_url")]
  pub base_url:             String,
  pub username:             String,
  pub password:             String,
  #[serde(default)]
  pub accept_invalid_certs: bool,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:         u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
  pub batch_size:   usize,
  pub delay_ms:     u64,
  pub max_attempts: u32,
}

impl Default for ReconcileSettings {
  fn default() -> Self {
    let defaults = ReconcileConfig::default();
    Self {
      batch_size:   defaults.batch_size,
      delay_ms:     defaults.delay.as_millis() as u64,
      max_attempts: defaults.max_attempts,
    }
  }
}

/// `CRASHSYNC_<SECTION>__<KEY>` variables.
pub fn environment() -> Environment {
  Environment::with_prefix("CRASHSYNC")
    .prefix_separator("_")
    .separator("__")
}

fn default_base_url() -> String { DEFAULT_BASE_URL.to_string() }

fn default_timeout_secs() -> u64 { 30 }

/// Command-line values that take precedence over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub batch_size:   Option<usize>,
  pub delay_ms:     Option<u64>,
  pub max_attempts: Option<u32>,
}

impl Settings {
  /// Read `path` (if it exists) and then the process environment.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
    Self::load_with_env(path, environment())
  }

  /// Read `path` (if it exists), then `env` on top of it.
  pub fn load_with_env(
    path: impl Into<PathBuf>,
    env: Environment,
  ) -> Result<Self, ConfigError> {
    let builder = Config::builder()
      .add_source(File::from(path.into()).required(false))
      .add_source(env);
    Self::build(builder)
  }

  /// Parse settings from a TOML string, ignoring the environment.
  pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
    let builder =
      Config::builder().add_source(File::from_str(toml, config::FileFormat::Toml));
    Self::build(builder)
  }

  fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
    Ok(builder.build()?.try_deserialize()?)
  }

  pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
    if let Some(batch_size) = overrides.batch_size {
      self.reconcile.batch_size = batch_size;
    }
    if let Some(delay_ms) = overrides.delay_ms {
      self.reconcile.delay_ms = delay_ms;
    }
    if let Some(max_attempts) = overrides.max_attempts {
      self.reconcile.max_attempts = max_attempts;
    }
    self
  }

  /// Check required values before any work starts.
  pub fn validate(self) -> Result<Self, ConfigError> {
    if self.store.path.as_os_str().is_empty() {
      return Err(ConfigError::Missing("store.path"));
    }
    if self.remote.base_url.trim().is_empty() {
      return Err(ConfigError::Missing("remote.base_url"));
    }
    if self.remote.username.is_empty() {
      return Err(ConfigError::Missing("remote.username"));
    }
    if self.remote.password.is_empty() {
      return Err(ConfigError::Missing("remote.password"));
    }
    if self.remote.timeout_secs == 0 {
      return Err(ConfigError::Invalid {
        key:    "remote.timeout_secs",
        reason: "must be at least 1".to_string(),
      });
    }
    self.reconcile_config()?;
    Ok(self)
  }

  pub fn reconcile_config(&self) -> Result<ReconcileConfig, ConfigError> {
    let config = ReconcileConfig {
      batch_size: self.reconcile.batch_size,
      delay: Duration::from_millis(self.reconcile.delay_ms),
      max_attempts: self.reconcile.max_attempts,
      ..ReconcileConfig::default()
    };
    Ok(config.validate()?)
  }

  pub fn client_config(&self) -> ClientConfig {
    ClientConfig {
      base_url:             self.remote.base_url.clone(),
      username:             self.remote.username.clone(),
      password:             self.remote.password.clone(),
      accept_invalid_certs: self.remote.accept_invalid_certs,
      timeout:              Duration::from_secs(self.remote.timeout_secs),
    }
  }
}
