//! Async HTTP client for the crash-report search endpoint.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use reqwest::{
  Client, StatusCode,
  header::{AUTHORIZATION, HeaderValue},
};
use tracing::{debug, warn};

use crashsync_core::lookup::{LookupError, LookupOutcome, NoMatchReason, RemoteLookup};

use crate::{error::Error, response::SearchResponse};

pub const DEFAULT_BASE_URL: &str = "https://crashreports.thefoundry.co.uk";

/// Connection settings for the crash-report service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
  pub base_url:             String,
  pub username:             String,
  pub password:             String,
  /// Skip TLS certificate verification. Only for services with broken
  /// certificates; logged loudly when set.
  pub accept_invalid_certs: bool,
  pub timeout:              Duration,
}

/// HTTP client for `GET /search.json`.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct CrashReportsClient {
  client:        Client,
  search_url:    String,
  authorization: HeaderValue,
}

impl CrashReportsClient {
  pub fn new(config: ClientConfig) -> Result<Self, Error> {
    let mut builder = Client::builder().timeout(config.timeout);
    if config.accept_invalid_certs {
      warn!(
        base_url = %config.base_url,
        "TLS certificate verification is disabled for the crash-report service"
      );
      builder = builder.danger_accept_invalid_certs(true);
    }
    let client = builder.build()?;

    let mut authorization =
      HeaderValue::from_str(&basic_auth_value(&config.username, &config.password))
        .map_err(|_| Error::InvalidCredentials)?;
    authorization.set_sensitive(true);

    Ok(Self {
      client,
      search_url: format!("{}/search.json", config.base_url.trim_end_matches('/')),
      authorization,
    })
  }
}

/// `Basic <base64(username:password)>`
pub fn basic_auth_value(username: &str, password: &str) -> String {
  format!("Basic {}", B64.encode(format!("{username}:{password}")))
}

impl RemoteLookup for CrashReportsClient {
  /// `GET /search.json?query=<name>&type=uuids`
  async fn lookup(&self, name: &str) -> Result<LookupOutcome, LookupError> {
    let resp = self
      .client
      .get(&self.search_url)
      .header(AUTHORIZATION, self.authorization.clone())
      .query(&[("query", name), ("type", "uuids")])
      .send()
      .await
      .map_err(|e| LookupError::Transport(Box::new(e)))?;

    let status = resp.status();
    if status != StatusCode::OK {
      debug!(name, %status, "search returned non-success status");
      return Ok(LookupOutcome::NoMatch(NoMatchReason::Status(status.as_u16())));
    }

    let body: SearchResponse = resp.json().await.map_err(|e| {
      if e.is_decode() {
        LookupError::Decode(Box::new(e))
      } else {
        LookupError::Transport(Box::new(e))
      }
    })?;

    if body.is_empty() {
      return Ok(LookupOutcome::NoMatch(NoMatchReason::EmptyResult));
    }
    Ok(LookupOutcome::Matches(body.into_candidates()))
  }
}
