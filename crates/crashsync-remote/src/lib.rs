//! HTTPS client for the remote crash-report service.
//!
//! Implements [`RemoteLookup`](crashsync_core::lookup::RemoteLookup) over the
//! service's `search.json` endpoint using HTTP Basic authentication.

pub mod client;
pub mod error;
pub mod response;

pub use client::{ClientConfig, CrashReportsClient, DEFAULT_BASE_URL};
pub use error::Error;
