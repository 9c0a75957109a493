//! Core types, trait definitions and the reconciliation engine for crashsync.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! store and the remote crash-report service are reached only through the
//! [`store::ReportStore`] and [`lookup::RemoteLookup`] traits.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod batch;
pub mod error;
pub mod lookup;
pub mod reconcile;
pub mod report;
pub mod store;

pub use error::{Error, ReconcileError, Result};
