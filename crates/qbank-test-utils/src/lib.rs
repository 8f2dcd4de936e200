//! Shared test utilities for the qbank-sync workspace.
//!
//! This crate provides standardised test fixtures for the crate test
//! suites. It is a dev-dependency only and never published.
//!
//! # Modules
//!
//! - [`git`]: git repository fixtures with real history
//! - [`remote`]: [`MockRemote`], an in-memory question bank with scripted failures
//! - [`repo`]: [`TestRepo`] scratch repository with file helpers

pub mod git;
pub mod remote;
pub mod repo;

pub use remote::{MockQuestion, MockRemote};
pub use repo::TestRepo;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a subscriber that routes logs through the test harness.
///
/// Filtered by `RUST_LOG`, defaulting to `warn`. Safe to call from every
/// test; only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer().compact())
        .try_init();
}
