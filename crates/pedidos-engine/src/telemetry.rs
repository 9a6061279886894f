//! # Telemetry
//!
//! Tracing subscriber setup for embedding apps. Filtering follows
//! `RUST_LOG` when set, with a sensible default otherwise.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber.
///
/// Safe to call once per process; later calls are ignored so tests that
/// share a binary do not trip over each other.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
