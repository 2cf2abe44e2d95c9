//! Tracing initialization for host binaries
//!
//! The library itself only emits `tracing` events; installing a
//! subscriber is the hosting binary's decision.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Reads the filter from `RUST_LOG`, defaulting to `info`.
///
/// # Panics
/// Panics if a global subscriber is already installed.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
