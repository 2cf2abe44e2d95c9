//! Termination request plumbing
//!
//! The hosting server reacts to a single external termination path:
//! SIGTERM or SIGINT on Unix, ctrl-c elsewhere. Everything beyond
//! translating the signal into "stop serving now" lives in the server
//! lifecycle code.

use tracing::info;

/// Wait until the host environment requests termination.
///
/// Returns the name of the signal that was received.
///
/// # Panics
/// Panics if signal handlers cannot be registered (OS resource
/// exhaustion).
#[cfg(unix)]
pub async fn wait_for_termination() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("cannot register SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("cannot register SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
            "SIGTERM"
        }
        _ = sigint.recv() => {
            info!("Received SIGINT");
            "SIGINT"
        }
    }
}

/// Wait until ctrl-c is received (non-Unix hosts).
///
/// # Panics
/// Panics if the ctrl-c handler cannot be registered.
#[cfg(not(unix))]
pub async fn wait_for_termination() -> &'static str {
    tokio::signal::ctrl_c()
        .await
        .expect("cannot wait for ctrl-c");
    info!("Received ctrl-c");
    "CTRL_C"
}
