//! OS signal handling.
//!
//! # Responsibilities
//! - Listen for SIGINT (and SIGTERM on Unix)
//! - Translate them into a stop request
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Signals only raise the stop flag; teardown still goes through the
//!   lifecycle controller, and the control socket works without them

use crate::lifecycle::shutdown::StopHandle;

/// Raise `stop` on the first termination signal.
pub async fn forward_signals(stop: StopHandle) {
    let signal = wait_for_signal().await;
    match signal {
        Ok(name) => {
            tracing::info!(signal = name, "Termination signal received");
            stop.request();
        }
        Err(e) => tracing::warn!(error = %e, "Signal handlers unavailable"),
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|_| "SIGINT"),
        _ = term.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "CTRL_C")
}
