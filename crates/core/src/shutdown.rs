//! Process signal handling for graceful shutdown
//!
//! Binaries await [`wait_for_signal`] alongside their server future; once it
//! resolves they stop the scheduler (letting an in-flight cycle finish), stop
//! the RPC server gracefully and release the downstream connection.

use crate::error::DocwatchError;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Terminate,
    Interrupt,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Terminate => write!(f, "SIGTERM"),
            ShutdownReason::Interrupt => write!(f, "SIGINT"),
        }
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C on non-Unix platforms).
pub async fn wait_for_signal() -> Result<ShutdownReason, DocwatchError> {
    #[cfg(unix)]
    let reason = {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
            DocwatchError::Internal(format!("Failed to register SIGTERM handler: {}", e))
        })?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(|e| {
            DocwatchError::Internal(format!("Failed to register SIGINT handler: {}", e))
        })?;

        tokio::select! {
            _ = sigterm.recv() => ShutdownReason::Terminate,
            _ = sigint.recv() => ShutdownReason::Interrupt,
        }
    };

    #[cfg(not(unix))]
    let reason = {
        tokio::signal::ctrl_c().await.map_err(|e| {
            DocwatchError::Internal(format!("Failed to register Ctrl+C handler: {}", e))
        })?;
        ShutdownReason::Interrupt
    };

    info!(signal = %reason, "Received shutdown signal, initiating graceful shutdown");
    Ok(reason)
}
