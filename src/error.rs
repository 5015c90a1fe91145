//! Crate-level error type.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::lifecycle::state::LifecycleState;
use crate::net::listener::ListenerError;

/// Errors surfaced by the agent lifecycle.
///
/// Everything here except `Registration` is fatal to the command that
/// produced it.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The credential file could not be written or removed.
    #[error("failed to persist credential to {path:?}: {source}")]
    CredentialPersist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An existing credential file could not be read.
    #[error("failed to read credential from {path:?}: {source}")]
    CredentialRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The RPC listener could not be bound.
    #[error("RPC listener error: {0}")]
    RpcBind(#[from] ListenerError),

    /// The control socket could not be bound.
    #[error("failed to bind control socket on {address}: {source}")]
    ControlBind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The stop client could not reach the control socket.
    #[error("failed to send shutdown command to {address}: {source}")]
    ControlConnect {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The configured control port does not accept shutdown commands.
    #[error("control socket is disabled (port {0})")]
    ControlDisabled(i32),

    /// The process marker file could not be written.
    #[error("failed to write process marker {path:?}: {source}")]
    Marker {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A lifecycle operation was invoked out of order.
    #[error("invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    /// Registration with the scheduler failed.
    #[error("registration failed: {0}")]
    Registration(String),
}
