//! Shutdown control socket.
//!
//! # Protocol
//! ```text
//! LISTENING → AWAITING_CONNECTION → READING_COMMAND → MATCH    → TERMINATED
//!                    ↑                             ↘ MISMATCH ─┐
//!                    └─────────────────────────────────────────┘
//! ```
//! A client connects, writes the token, and closes (or sends any byte below
//! 32). Nothing is ever written back. Connections are served one at a time.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tokio::time::Instant;

use crate::control::budget::BudgetRng;
use crate::error::AgentError;
use crate::lifecycle::shutdown::StopHandle;

/// Why the control loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// A client sent the exact shutdown token.
    ShutdownReceived,
    /// The stop flag was raised by someone else.
    StopRequested,
    /// Accepting failed with a non-transient error.
    AcceptFailed,
}

/// Local listener waiting for the shutdown token.
pub struct ControlSocketListener {
    listener: TcpListener,
    token: String,
    read_timeout: Duration,
    rng: BudgetRng,
}

impl ControlSocketListener {
    /// Bind the control socket. Failure is fatal to agent startup.
    pub async fn bind(
        host: &str,
        port: u16,
        token: impl Into<String>,
        read_timeout: Duration,
    ) -> Result<Self, AgentError> {
        let address = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| AgentError::ControlBind {
                address: address.clone(),
                source,
            })?;

        tracing::info!(address = ?listener.local_addr().ok(), "Control socket bound");

        Ok(Self {
            listener,
            token: token.into(),
            read_timeout,
            rng: BudgetRng::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the shutdown token arrives, `stop` is
    /// raised, or accepting fails for good. The socket is closed on return.
    ///
    /// On a token match `stop` is raised before returning.
    pub async fn run(mut self, stop: &StopHandle) -> ControlOutcome {
        let mut stop_rx = stop.subscribe();

        loop {
            if stop.is_requested() {
                return ControlOutcome::StopRequested;
            }

            let accepted = tokio::select! {
                res = self.listener.accept() => res,
                _ = stop_rx.changed() => continue,
            };

            let (mut stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) if is_transient(&e) => {
                    tracing::warn!(error = %e, "Control socket accept failed, continuing");
                    continue;
                }
                Err(e) => {
                    if stop.is_requested() {
                        return ControlOutcome::StopRequested;
                    }
                    tracing::error!(error = %e, "Control socket accept failed");
                    return ControlOutcome::AcceptFailed;
                }
            };

            let budget = self.rng.budget_for(self.token.len());
            let command = read_command(&mut stream, budget, self.read_timeout).await;
            drop(stream);

            if command == self.token.as_bytes() {
                tracing::info!(peer_addr = %peer, "Shutdown command received");
                stop.request();
                return ControlOutcome::ShutdownReceived;
            }

            tracing::warn!(
                peer_addr = %peer,
                command = ?String::from_utf8_lossy(&command),
                "Invalid shutdown command received"
            );
        }
    }
}

/// Read at most `budget` bytes, stopping at the first byte below 32, end of
/// stream, a read error, or once `timeout` has elapsed since the call began.
///
/// The terminating byte is not included.
pub async fn read_command<R>(reader: &mut R, budget: usize, timeout: Duration) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let deadline = Instant::now() + timeout;
    let mut command = Vec::new();

    while command.len() < budget {
        match tokio::time::timeout_at(deadline, reader.read_u8()).await {
            Ok(Ok(byte)) if byte >= 32 => command.push(byte),
            Ok(Ok(_)) => break,
            Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Control socket read failed");
                break;
            }
            Err(_) => {
                tracing::warn!(timeout = ?timeout, "Control socket read timed out");
                break;
            }
        }
    }

    command
}

/// Accept errors the loop survives.
fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
            | io::ErrorKind::PermissionDenied
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}
