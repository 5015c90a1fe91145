//! Bounded RPC listener.
//!
//! Accepting is gated on a worker slot: the slot is taken before `accept`,
//! so once every worker is busy further schedulers queue in the kernel
//! backlog instead of being accepted and left idle.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug)]
pub enum ListenerError {
    /// The RPC address did not parse or could not be bound.
    Bind(String, std::io::Error),
    Accept(std::io::Error),
    /// The worker pool was shut down.
    Closed,
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(addr, e) => write!(f, "cannot listen on {}: {}", addr, e),
            ListenerError::Accept(e) => write!(f, "accept failed: {}", e),
            ListenerError::Closed => write!(f, "worker pool closed"),
        }
    }
}

impl std::error::Error for ListenerError {}

/// One accepted scheduler transport and the worker slot it occupies.
///
/// The slot returns to the pool when `slot` is dropped, including when the
/// worker task panics.
#[derive(Debug)]
pub struct Accepted {
    pub stream: TcpStream,
    pub peer: SocketAddr,
    pub slot: OwnedSemaphorePermit,
}

/// RPC listener with at most `max_workers` transports in flight.
pub struct Listener {
    socket: TcpListener,
    workers: Arc<Semaphore>,
}

impl Listener {
    pub async fn bind(bind_address: &str, max_workers: usize) -> Result<Self, ListenerError> {
        let bind_err = |e| ListenerError::Bind(bind_address.to_string(), e);

        let addr: SocketAddr = bind_address
            .parse()
            .map_err(|e| bind_err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
        let socket = TcpListener::bind(addr).await.map_err(bind_err)?;

        tracing::info!(
            address = ?socket.local_addr().ok(),
            max_workers,
            "RPC listener bound"
        );

        Ok(Self {
            socket,
            workers: Arc::new(Semaphore::new(max_workers)),
        })
    }

    /// Wait for a free worker slot, then for the next scheduler connection.
    pub async fn accept(&self) -> Result<Accepted, ListenerError> {
        let slot = Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;
        let (stream, peer) = self.socket.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %peer,
            free_workers = self.workers.available_permits(),
            "RPC transport accepted"
        );
        Ok(Accepted { stream, peer, slot })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}
