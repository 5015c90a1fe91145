//! Accept-path hook and the peer address it records.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Invoked by the RPC server for every accepted transport, before any
/// request on it is dispatched.
///
/// Runs on the accept path: implementations must return quickly and must
/// not panic.
pub trait ConnectionHook: Send + Sync {
    fn on_connection_accepted(&self, peer: SocketAddr);
}

/// Address of the most recently accepted RPC peer.
///
/// Cloning shares the slot. Last write wins; no history is kept.
#[derive(Clone)]
pub struct PeerAddress {
    slot: Arc<ArcSwapOption<SocketAddr>>,
}

impl PeerAddress {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(ArcSwapOption::empty()),
        }
    }

    pub fn record(&self, peer: SocketAddr) {
        self.slot.store(Some(Arc::new(peer)));
    }

    pub fn get(&self) -> Option<SocketAddr> {
        self.slot.load_full().map(|peer| *peer)
    }
}

impl Default for PeerAddress {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PeerAddress").field(&self.get()).finish()
    }
}

/// Hook that records each accepted peer into a [`PeerAddress`].
#[derive(Debug, Clone)]
pub struct PeerRecorder {
    peer: PeerAddress,
}

impl PeerRecorder {
    pub fn new(peer: PeerAddress) -> Self {
        Self { peer }
    }
}

impl ConnectionHook for PeerRecorder {
    fn on_connection_accepted(&self, peer: SocketAddr) {
        tracing::debug!(peer_addr = %peer, "Recording scheduler address");
        self.peer.record(peer);
    }
}
