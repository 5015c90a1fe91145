//! RPC server adapter.
//!
//! # Responsibilities
//! - Bind the RPC listener
//! - Run the accept loop on its own task, one worker task per transport
//! - Invoke the connection hook before dispatching
//! - Report serving state and stop on request

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::credential::Credential;
use crate::error::AgentError;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Accepted, Listener, ListenerError};
use crate::rpc::dispatch::Dispatcher;
use crate::rpc::hook::ConnectionHook;

/// Pause after a failed accept so a persistent error (e.g. fd exhaustion)
/// does not spin the loop.
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(100);

/// Owns the RPC listener and its dispatch loop.
pub struct RpcServerAdapter {
    bind_address: String,
    max_workers: usize,
    hook: Arc<dyn ConnectionHook>,
    dispatcher: Arc<dyn Dispatcher>,
    serving: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
    tracker: ConnectionTracker,
    local_addr: Option<SocketAddr>,
    task: Option<JoinHandle<()>>,
}

impl RpcServerAdapter {
    pub fn new(
        bind_address: impl Into<String>,
        max_workers: usize,
        hook: Arc<dyn ConnectionHook>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            bind_address: bind_address.into(),
            max_workers,
            hook,
            dispatcher,
            serving: Arc::new(AtomicBool::new(false)),
            stop_tx,
            tracker: ConnectionTracker::new(),
            local_addr: None,
            task: None,
        }
    }

    /// Bind the listener and launch serving on a separate task.
    ///
    /// Returns as soon as the listener is bound.
    pub async fn start(&mut self, credential: Credential) -> Result<SocketAddr, AgentError> {
        if let Some(addr) = self.local_addr.filter(|_| self.is_serving()) {
            return Ok(addr);
        }

        let listener = Listener::bind(&self.bind_address, self.max_workers).await?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ListenerError::Bind(self.bind_address.clone(), e))?;

        self.serving.store(true, Ordering::SeqCst);
        self.local_addr = Some(local_addr);

        let accept_loop = AcceptLoop {
            listener,
            hook: Arc::clone(&self.hook),
            dispatcher: Arc::clone(&self.dispatcher),
            credential,
            tracker: self.tracker.clone(),
            serving: Arc::clone(&self.serving),
            stop_rx: self.stop_tx.subscribe(),
        };
        self.task = Some(tokio::spawn(accept_loop.run()));

        Ok(local_addr)
    }

    /// True from a successful bind until stop is requested.
    pub fn is_serving(&self) -> bool {
        self.serving.load(Ordering::SeqCst)
    }

    /// Stop accepting. Idempotent; a no-op if serving never started.
    ///
    /// Workers already dispatching keep running until their transport closes.
    pub fn stop(&mut self) {
        let was_serving = self.serving.swap(false, Ordering::SeqCst);
        let _ = self.stop_tx.send(true);
        if self.task.take().is_some() && was_serving {
            tracing::info!(
                address = ?self.local_addr,
                active_workers = self.tracker.active_count(),
                "RPC server stop requested"
            );
        }
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl Drop for RpcServerAdapter {
    fn drop(&mut self) {
        self.stop();
    }
}

struct AcceptLoop {
    listener: Listener,
    hook: Arc<dyn ConnectionHook>,
    dispatcher: Arc<dyn Dispatcher>,
    credential: Credential,
    tracker: ConnectionTracker,
    serving: Arc<AtomicBool>,
    stop_rx: watch::Receiver<bool>,
}

impl AcceptLoop {
    async fn run(mut self) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(Accepted { stream, peer, slot }) => {
                        self.hook.on_connection_accepted(peer);

                        let guard = self.tracker.track();
                        let work = self.dispatcher.dispatch(stream, peer, self.credential.clone());
                        tokio::spawn(async move {
                            let _slot = slot;
                            if let Err(e) = work.await {
                                tracing::debug!(
                                    connection_id = %guard.id(),
                                    peer_addr = %peer,
                                    error = %e,
                                    "RPC transport closed with error"
                                );
                            }
                        });
                    }
                    Err(ListenerError::Closed) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "RPC accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_PAUSE).await;
                    }
                },
                _ = self.stop_rx.changed() => break,
            }
        }

        self.serving.store(false, Ordering::SeqCst);
        tracing::info!("RPC server stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialStore;
    use crate::rpc::dispatch::PingDispatcher;
    use crate::rpc::hook::{PeerAddress, PeerRecorder};
    use tokio::net::TcpStream;

    fn credential() -> Credential {
        let dir = tempfile::tempdir().unwrap();
        CredentialStore::new(dir.path().join(".password"))
            .resolve(None, "default")
            .unwrap()
            .0
    }

    fn adapter(bind: &str, peer: &PeerAddress) -> RpcServerAdapter {
        RpcServerAdapter::new(
            bind,
            4,
            Arc::new(PeerRecorder::new(peer.clone())),
            Arc::new(PingDispatcher),
        )
    }

    #[tokio::test]
    async fn stop_without_start_is_a_noop() {
        let mut server = adapter("127.0.0.1:0", &PeerAddress::new());
        assert!(!server.is_serving());
        server.stop();
        server.stop();
        assert!(!server.is_serving());
        assert_eq!(server.local_addr(), None);
    }

    #[tokio::test]
    async fn records_peer_of_each_connection() {
        let peer = PeerAddress::new();
        let mut server = adapter("127.0.0.1:0", &peer);

        let addr = server.start(credential()).await.unwrap();
        assert!(server.is_serving());

        let client = TcpStream::connect(addr).await.unwrap();
        let client_addr = client.local_addr().unwrap();

        for _ in 0..50 {
            if peer.get().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(peer.get(), Some(client_addr));

        server.stop();
        assert!(!server.is_serving());
        server.stop();
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let mut server = adapter("256.0.0.1:0", &PeerAddress::new());
        let err = server.start(credential()).await.unwrap_err();
        assert!(matches!(err, AgentError::RpcBind(_)));
        assert!(!server.is_serving());
    }
}
