//! Stop flag shared by the lifecycle, the control loop and signal handling.

use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative "stop requested" flag.
///
/// Cloning shares the flag. Once raised it stays raised.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the flag and wake every waiter.
    pub fn request(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribe to flag changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Resolve once the flag is raised.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this only returns once raised.
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}
