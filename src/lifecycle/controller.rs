//! Agent lifecycle controller.
//!
//! Ties credential bootstrapping, the RPC server and the control socket
//! together under a start-once, stop-once contract:
//!
//! ```text
//! init()            credentials resolved and persisted
//! start()           RPC serving (own task) → pid marker → control bind → register
//! await_shutdown()  blocks per ShutdownMode
//! stop()            RPC halted → pid marker removed
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AgentConfig, ShutdownMode};
use crate::control::listener::{ControlOutcome, ControlSocketListener};
use crate::credential::{Credential, CredentialStore};
use crate::error::AgentError;
use crate::lifecycle::marker::ProcessMarker;
use crate::lifecycle::shutdown::StopHandle;
use crate::lifecycle::state::LifecycleState;
use crate::registry::{Registrar, Registration};
use crate::rpc::{Dispatcher, PeerAddress, PeerRecorder, RpcServerAdapter};

/// Why `await_shutdown` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitOutcome {
    /// The shutdown token arrived on the control socket.
    ShutdownReceived,
    /// The stop flag was raised (signal or `request_stop`).
    StopRequested,
    /// The control socket failed permanently.
    AcceptFailed,
    /// Embedded mode: nothing to wait for.
    Immediate,
}

impl From<ControlOutcome> for AwaitOutcome {
    fn from(outcome: ControlOutcome) -> Self {
        match outcome {
            ControlOutcome::ShutdownReceived => AwaitOutcome::ShutdownReceived,
            ControlOutcome::StopRequested => AwaitOutcome::StopRequested,
            ControlOutcome::AcceptFailed => AwaitOutcome::AcceptFailed,
        }
    }
}

/// Owns one agent instance's lifecycle and shared state.
pub struct LifecycleController {
    config: AgentConfig,
    state: LifecycleState,
    credential: Option<Credential>,
    rpc: Option<RpcServerAdapter>,
    control: Option<ControlSocketListener>,
    control_addr: Option<SocketAddr>,
    marker: ProcessMarker,
    peer: PeerAddress,
    stop: StopHandle,
    dispatcher: Arc<dyn Dispatcher>,
    registrar: Arc<dyn Registrar>,
}

impl LifecycleController {
    pub fn new(config: AgentConfig, dispatcher: Arc<dyn Dispatcher>, registrar: Arc<dyn Registrar>) -> Self {
        let marker = ProcessMarker::new(config.pid_path());
        Self {
            config,
            state: LifecycleState::New,
            credential: None,
            rpc: None,
            control: None,
            control_addr: None,
            marker,
            peer: PeerAddress::new(),
            stop: StopHandle::new(),
            dispatcher,
            registrar,
        }
    }

    /// Resolve and persist the credential.
    pub fn init(&mut self) -> Result<&Credential, AgentError> {
        let mut next = self.state;
        next.advance(LifecycleState::Initialized)?;

        let store = CredentialStore::new(self.config.credential_path());
        let (credential, source) = store.resolve(
            Some(self.config.credential.password.as_str()),
            &self.config.credential.default_password,
        )?;
        tracing::info!(source = ?source, path = ?store.path(), "Credential ready");

        self.state = next;
        Ok(&*self.credential.insert(credential))
    }

    /// Start serving RPC, write the process marker and bind the control
    /// socket. Registration runs last and never fails startup.
    pub async fn start(&mut self) -> Result<(), AgentError> {
        let mut next = self.state;
        next.advance(LifecycleState::Running)?;
        let credential = self.credential.clone().ok_or(AgentError::InvalidTransition {
            from: self.state,
            to: LifecycleState::Running,
        })?;

        let mut rpc = RpcServerAdapter::new(
            self.config.rpc.bind_address(),
            self.config.rpc.max_workers,
            Arc::new(PeerRecorder::new(self.peer.clone())),
            Arc::clone(&self.dispatcher),
        );
        let rpc_addr = rpc.start(credential).await?;

        let pid = match self.marker.write_current() {
            Ok(pid) => pid,
            Err(e) => {
                rpc.stop();
                return Err(e);
            }
        };

        if let ShutdownMode::Listen(port) = self.config.shutdown_mode() {
            let control = &self.config.control;
            let bound = ControlSocketListener::bind(
                &control.bind_host,
                port,
                control.token.clone(),
                Duration::from_secs(control.read_timeout_secs),
            )
            .await;
            match bound {
                Ok(listener) => {
                    self.control_addr = listener.local_addr().ok();
                    self.control = Some(listener);
                }
                Err(e) => {
                    rpc.stop();
                    self.marker.remove();
                    return Err(e);
                }
            }
        }

        self.rpc = Some(rpc);
        self.state = next;
        tracing::info!(
            rpc_addr = %rpc_addr,
            control_addr = ?self.control_addr,
            pid,
            "Agent started"
        );

        if let Err(e) = self.registrar.register(Registration::new(rpc_addr.port(), pid)).await {
            tracing::warn!(error = %e, "Registration failed, continuing to serve");
        }
        Ok(())
    }

    /// Block until shutdown is commanded. RPC keeps serving meanwhile.
    pub async fn await_shutdown(&mut self) -> Result<AwaitOutcome, AgentError> {
        self.state.advance(LifecycleState::AwaitingShutdown)?;

        let outcome = match self.config.shutdown_mode() {
            ShutdownMode::Embedded => AwaitOutcome::Immediate,
            ShutdownMode::Poll => {
                let mut ticker =
                    tokio::time::interval(Duration::from_millis(self.config.control.poll_interval_ms.max(1)));
                while !self.stop.is_requested() {
                    ticker.tick().await;
                }
                AwaitOutcome::StopRequested
            }
            ShutdownMode::Listen(_) => match self.control.take() {
                Some(listener) => listener.run(&self.stop).await.into(),
                None => {
                    self.stop.wait().await;
                    AwaitOutcome::StopRequested
                }
            },
        };

        tracing::info!(outcome = ?outcome, "Shutdown wait finished");
        Ok(outcome)
    }

    /// Halt the RPC server and remove the process marker.
    ///
    /// Runs once; later calls are no-ops.
    pub fn stop(&mut self) {
        if self.state == LifecycleState::Stopped {
            return;
        }

        if let Some(rpc) = self.rpc.as_mut().filter(|rpc| rpc.is_serving()) {
            rpc.stop();
            self.marker.remove();
        }
        self.control = None;
        self.stop.request();

        self.state = LifecycleState::Stopped;
        tracing::info!("Agent stopped");
    }

    /// Raise the stop flag from outside the control socket.
    pub fn request_stop(&self) {
        self.stop.request();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Most recent scheduler address seen on the RPC port.
    pub fn peer_address(&self) -> Option<SocketAddr> {
        self.peer.get()
    }

    pub fn rpc_addr(&self) -> Option<SocketAddr> {
        self.rpc.as_ref().and_then(RpcServerAdapter::local_addr)
    }

    pub fn control_addr(&self) -> Option<SocketAddr> {
        self.control_addr
    }

    pub fn is_serving(&self) -> bool {
        self.rpc.as_ref().is_some_and(RpcServerAdapter::is_serving)
    }

    pub fn marker(&self) -> &ProcessMarker {
        &self.marker
    }
}
