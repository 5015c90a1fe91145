//! Registration with the central scheduler.
//!
//! # Responsibilities
//! - Announce the agent's RPC port and pid once serving has started
//!
//! # Design Decisions
//! - Best effort: the controller logs failures and keeps serving
//! - Trait seam so tests and embedders can substitute the transport

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::schema::RegistryConfig;
use crate::error::AgentError;

/// What the agent announces about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub port: u16,
    pub pid: u32,
    pub version: String,
}

impl Registration {
    pub fn new(port: u16, pid: u32) -> Self {
        Self {
            port,
            pid,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

pub type RegisterFuture = Pin<Box<dyn Future<Output = Result<(), AgentError>> + Send>>;

/// Announces a started agent to the scheduling subsystem.
pub trait Registrar: Send + Sync {
    fn register(&self, registration: Registration) -> RegisterFuture;
}

/// Used when no registry URL is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistrar;

impl Registrar for NoopRegistrar {
    fn register(&self, registration: Registration) -> RegisterFuture {
        tracing::debug!(port = registration.port, "No registry configured, skipping registration");
        Box::pin(async { Ok(()) })
    }
}

/// POSTs the registration as JSON.
#[derive(Debug, Clone)]
pub struct HttpRegistrar {
    client: reqwest::Client,
    url: String,
}

impl HttpRegistrar {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AgentError> {
        // The scheduler sits on the internal network; never route via a proxy.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| AgentError::Registration(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Registrar for HttpRegistrar {
    fn register(&self, registration: Registration) -> RegisterFuture {
        let request = self.client.post(&self.url).json(&registration);
        let url = self.url.clone();

        Box::pin(async move {
            let response = request
                .send()
                .await
                .map_err(|e| AgentError::Registration(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(AgentError::Registration(format!("{} returned {}", url, status)));
            }

            tracing::info!(url = %url, port = registration.port, "Registered with scheduler");
            Ok(())
        })
    }
}

/// Registrar for the configured registry, or [`NoopRegistrar`].
pub fn from_config(config: &RegistryConfig) -> Result<Arc<dyn Registrar>, AgentError> {
    match config.url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => Ok(Arc::new(HttpRegistrar::new(
            url,
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(NoopRegistrar)),
    }
}
