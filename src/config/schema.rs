//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Control port value meaning "no listener, poll the stop flag".
pub const CONTROL_PORT_POLL: i32 = -1;

/// Control port value meaning "no listener, return from await immediately".
pub const CONTROL_PORT_EMBEDDED: i32 = -2;

/// Root configuration for the agent.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent home directory. Credential and process marker files live here.
    pub home: PathBuf,

    /// RPC listener settings.
    pub rpc: RpcConfig,

    /// Shutdown control socket settings.
    pub control: ControlConfig,

    /// Credential provisioning.
    pub credential: CredentialConfig,

    /// Process marker settings.
    pub process: ProcessConfig,

    /// Scheduler registration.
    pub registry: RegistryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::from("."),
            rpc: RpcConfig::default(),
            control: ControlConfig::default(),
            credential: CredentialConfig::default(),
            process: ProcessConfig::default(),
            registry: RegistryConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Path of the persisted credential hash.
    pub fn credential_path(&self) -> PathBuf {
        self.home.join(&self.credential.file_name)
    }

    /// Path of the process marker.
    pub fn pid_path(&self) -> PathBuf {
        self.home.join(&self.process.pid_file)
    }

    /// How `await_shutdown` should block.
    pub fn shutdown_mode(&self) -> ShutdownMode {
        ShutdownMode::from_port(self.control.port)
    }
}

/// RPC listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// Port the scheduler connects to. 0 binds an ephemeral port.
    pub port: u16,

    /// Maximum concurrent RPC workers (one per accepted transport).
    pub max_workers: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 1577,
            max_workers: 256,
        }
    }
}

impl RpcConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

/// Shutdown control socket configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Interface to bind. Loopback unless there is a reason otherwise.
    pub bind_host: String,

    /// Control port. `-1` polls the stop flag, `-2` disables waiting.
    pub port: i32,

    /// Literal the `stop` command must send.
    pub token: String,

    /// Per-connection read timeout in seconds.
    pub read_timeout_secs: u64,

    /// Stop flag poll interval in milliseconds (poll mode only).
    pub poll_interval_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            port: 1578,
            token: "stop".to_string(),
            read_timeout_secs: 10,
            poll_interval_ms: 10_000,
        }
    }
}

/// Credential provisioning configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Externally supplied plaintext. Always overrides the stored hash.
    pub password: String,

    /// Plaintext hashed when nothing else is available.
    pub default_password: String,

    /// Credential file name under `home`.
    pub file_name: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            password: String::new(),
            default_password: "agentd".to_string(),
            file_name: ".password".to_string(),
        }
    }
}

/// Process marker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Marker file name under `home`.
    pub pid_file: String,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            pid_file: "agentd.pid".to_string(),
        }
    }
}

/// Scheduler registration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registration endpoint. Registration is skipped when unset.
    pub url: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// How the lifecycle waits for shutdown, derived from the control port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Listen for the shutdown token on this port.
    Listen(u16),
    /// No listener; block until the stop flag is raised.
    Poll,
    /// No listener; return immediately.
    Embedded,
}

impl ShutdownMode {
    /// Map a configured control port to a mode.
    ///
    /// Out-of-range values are rejected by validation before this is called;
    /// anything else negative is treated as `Embedded`.
    pub fn from_port(port: i32) -> Self {
        match port {
            CONTROL_PORT_POLL => ShutdownMode::Poll,
            p if p < 0 => ShutdownMode::Embedded,
            p => u16::try_from(p).map_or(ShutdownMode::Embedded, ShutdownMode::Listen),
        }
    }
}
