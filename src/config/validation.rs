//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, worker limits)
//! - Detect conflicting listeners
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::{AgentConfig, CONTROL_PORT_EMBEDDED};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyShutdownToken,
    ZeroWorkers,
    ControlPortOutOfRange(i32),
    PortConflict(u16),
    InvalidRegistryUrl(String),
    UnknownLogLevel(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyShutdownToken => write!(f, "control.token must not be empty"),
            ValidationError::ZeroWorkers => write!(f, "rpc.max_workers must be greater than 0"),
            ValidationError::ControlPortOutOfRange(p) => {
                write!(f, "control.port {} is out of range (-2..=65535)", p)
            }
            ValidationError::PortConflict(p) => {
                write!(f, "rpc.port and control.port are both {}", p)
            }
            ValidationError::InvalidRegistryUrl(u) => write!(f, "registry.url '{}' is not a valid URL", u),
            ValidationError::UnknownLogLevel(l) => write!(f, "unknown log level '{}'", l),
        }
    }
}

/// Validate a loaded configuration, collecting every problem.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.control.token.is_empty() {
        errors.push(ValidationError::EmptyShutdownToken);
    }

    if config.rpc.max_workers == 0 {
        errors.push(ValidationError::ZeroWorkers);
    }

    let control_port = config.control.port;
    if control_port < CONTROL_PORT_EMBEDDED || control_port > i32::from(u16::MAX) {
        errors.push(ValidationError::ControlPortOutOfRange(control_port));
    } else if control_port > 0 && control_port == i32::from(config.rpc.port) {
        errors.push(ValidationError::PortConflict(config.rpc.port));
    }

    if let Some(raw) = &config.registry.url {
        if url::Url::parse(raw).is_err() {
            errors.push(ValidationError::InvalidRegistryUrl(raw.clone()));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
