//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! <home>/conf/agent.toml
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → AgentConfig (validated, immutable)
//!     → owned by the lifecycle controller
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The `stop` command reads the same file to find the control port

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AgentConfig;
pub use schema::ControlConfig;
pub use schema::RpcConfig;
pub use schema::ShutdownMode;
