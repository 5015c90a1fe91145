//! Remotely managed execution agent: lifecycle control plane.

pub mod config;
pub mod control;
pub mod credential;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod registry;
pub mod rpc;

pub use config::schema::AgentConfig;
pub use error::AgentError;
pub use lifecycle::{AwaitOutcome, LifecycleController, LifecycleState};
