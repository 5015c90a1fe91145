//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (controller.rs):
//!     Resolve credential → Start RPC server → Write pid marker
//!     → Bind control socket → Register (best effort)
//!
//! Waiting (controller.rs + control/):
//!     Control socket token | stop flag → unblock
//!
//! Shutdown (controller.rs):
//!     Stop RPC accept → Remove pid marker → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Raise stop flag
//! ```
//!
//! # Design Decisions
//! - Ordered startup: credential first, then RPC, then control socket
//! - States only move forward (state.rs)
//! - Stop flag and peer address belong to the controller instance

pub mod controller;
pub mod marker;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use controller::{AwaitOutcome, LifecycleController};
pub use marker::ProcessMarker;
pub use shutdown::StopHandle;
pub use state::LifecycleState;
