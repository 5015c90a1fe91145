//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection (scheduler)
//!     → listener.rs (accept, worker limit)
//!     → connection.rs (worker tracking)
//!     → Hand off to the RPC dispatcher
//! ```
//!
//! # Design Decisions
//! - Bounded worker pool prevents resource exhaustion
//! - Each worker is tracked so the adapter can report load

pub mod connection;
pub mod listener;
