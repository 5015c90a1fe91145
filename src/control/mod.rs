//! Local shutdown control channel.
//!
//! # Data Flow
//! ```text
//! agentd stop
//!     → client.rs (connect to loopback control port, write token)
//!     → listener.rs (accept one at a time, bounded read, exact match)
//!     → StopHandle raised → lifecycle teardown
//! ```
//!
//! # Design Decisions
//! - Works without a terminal or process signals
//! - Reads are bounded (budget.rs) and time-limited per connection
//! - A wrong command never stops the loop

pub mod budget;
pub mod client;
pub mod listener;

pub use budget::compute_read_budget;
pub use client::send_shutdown;
pub use listener::{ControlOutcome, ControlSocketListener};
