//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!
//! Consumers:
//!     → logging.rs (fmt layer to stdout, filtered)
//! ```
//!
//! # Design Decisions
//! - Structured fields (peer_addr, pid, outcome) rather than formatted text
//! - Level comes from config; `RUST_LOG` overrides for debugging

pub mod logging;
