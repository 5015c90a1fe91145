//! RPC transport subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduler connects
//!     → server.rs (accept loop on its own task)
//!     → hook.rs (record peer address)
//!     → dispatch.rs (one worker per transport)
//! ```
//!
//! # Design Decisions
//! - The adapter only starts and stops the transport; request handling
//!   is injected through `Dispatcher`
//! - The hook is a trait so tests can substitute it
//! - Stopping never cancels workers that already hold a transport

pub mod dispatch;
pub mod hook;
pub mod server;

pub use dispatch::{Dispatcher, PingDispatcher};
pub use hook::{ConnectionHook, PeerAddress, PeerRecorder};
pub use server::RpcServerAdapter;
