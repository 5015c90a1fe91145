//! Credential bootstrapping.
//!
//! # Data Flow
//! ```text
//! external plaintext ──┐
//! stored hash file ────┼─→ store.rs (resolve) → Credential (hashed)
//! default plaintext ───┘                      → credential file rewritten
//! ```
//!
//! # Design Decisions
//! - Only the hash is ever written to disk
//! - The file is the recovery path on restart without the plaintext,
//!   so any persistence failure is fatal

pub mod store;

pub use store::{hash_secret, Credential, CredentialSource, CredentialStore};
