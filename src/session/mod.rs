//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! login / refresh / logout (outer UI)
//!     → token.rs (atomic replace of the token)
//!     → SessionEvent broadcast
//!
//! Every decoration pass:
//!     → TokenStore::snapshot() (lock-free read)
//!
//! 401 from the server:
//!     → errors::translator → TokenStore::invalidate()
//! ```
//!
//! # Design Decisions
//! - The store is injected into the Pipeline, never a global
//! - The error translator is the only pipeline stage allowed to write it

pub mod token;

pub use token::{extract_token, SessionEvent, TokenStore};
