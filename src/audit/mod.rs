//! Audit subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline (long transfers only):
//!     attempt fails, retry follows → AttemptFailed
//!     final outcome               → Completed | Failed | Cancelled
//!         → log.rs (bounded FIFO, oldest evicted)
//!         → persist.rs (optional JSON file for the session)
//!
//! Readers:
//!     → read_all() / entries_for(id) for display and debugging
//! ```
//!
//! # Design Decisions
//! - Normal CRUD traffic never writes here; volume stays bounded to what matters
//! - One entry per completed attempt, so a request that fails twice and then
//!   succeeds leaves exactly three entries
//! - Cleared when the session ends, not on token invalidation

pub mod log;
pub mod persist;

pub use log::{AuditAction, AuditEntry, AuditLog};
