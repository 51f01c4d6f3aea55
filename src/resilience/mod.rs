//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt to the server:
//!     → timeouts.rs (per-attempt deadline)
//!     → On failure: retries.rs (retryable? within max_attempts?)
//!     → state.rs (attempt count, delay, escalated timeout)
//!     → cancel.rs (caller cancellation short-circuits attempt and delay)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Retries only for safe reads (GET, HEAD)
//! - Attempts of one descriptor are strictly sequential

pub mod cancel;
pub mod retries;
pub mod state;
pub mod timeouts;

pub use cancel::{CancelSignal, InFlightGuard, InFlightRegistry};
pub use retries::{is_retryable, RetryCoordinator, RetryDecision};
pub use state::{AttemptPhase, RetryState};
pub use timeouts::{escalate_timeout, with_deadline};
