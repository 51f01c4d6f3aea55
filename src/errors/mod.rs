//! Error handling subsystem.
//!
//! # Data Flow
//! ```text
//! Terminal failure (after retries):
//!     → translator.rs (status table, overrides, 401 session invalidation)
//!     → TranslatedError { kind, message, status }
//!     → notifier.rs (exactly one user-visible message, unless silenced)
//!     → PipelineError::Request returned to the caller
//! ```
//!
//! # Design Decisions
//! - Intermediate failures that get retried are never translated
//! - Caller-facing errors carry both a message and a machine kind

pub mod notifier;
pub mod translator;
pub mod types;

pub use notifier::{Notifier, TracingNotifier};
pub use translator::ErrorTranslator;
pub use types::{ErrorKind, PipelineError, PipelineResult, TranslatedError};
