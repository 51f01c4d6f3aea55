//! Request pipeline.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor
//!     → supersede (cancel the request it replaces)
//!     → RequestDecorator (token snapshot, content type, long-transfer floor)
//!     → Transport under a per-attempt deadline, raced against cancellation
//!     → ResponseClassifier
//!         success → AuditLog "completed" (long transfers) → Payload
//!         failure → RetryCoordinator
//!             retry   → AuditLog "attempt_failed" → delay → re-decorate → Transport
//!             give up → ErrorTranslator → AuditLog "failed" → Notifier → PipelineError
//! ```
//!
//! # Design Decisions
//! - Stages are rebuilt from config on reload; in-flight requests are unaffected
//! - The token is re-read before every attempt so a refresh mid-retry is honored
//! - Only long transfers write to the audit log

pub mod dispatcher;

pub use dispatcher::Pipeline;
