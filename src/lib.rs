//! Resilient request/response pipeline for the WMS admin console.

pub mod audit;
pub mod classify;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod pipeline;
pub mod resilience;
pub mod session;

pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use classify::{ClassifiedOutcome, Payload};
pub use config::PipelineConfig;
pub use errors::{ErrorKind, PipelineError, PipelineResult, TranslatedError};
pub use http::{RequestDescriptor, ResponseKind};
pub use pipeline::Pipeline;
pub use session::TokenStore;
