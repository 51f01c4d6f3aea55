//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, request ID on every line)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all subsystems as a log field
//! - Tokens never appear in logs beyond a short redacted prefix

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
