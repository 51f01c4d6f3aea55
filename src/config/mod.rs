//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PipelineConfig (validated, immutable)
//!     → held by the Pipeline in an ArcSwap
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → Pipeline::reload_config swaps the Arc
//!     → descriptors dispatched afterwards observe the new config
//! ```
//!
//! # Design Decisions
//! - A descriptor keeps the config snapshot it started with across retries
//! - All fields have defaults to allow minimal configs
//! - Heuristic constants (size threshold, escalation factor) live here, not in code

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AuditConfig, ClassifierConfig, ErrorMessagesConfig, LogFormat, LongTransferConfig,
    ObservabilityConfig, PipelineConfig, RetryConfig, TransportConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
