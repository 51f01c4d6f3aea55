//! Response classification subsystem.
//!
//! # Data Flow
//! ```text
//! ResponseEnvelope + ResponseKind
//!     → classifier.rs
//!         non-2xx            → StatusError
//!         json               → Success | EmbeddedError | SessionExpired (application `code`)
//!         binary, small+json → EmbeddedError | BinaryArtifact (parse fallback)
//!         binary, otherwise  → BinaryArtifact (no parse attempt)
//!     → ClassifiedOutcome (outcome.rs)
//! ```
//!
//! # Design Decisions
//! - Pure functions over already-fetched data; testable without a transport
//! - Prefer delivering possibly-misclassified bytes over losing them

pub mod classifier;
pub mod fields;
pub mod outcome;

pub use classifier::{classify_binary, classify_json, ResponseClassifier};
pub use outcome::{ClassifiedOutcome, Payload};
