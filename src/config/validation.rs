//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, escalation >= 1.0, capacity >= 1)
//! - Check that the base URL and status-code keys parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PipelineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::PipelineConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &PipelineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = url::Url::parse(&config.transport.base_url) {
        errors.push(ValidationError::new(
            "transport.base_url",
            format!("not a valid URL ({})", e),
        ));
    }
    if config.transport.default_timeout_ms == 0 {
        errors.push(ValidationError::new("transport.default_timeout_ms", "must be > 0"));
    }
    if config.transport.connect_timeout_ms == 0 {
        errors.push(ValidationError::new("transport.connect_timeout_ms", "must be > 0"));
    }

    if config.long_transfer.patterns.iter().all(|p| p.is_empty()) {
        errors.push(ValidationError::new(
            "long_transfer.patterns",
            "at least one non-empty pattern is required",
        ));
    }
    if config.long_transfer.timeout_floor_ms == 0 {
        errors.push(ValidationError::new("long_transfer.timeout_floor_ms", "must be > 0"));
    }
    let factor = config.long_transfer.timeout_escalation;
    if !factor.is_finite() || factor < 1.0 {
        errors.push(ValidationError::new(
            "long_transfer.timeout_escalation",
            "must be a finite number >= 1.0",
        ));
    }

    if config.classifier.json_marker.is_empty() {
        errors.push(ValidationError::new("classifier.json_marker", "must not be empty"));
    }

    if config.audit.capacity == 0 {
        errors.push(ValidationError::new("audit.capacity", "must be >= 1"));
    }

    for key in config.errors.messages.keys() {
        if key.parse::<u16>().is_err() {
            errors.push(ValidationError::new(
                format!("errors.messages.{}", key),
                "key must be an HTTP status code",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
