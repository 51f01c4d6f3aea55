//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pipeline.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the request pipeline.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Transport settings (base URL, default timeouts).
    pub transport: TransportConfig,

    /// Retry defaults applied when a descriptor carries no retry settings.
    pub retries: RetryConfig,

    /// Long-transfer (backup/export) detection and timeout policy.
    pub long_transfer: LongTransferConfig,

    /// Disguised-error heuristic and application error indicator.
    pub classifier: ClassifierConfig,

    /// Audit ring buffer settings.
    pub audit: AuditConfig,

    /// User-facing message overrides.
    pub errors: ErrorMessagesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    /// Base URL every request path is joined onto.
    pub base_url: String,

    /// Per-attempt timeout when the caller does not set one.
    pub default_timeout_ms: u64,

    /// Connection establishment timeout.
    pub connect_timeout_ms: u64,

    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            default_timeout_ms: 60_000,
            connect_timeout_ms: 10_000,
            user_agent: concat!("wms-pipeline/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries allowed when the descriptor does not say (0 = never retry).
    pub default_max_attempts: u32,

    /// Fixed delay between attempts in milliseconds.
    pub default_delay_ms: u64,

    /// Treat 502/503/504 on safe reads like transport failures.
    pub retry_gateway_errors: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            default_max_attempts: 0,
            default_delay_ms: 1_000,
            retry_gateway_errors: false,
        }
    }
}

/// Long-transfer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LongTransferConfig {
    /// Case-sensitive substrings of the URL path that flag a long transfer.
    pub patterns: Vec<String>,

    /// Minimum timeout for long transfers in milliseconds.
    pub timeout_floor_ms: u64,

    /// Multiplier applied to the timeout after each failed long-transfer attempt.
    pub timeout_escalation: f64,
}

impl Default for LongTransferConfig {
    fn default() -> Self {
        Self {
            patterns: vec!["backup".to_string(), "export".to_string()],
            timeout_floor_ms: 120_000,
            timeout_escalation: 1.5,
        }
    }
}

impl LongTransferConfig {
    /// Returns true if the URL names a long-transfer operation.
    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| url.contains(p.as_str()))
    }
}

/// Response classifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Binary payloads strictly smaller than this are suspected disguised errors.
    pub disguised_error_max_bytes: usize,

    /// Substring of the declared content type that marks a JSON structure.
    pub json_marker: String,

    /// Values of an application-level `code` field that mean success.
    pub success_codes: Vec<i64>,

    /// Application codes that mean the session is no longer valid
    /// (illegal token, logged in elsewhere, token expired).
    pub session_expired_codes: Vec<i64>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            disguised_error_max_bytes: 1_000,
            json_marker: "json".to_string(),
            success_codes: vec![200, 20_000],
            session_expired_codes: vec![50_008, 50_012, 50_014],
        }
    }
}

/// Audit log configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    /// Maximum retained entries; the oldest is evicted beyond this.
    pub capacity: usize,

    /// Optional file the log is persisted to for the session.
    pub persist_path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            persist_path: None,
        }
    }
}

/// Message overrides keyed by HTTP status code (e.g. `"403" = "..."`).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ErrorMessagesConfig {
    pub messages: BTreeMap<String, String>,
}

impl ErrorMessagesConfig {
    /// Look up the override for a status code.
    pub fn message_for(&self, status: u16) -> Option<&str> {
        self.messages.get(&status.to_string()).map(String::as_str)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for terminals, JSON for machine parsing.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
