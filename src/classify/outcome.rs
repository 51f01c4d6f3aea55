//! Classified outcomes of one attempt.

use serde_json::Value;

use crate::http::transport::{TransportError, TransportFailureKind};

/// What one attempt amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedOutcome {
    /// A JSON payload the server stands behind.
    Success(Value),
    /// Transfer succeeded but the content asserts a failure.
    EmbeddedError(String),
    /// The content carries an application code that ends the session.
    SessionExpired { code: i64, message: String },
    /// Bytes delivered as-is (downloads, exports, backups).
    BinaryArtifact(Vec<u8>),
    /// Non-2xx status; `body` is parsed JSON or text when present.
    StatusError { status: u16, body: Option<Value> },
    /// No response at all.
    TransportFailure {
        kind: TransportFailureKind,
        detail: String,
    },
}

impl ClassifiedOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ClassifiedOutcome::Success(_) | ClassifiedOutcome::BinaryArtifact(_)
        )
    }

    /// Stable label for logs, metrics and audit entries.
    pub fn label(&self) -> &'static str {
        match self {
            ClassifiedOutcome::Success(_) => "success",
            ClassifiedOutcome::EmbeddedError(_) => "embedded_error",
            ClassifiedOutcome::SessionExpired { .. } => "session_expired",
            ClassifiedOutcome::BinaryArtifact(_) => "binary_artifact",
            ClassifiedOutcome::StatusError { .. } => "status_error",
            ClassifiedOutcome::TransportFailure { .. } => "transport_failure",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClassifiedOutcome::StatusError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Split into the payload of a success, or the failure itself.
    pub fn into_result(self) -> Result<Payload, ClassifiedOutcome> {
        match self {
            ClassifiedOutcome::Success(value) => Ok(Payload::Json(value)),
            ClassifiedOutcome::BinaryArtifact(bytes) => Ok(Payload::Binary(bytes)),
            failure => Err(failure),
        }
    }

    /// Human-readable detail of a failure, for logs and audit entries.
    pub fn detail(&self) -> Option<String> {
        match self {
            ClassifiedOutcome::EmbeddedError(message) => Some(message.clone()),
            ClassifiedOutcome::SessionExpired { code, message } => Some(format!("code {}: {}", code, message)),
            ClassifiedOutcome::TransportFailure { kind, detail } => Some(format!("{:?}: {}", kind, detail)),
            ClassifiedOutcome::StatusError { status, .. } => Some(format!("status {}", status)),
            _ => None,
        }
    }
}

impl From<TransportError> for ClassifiedOutcome {
    fn from(e: TransportError) -> Self {
        ClassifiedOutcome::TransportFailure {
            kind: e.kind,
            detail: e.detail,
        }
    }
}

/// Data delivered to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(v) => Some(v),
            Payload::Binary(_) => None,
        }
    }

    /// Bytes to write to disk: binary as-is, JSON pretty-printed.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Binary(b) => b,
            Payload::Json(v) => serde_json::to_vec_pretty(&v).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_variants() {
        assert!(ClassifiedOutcome::Success(json!({})).is_success());
        assert!(ClassifiedOutcome::BinaryArtifact(vec![1]).is_success());
        assert!(!ClassifiedOutcome::EmbeddedError("x".into()).is_success());
        assert!(!ClassifiedOutcome::SessionExpired { code: 50014, message: "x".into() }.is_success());
        assert!(!ClassifiedOutcome::StatusError { status: 500, body: None }.is_success());
    }

    #[test]
    fn test_into_result() {
        assert_eq!(
            ClassifiedOutcome::BinaryArtifact(vec![7, 8]).into_result(),
            Ok(Payload::Binary(vec![7, 8]))
        );
        assert!(ClassifiedOutcome::EmbeddedError("e".into()).into_result().is_err());
    }

    #[test]
    fn test_transport_error_conversion() {
        let outcome: ClassifiedOutcome =
            TransportError::new(TransportFailureKind::Timeout, "slow").into();
        assert_eq!(outcome.label(), "transport_failure");
    }
}
