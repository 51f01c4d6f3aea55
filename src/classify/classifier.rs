//! Response classification.
//!
//! Servers sometimes answer a failed download with a small JSON error body and
//! a 200 status. The size + content-type heuristic below is the only signal
//! available to tell such a body from a genuine artifact.

use serde_json::Value;

use crate::classify::fields::first_message;
use crate::classify::outcome::ClassifiedOutcome;
use crate::config::ClassifierConfig;
use crate::http::request::ResponseKind;
use crate::http::response::ResponseEnvelope;
use crate::observability::metrics;

/// Fields that mark a disguised error, in priority order.
const DISGUISED_ERROR_FIELDS: &[&str] = &["error", "detail"];

/// Fields carrying the message of an application-level `code` failure.
const APPLICATION_MESSAGE_FIELDS: &[&str] = &["message", "error", "detail"];

/// Turns completed transfers into `ClassifiedOutcome`s.
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    config: ClassifierConfig,
}

impl ResponseClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn classify(&self, envelope: &ResponseEnvelope, kind: ResponseKind) -> ClassifiedOutcome {
        if !envelope.is_success() {
            return ClassifiedOutcome::StatusError {
                status: envelope.status,
                body: parse_error_body(&envelope.body),
            };
        }

        match kind {
            ResponseKind::Json => classify_json(&envelope.body, &self.config),
            ResponseKind::Binary => {
                classify_binary(&envelope.body, envelope.content_type.as_deref(), &self.config)
            }
        }
    }
}

/// Classify a 2xx body that was requested as JSON.
pub fn classify_json(body: &[u8], config: &ClassifierConfig) -> ClassifiedOutcome {
    if body.iter().all(u8::is_ascii_whitespace) {
        return ClassifiedOutcome::Success(Value::Null);
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(value) => application_error(&value, config).unwrap_or(ClassifiedOutcome::Success(value)),
        Err(_) => ClassifiedOutcome::Success(Value::String(
            String::from_utf8_lossy(body).into_owned(),
        )),
    }
}

/// Classify a 2xx body that was requested as binary.
///
/// Never drops data: anything that is not a recognisable error is returned
/// byte-for-byte.
pub fn classify_binary(
    bytes: &[u8],
    content_type: Option<&str>,
    config: &ClassifierConfig,
) -> ClassifiedOutcome {
    let json_like = content_type
        .map(|ct| ct.contains(config.json_marker.as_str()))
        .unwrap_or(false);

    if bytes.len() >= config.disguised_error_max_bytes || !json_like {
        return ClassifiedOutcome::BinaryArtifact(bytes.to_vec());
    }

    tracing::warn!(
        size = bytes.len(),
        content_type = content_type.unwrap_or(""),
        "Suspiciously small binary response, checking for a disguised error"
    );

    let parsed = std::str::from_utf8(bytes)
        .ok()
        .and_then(|text| serde_json::from_str::<Value>(text).ok());

    match parsed {
        Some(value) => match first_message(&value, DISGUISED_ERROR_FIELDS) {
            Some(message) => {
                metrics::record_disguised_error();
                tracing::error!(message = %message, "Disguised error found in binary response");
                ClassifiedOutcome::EmbeddedError(message)
            }
            None => ClassifiedOutcome::BinaryArtifact(bytes.to_vec()),
        },
        None => {
            tracing::info!(size = bytes.len(), "Small binary response is not JSON, delivering as-is");
            ClassifiedOutcome::BinaryArtifact(bytes.to_vec())
        }
    }
}

fn application_error(value: &Value, config: &ClassifierConfig) -> Option<ClassifiedOutcome> {
    let code = value.get("code")?.as_i64()?;
    if config.success_codes.contains(&code) {
        return None;
    }
    let message = first_message(value, APPLICATION_MESSAGE_FIELDS)
        .unwrap_or_else(|| format!("request failed (code {})", code));
    if config.session_expired_codes.contains(&code) {
        return Some(ClassifiedOutcome::SessionExpired { code, message });
    }
    Some(ClassifiedOutcome::EmbeddedError(message))
}

fn parse_error_body(body: &[u8]) -> Option<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    serde_json::from_slice(body)
        .ok()
        .or_else(|| Some(Value::String(String::from_utf8_lossy(body).trim().to_string())))
}
