//! Final-outcome translation into user-facing messages.
//!
//! # Responsibilities
//! - Map failure outcomes and status codes to one message and an `ErrorKind`
//! - Apply caller and configured message overrides
//! - Invalidate the session on 401 and on session-expired application codes
//!
//! # Design Decisions
//! - Called once per logical request, on its terminal outcome only
//! - Server-asserted messages are passed through verbatim
//! - Override precedence: descriptor, then config, then built-in default

use std::collections::HashMap;

use serde_json::Value;

use crate::classify::fields::{first_message, message_of};
use crate::classify::ClassifiedOutcome;
use crate::config::ErrorMessagesConfig;
use crate::errors::types::{ErrorKind, TranslatedError};
use crate::http::request::PreparedRequest;
use crate::http::transport::TransportFailureKind;
use crate::session::TokenStore;

pub const UNAUTHORIZED: &str = "unauthorized, please re-authenticate";
pub const FORBIDDEN: &str = "access denied";
pub const INTERNAL_ERROR: &str = "internal server error";
pub const INVALID_PARAMETERS: &str = "invalid request parameters";
pub const TIMED_OUT: &str = "request timed out";
pub const NO_RESPONSE: &str = "server did not respond";
pub const LONG_TRANSFER_NETWORK: &str = "network error during long transfer operation";

const GENERIC_FIELDS: &[&str] = &["detail", "message", "error"];

/// Turns terminal failures into [`TranslatedError`]s.
#[derive(Debug, Clone, Default)]
pub struct ErrorTranslator {
    configured: ErrorMessagesConfig,
}

impl ErrorTranslator {
    pub fn new(config: &ErrorMessagesConfig) -> Self {
        Self {
            configured: config.clone(),
        }
    }

    /// Translate a terminal outcome. Returns `None` for successful outcomes.
    ///
    /// A 401 or a session-expired application code clears `session` before
    /// returning.
    pub fn translate(
        &self,
        outcome: &ClassifiedOutcome,
        request: &PreparedRequest,
        overrides: &HashMap<u16, String>,
        session: &TokenStore,
    ) -> Option<TranslatedError> {
        let translated = match outcome {
            ClassifiedOutcome::Success(_) | ClassifiedOutcome::BinaryArtifact(_) => return None,
            ClassifiedOutcome::EmbeddedError(message) => {
                TranslatedError::new(ErrorKind::Embedded, message.clone())
            }
            ClassifiedOutcome::SessionExpired { code, message } => {
                session.invalidate(format!("code {} from {}", code, request.path()));
                TranslatedError::new(ErrorKind::Unauthorized, message.clone())
            }
            ClassifiedOutcome::TransportFailure { kind, detail } => {
                transport_error(*kind, detail, request.operation_class.is_long_transfer())
            }
            ClassifiedOutcome::StatusError { status, body } => {
                let status = *status;
                if status == 401 {
                    session.invalidate(format!("401 from {}", request.path()));
                }
                let message = self
                    .override_for(status, overrides)
                    .unwrap_or_else(|| default_status_message(status, body.as_ref(), request.path()));
                TranslatedError::new(ErrorKind::from_status(status), message).with_status(status)
            }
        };

        tracing::debug!(
            request_id = %request.id,
            kind = %translated.kind,
            message = %translated.message,
            "Translated terminal failure"
        );
        Some(translated)
    }

    fn override_for(&self, status: u16, overrides: &HashMap<u16, String>) -> Option<String> {
        overrides
            .get(&status)
            .cloned()
            .or_else(|| self.configured.message_for(status).map(str::to_string))
    }
}

fn transport_error(kind: TransportFailureKind, detail: &str, long_transfer: bool) -> TranslatedError {
    match kind {
        TransportFailureKind::Timeout => TranslatedError::new(ErrorKind::Timeout, TIMED_OUT),
        TransportFailureKind::InvalidRequest => {
            TranslatedError::new(ErrorKind::InvalidRequest, format!("invalid request: {}", detail))
        }
        TransportFailureKind::Connect | TransportFailureKind::Network if long_transfer => {
            TranslatedError::new(ErrorKind::Network, LONG_TRANSFER_NETWORK)
        }
        TransportFailureKind::Connect | TransportFailureKind::Network => {
            TranslatedError::new(ErrorKind::Network, NO_RESPONSE)
        }
    }
}

/// Built-in message for a status when nothing overrides it.
pub fn default_status_message(status: u16, body: Option<&Value>, path: &str) -> String {
    match status {
        400 => validation_message(body),
        401 => UNAUTHORIZED.to_string(),
        403 => FORBIDDEN.to_string(),
        404 => format!("resource not found: {}", path),
        500 => INTERNAL_ERROR.to_string(),
        _ => body
            .and_then(server_message)
            .unwrap_or_else(|| format!("request failed (status {})", status)),
    }
}

/// Message of a 400 body.
///
/// Plain text first, then per-field errors (`field: first`, joined with `; `),
/// then `detail`, `message`, `error`, `non_field_errors[0]`.
pub fn validation_message(body: Option<&Value>) -> String {
    let Some(body) = body else {
        return INVALID_PARAMETERS.to_string();
    };
    if let Value::String(text) = body {
        if !text.is_empty() {
            return text.clone();
        }
    }
    if let Some(fields) = field_errors(body) {
        return fields;
    }
    first_message(body, GENERIC_FIELDS)
        .or_else(|| {
            body.get("non_field_errors")
                .and_then(Value::as_array)
                .and_then(|errors| errors.first())
                .and_then(message_of)
        })
        .unwrap_or_else(|| INVALID_PARAMETERS.to_string())
}

fn field_errors(body: &Value) -> Option<String> {
    let object = body.as_object()?;
    let parts: Vec<String> = object
        .iter()
        .filter(|(field, _)| field.as_str() != "non_field_errors")
        .filter_map(|(field, value)| {
            let first = value.as_array()?.first()?;
            Some(format!("{}: {}", field, message_of(first)?))
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("; "))
}

fn server_message(body: &Value) -> Option<String> {
    match body {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => first_message(body, GENERIC_FIELDS),
    }
}
