//! Request decoration.
//!
//! # Responsibilities
//! - Attach `Authorization: Bearer <token>` from a token snapshot
//! - Default the JSON content type on mutating verbs
//! - Detect long transfers, force binary responses and apply the timeout floor
//!
//! # Design Decisions
//! - Pure: no I/O, no session writes
//! - Runs again before every retry so a refreshed token is honored
//! - A missing token is not an error; the server decides

use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;

use crate::config::{LongTransferConfig, PipelineConfig};
use crate::http::request::{
    OperationClass, PreparedRequest, RequestBody, RequestDescriptor, ResponseKind,
};

/// Token prefix length that may appear in logs.
const LOGGED_TOKEN_CHARS: usize = 10;

/// Completes descriptors for transport.
#[derive(Debug, Clone)]
pub struct RequestDecorator {
    default_timeout_ms: u64,
    long_transfer: LongTransferConfig,
}

impl RequestDecorator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            default_timeout_ms: config.transport.default_timeout_ms,
            long_transfer: config.long_transfer.clone(),
        }
    }

    /// Produce the transport-ready form of `descriptor`.
    pub fn decorate(&self, descriptor: &RequestDescriptor, token: Option<&str>) -> PreparedRequest {
        let mut headers = descriptor.headers.clone();

        if let Some(token) = token.filter(|t| !t.is_empty()) {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                    tracing::debug!(
                        request_id = %descriptor.id,
                        token = %redact(token),
                        "Authorization header attached"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        request_id = %descriptor.id,
                        "Token contains characters not allowed in a header; sending unauthenticated"
                    );
                }
            }
        }

        let multipart = matches!(descriptor.body, Some(RequestBody::Multipart(_)));
        if is_mutating(&descriptor.method) && !multipart && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let url_is_long_transfer = self.long_transfer.matches(descriptor.path());
        let operation_class = if url_is_long_transfer {
            OperationClass::LongTransfer
        } else {
            descriptor.operation_class
        };

        let response_kind = match descriptor.response_kind {
            Some(kind) => kind,
            None if url_is_long_transfer => ResponseKind::Binary,
            None => ResponseKind::Json,
        };

        let mut timeout_ms = descriptor.timeout_ms.unwrap_or(self.default_timeout_ms);
        if operation_class.is_long_transfer() && timeout_ms < self.long_transfer.timeout_floor_ms {
            tracing::info!(
                request_id = %descriptor.id,
                url = %descriptor.url,
                original_timeout_ms = timeout_ms,
                new_timeout_ms = self.long_transfer.timeout_floor_ms,
                "Raised long-transfer timeout"
            );
            timeout_ms = self.long_transfer.timeout_floor_ms;
        }

        PreparedRequest {
            id: descriptor.id,
            method: descriptor.method.clone(),
            url: descriptor.url.clone(),
            query: descriptor.query.clone(),
            body: descriptor.body.clone(),
            headers,
            response_kind,
            timeout: Duration::from_millis(timeout_ms),
            operation_class,
        }
    }
}

fn is_mutating(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(LOGGED_TOKEN_CHARS).collect();
    format!("Bearer {}...", prefix)
}
