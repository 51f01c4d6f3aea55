//! Request descriptors.
//!
//! # Responsibilities
//! - Describe one logical API call (method, path, query, body, headers)
//! - Carry per-call policy: response kind, timeout, retry, operation class
//! - Generate the request ID that correlates logs and audit entries
//!
//! # Design Decisions
//! - Owned exclusively by the caller until dispatch, then by the pipeline
//! - Unset policy fields stay `None` so the decorator can tell "explicit" from "default"

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Objects with more keys than this are summarised in logs.
const LOGGED_BODY_MAX_KEYS: usize = 10;

/// How the response body should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Json,
    Binary,
}

/// Operational weight of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    #[default]
    Normal,
    /// Backup/export style calls: relaxed timeouts and audit logging.
    LongTransfer,
}

impl OperationClass {
    pub fn is_long_transfer(self) -> bool {
        self == OperationClass::LongTransfer
    }
}

/// Caller-configured retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Retries after the initial attempt.
    pub max_attempts: u32,
    /// Fixed delay before each retry.
    pub delay_ms: u64,
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// One part of a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub enum MultipartField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

/// Request body encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Multipart(Vec<MultipartField>),
    Raw(Vec<u8>),
}

impl RequestBody {
    /// A log-safe rendition of the body.
    pub fn summary(&self) -> Value {
        match self {
            RequestBody::Json(Value::Object(map)) if map.len() > LOGGED_BODY_MAX_KEYS => {
                let size = serde_json::to_vec(map).map(|v| v.len()).unwrap_or(0);
                serde_json::json!({ "omitted": true, "keys": map.len(), "bytes": size })
            }
            RequestBody::Json(value) => value.clone(),
            RequestBody::Multipart(fields) => {
                let names: Vec<&str> = fields
                    .iter()
                    .map(|f| match f {
                        MultipartField::Text { name, .. } | MultipartField::File { name, .. } => {
                            name.as_str()
                        }
                    })
                    .collect();
                serde_json::json!({ "multipart": names })
            }
            RequestBody::Raw(bytes) => serde_json::json!({ "raw_bytes": bytes.len() }),
        }
    }
}

/// A caller's description of one logical request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub id: Uuid,
    pub method: Method,
    /// Path relative to the configured base URL (or an absolute URL).
    pub url: String,
    /// Ordered query parameters.
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub headers: HeaderMap,
    /// `None` lets the decorator pick.
    pub response_kind: Option<ResponseKind>,
    pub timeout_ms: Option<u64>,
    /// `None` uses the configured defaults.
    pub retry: Option<RetrySettings>,
    pub operation_class: OperationClass,
    /// Show a message to the user on failure.
    pub notify_on_error: bool,
    /// Status code → message, takes precedence over configured messages.
    pub message_overrides: HashMap<u16, String>,
    /// An in-flight request this one replaces; it is cancelled first.
    pub supersedes: Option<Uuid>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            response_kind: None,
            timeout_ms: None,
            retry: None,
            operation_class: OperationClass::Normal,
            notify_on_error: true,
            message_overrides: HashMap::new(),
            supersedes: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn multipart(mut self, fields: Vec<MultipartField>) -> Self {
        self.body = Some(RequestBody::Multipart(fields));
        self
    }

    pub fn raw(mut self, bytes: Vec<u8>) -> Self {
        self.body = Some(RequestBody::Raw(bytes));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn response_kind(mut self, kind: ResponseKind) -> Self {
        self.response_kind = Some(kind);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn retry(mut self, max_attempts: u32, delay_ms: u64) -> Self {
        self.retry = Some(RetrySettings {
            max_attempts,
            delay_ms,
        });
        self
    }

    pub fn long_transfer(mut self) -> Self {
        self.operation_class = OperationClass::LongTransfer;
        self
    }

    /// Suppress the user-visible message on failure.
    pub fn silent(mut self) -> Self {
        self.notify_on_error = false;
        self
    }

    pub fn message_override(mut self, status: u16, message: impl Into<String>) -> Self {
        self.message_overrides.insert(status, message.into());
        self
    }

    pub fn supersedes(mut self, previous: Uuid) -> Self {
        self.supersedes = Some(previous);
        self
    }

    /// Path component of the target, without query string.
    pub fn path(&self) -> &str {
        path_of(&self.url)
    }
}

/// Path component of a relative or absolute URL, without query or fragment.
pub fn path_of(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.find("://") {
        Some(scheme_end) => {
            let rest = &without_query[scheme_end + 3..];
            rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
        }
        None => without_query,
    }
}

/// A decorated request, ready for the transport.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub id: Uuid,
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub headers: HeaderMap,
    pub response_kind: ResponseKind,
    /// Deadline of the current attempt.
    pub timeout: Duration,
    pub operation_class: OperationClass,
}

impl PreparedRequest {
    /// Safe reads are the only requests the pipeline may repeat.
    pub fn is_safe_read(&self) -> bool {
        self.method.is_safe()
    }

    pub fn path(&self) -> &str {
        path_of(&self.url)
    }
}
