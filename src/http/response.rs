//! Completed transfers as produced by the transport.

use reqwest::header::{HeaderMap, CONTENT_TYPE};

/// An immutable view of one completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// MIME type the server declared, if any.
    pub content_type: Option<String>,
}

impl ResponseEnvelope {
    /// Build an envelope, taking the declared content type from the headers.
    pub fn new(status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self {
            status,
            headers,
            body,
            content_type,
        }
    }

    /// Shorthand for tests and scripted transports.
    pub fn with_content_type(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = content_type.parse() {
            headers.insert(CONTENT_TYPE, value);
        }
        Self::new(status, headers, body.into())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
