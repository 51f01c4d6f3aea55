//! Transport boundary.
//!
//! # Responsibilities
//! - Execute one prepared request and hand back a `ResponseEnvelope`
//! - Report "no response" conditions as a `TransportError`
//!
//! # Design Decisions
//! - Object-safe trait with boxed futures so tests can script responses
//! - Any HTTP status is a completed transfer; classification happens later
//! - The pipeline owns the per-attempt deadline; reqwest gets it too as a backstop

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::TransportConfig;
use crate::http::request::{MultipartField, PreparedRequest, RequestBody};
use crate::http::response::ResponseEnvelope;

/// Why no response was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportFailureKind {
    /// Could not connect (refused, DNS, unreachable).
    Connect,
    /// The attempt's deadline expired.
    Timeout,
    /// Connection dropped or body could not be read.
    Network,
    /// The request could not be built (bad URL, bad multipart part).
    InvalidRequest,
}

/// A transfer that produced no response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind:?}: {detail}")]
pub struct TransportError {
    pub kind: TransportFailureKind,
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: TransportFailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn connect(detail: impl Into<String>) -> Self {
        Self::new(TransportFailureKind::Connect, detail)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            TransportFailureKind::Timeout,
            format!("no response within {} ms", after.as_millis()),
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportFailureKind::Timeout
        } else if e.is_connect() {
            TransportFailureKind::Connect
        } else if e.is_builder() {
            TransportFailureKind::InvalidRequest
        } else {
            TransportFailureKind::Network
        };
        Self::new(kind, e.to_string())
    }
}

/// Executes prepared requests.
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a PreparedRequest,
    ) -> BoxFuture<'a, Result<ResponseEnvelope, TransportError>>;
}

/// Production transport backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            TransportError::new(
                TransportFailureKind::InvalidRequest,
                format!("invalid base URL '{}': {}", config.base_url, e),
            )
        })?;
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Resolve a descriptor URL against the base URL.
    ///
    /// Relative paths are appended to the base path, so a base of
    /// `http://host/dev-api` sends `/api/v1/x/` to `http://host/dev-api/api/v1/x/`.
    pub fn resolve(&self, url: &str) -> Result<Url, TransportError> {
        if url.contains("://") {
            Url::parse(url)
        } else {
            let base = self.base_url.as_str().trim_end_matches('/');
            Url::parse(&format!("{}/{}", base, url.trim_start_matches('/')))
        }
        .map_err(|e| {
            TransportError::new(
                TransportFailureKind::InvalidRequest,
                format!("cannot resolve '{}': {}", url, e),
            )
        })
    }

    async fn execute(&self, request: &PreparedRequest) -> Result<ResponseEnvelope, TransportError> {
        let url = self.resolve(&request.url)?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone())
            .timeout(request.timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match &request.body {
            None => builder,
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Raw(bytes)) => builder.body(bytes.clone()),
            Some(RequestBody::Multipart(fields)) => builder.multipart(build_form(fields)?),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(ResponseEnvelope::new(status, headers, body.to_vec()))
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(
        &'a self,
        request: &'a PreparedRequest,
    ) -> BoxFuture<'a, Result<ResponseEnvelope, TransportError>> {
        self.execute(request).boxed()
    }
}

fn build_form(fields: &[MultipartField]) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for field in fields {
        form = match field {
            MultipartField::Text { name, value } => form.text(name.clone(), value.clone()),
            MultipartField::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                let mut part = Part::bytes(bytes.clone()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    part = part.mime_str(mime).map_err(|e| {
                        TransportError::new(
                            TransportFailureKind::InvalidRequest,
                            format!("invalid MIME type '{}': {}", mime, e),
                        )
                    })?;
                }
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> ReqwestTransport {
        ReqwestTransport::new(&TransportConfig {
            base_url: base.to_string(),
            ..TransportConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_resolve_relative_path() {
        let t = transport("http://wms.local:8000/");
        assert_eq!(
            t.resolve("/api/v1/warehouse/").unwrap().as_str(),
            "http://wms.local:8000/api/v1/warehouse/"
        );
    }

    #[test]
    fn test_resolve_keeps_base_path_prefix() {
        for base in ["http://wms.local:8000/dev-api/", "http://wms.local:8000/dev-api"] {
            let t = transport(base);
            assert_eq!(
                t.resolve("/api/v1/inventory/").unwrap().as_str(),
                "http://wms.local:8000/dev-api/api/v1/inventory/"
            );
            assert_eq!(
                t.resolve("api/v1/inventory/").unwrap().as_str(),
                "http://wms.local:8000/dev-api/api/v1/inventory/"
            );
        }
    }

    #[test]
    fn test_resolve_absolute_url() {
        let t = transport("http://wms.local:8000/");
        assert_eq!(
            t.resolve("https://files.local/export/1").unwrap().as_str(),
            "https://files.local/export/1"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = ReqwestTransport::new(&TransportConfig {
            base_url: "::nope".into(),
            ..TransportConfig::default()
        })
        .unwrap_err();
        assert_eq!(err.kind, TransportFailureKind::InvalidRequest);
    }

    #[test]
    fn test_invalid_mime_is_invalid_request() {
        let err = build_form(&[MultipartField::File {
            name: "file".into(),
            file_name: "a.xlsx".into(),
            mime: Some("not a mime".into()),
            bytes: vec![1, 2],
        }])
        .unwrap_err();
        assert_eq!(err.kind, TransportFailureKind::InvalidRequest);
    }

    #[test]
    fn test_timeout_error_detail() {
        let err = TransportError::timeout(Duration::from_millis(1500));
        assert_eq!(err.kind, TransportFailureKind::Timeout);
        assert_eq!(err.detail, "no response within 1500 ms");
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_transport_error() {
        // Port 9 (discard) is closed on test machines.
        let t = transport("http://127.0.0.1:9/");
        let req = PreparedRequest {
            id: uuid::Uuid::new_v4(),
            method: reqwest::Method::GET,
            url: "/x".into(),
            query: Vec::new(),
            body: None,
            headers: Default::default(),
            response_kind: crate::http::request::ResponseKind::Json,
            timeout: Duration::from_secs(2),
            operation_class: Default::default(),
        };
        let err = t.send(&req).await.unwrap_err();
        assert!(matches!(
            err.kind,
            TransportFailureKind::Connect | TransportFailureKind::Network | TransportFailureKind::Timeout
        ));
    }
}
