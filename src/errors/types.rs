//! Error types surfaced to callers.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigError;
use crate::http::transport::TransportError;

/// Machine-readable failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No response: unreachable, reset, refused.
    Network,
    Timeout,
    /// The request could not be built or sent.
    InvalidRequest,
    /// The server answered but the content asserts a failure.
    Embedded,
    /// 400
    Validation,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 500
    Server,
    /// Any other non-2xx status.
    Status,
}

impl ErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::Validation,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            500 => ErrorKind::Server,
            _ => ErrorKind::Status,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Embedded => "embedded",
            ErrorKind::Validation => "validation",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Server => "server",
            ErrorKind::Status => "status",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The final, user-facing form of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct TranslatedError {
    pub kind: ErrorKind,
    pub message: String,
    /// HTTP status when the server answered with one.
    pub status: Option<u16>,
}

impl TranslatedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Errors returned by the pipeline and its entry points.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request resolved unsuccessfully.
    #[error(transparent)]
    Request(#[from] TranslatedError),

    #[error("request {0} was cancelled")]
    Cancelled(Uuid),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP client could not be constructed.
    #[error("client setup failed: {0}")]
    Client(#[from] TransportError),
}

impl PipelineError {
    pub fn translated(&self) -> Option<&TranslatedError> {
        match self {
            PipelineError::Request(e) => Some(e),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.translated().map(|e| e.kind)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled(_))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
