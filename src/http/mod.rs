//! HTTP request model and transport.
//!
//! # Data Flow
//! ```text
//! caller builds RequestDescriptor (request.rs)
//!     → decorator.rs (auth header, content type, long-transfer policy)
//!     → PreparedRequest
//!     → transport.rs (reqwest or scripted)
//!     → ResponseEnvelope (response.rs)
//! ```

pub mod decorator;
pub mod request;
pub mod response;
pub mod transport;

pub use decorator::RequestDecorator;
pub use request::{
    MultipartField, OperationClass, PreparedRequest, RequestBody, RequestDescriptor,
    ResponseKind, RetrySettings,
};
pub use response::ResponseEnvelope;
pub use transport::{ReqwestTransport, Transport, TransportError, TransportFailureKind};
