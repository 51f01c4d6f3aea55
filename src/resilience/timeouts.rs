//! Timeout enforcement.
//!
//! # Responsibilities
//! - Give every attempt its own deadline
//! - Widen the deadline of long transfers after each failure
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Expiry is a `TransportFailure(Timeout)`, retried like any network failure
//! - Escalation compounds; it never resets between attempts

use std::future::Future;
use std::time::Duration;

use crate::http::transport::TransportError;

/// Next deadline after a failed long-transfer attempt.
pub fn escalate_timeout(current: Duration, factor: f64) -> Duration {
    let next = (current.as_millis() as f64 * factor).round();
    Duration::from_millis(next.max(0.0) as u64).max(current)
}

/// Run one attempt under `deadline`.
pub async fn with_deadline<F, T>(deadline: Duration, attempt: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(deadline, attempt).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::timeout(deadline)),
    }
}
