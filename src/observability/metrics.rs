//! Metrics collection and exposition.
//!
//! # Metrics
//! - `wms_requests_total` (counter): logical requests by method, outcome
//! - `wms_request_duration_seconds` (histogram): end-to-end latency incl. retries
//! - `wms_retries_total` (counter): scheduled retries by method
//! - `wms_disguised_errors_total` (counter): error JSON found in binary bodies
//! - `wms_session_invalidations_total` (counter): tokens dropped after 401
//! - `wms_audit_entries` (gauge): entries currently retained
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exposition is opt-in via `observability.metrics_enabled`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// One resolved logical request.
pub fn record_request(method: &str, outcome: &'static str, start: Instant) {
    let method = method.to_string();
    ::metrics::counter!("wms_requests_total", "method" => method.clone(), "outcome" => outcome)
        .increment(1);
    ::metrics::histogram!("wms_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(method: &str) {
    ::metrics::counter!("wms_retries_total", "method" => method.to_string()).increment(1);
}

pub fn record_disguised_error() {
    ::metrics::counter!("wms_disguised_errors_total").increment(1);
}

pub fn record_session_invalidated() {
    ::metrics::counter!("wms_session_invalidations_total").increment(1);
}

pub fn record_audit_size(len: usize) {
    ::metrics::gauge!("wms_audit_entries").set(len as f64);
}
