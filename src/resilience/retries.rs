//! Retry logic.
//!
//! # Responsibilities
//! - Determine if a failed attempt is retryable (safe reads only)
//! - Bound attempts by the descriptor's `max_attempts`
//! - Schedule a fixed delay and escalate long-transfer timeouts
//!
//! # Design Decisions
//! - Never retry POST/PUT/DELETE/PATCH (non-idempotent)
//! - Fixed delay per attempt; the caller configures it, no backoff multiplier
//! - Only "no response" failures are retried; a server that answered
//!   (embedded errors, 4xx) answered deterministically
//! - Gateway statuses (502/503/504) are retryable only when configured

use std::time::Duration;

use reqwest::Method;

use crate::classify::ClassifiedOutcome;
use crate::config::{LongTransferConfig, RetryConfig};
use crate::http::request::{PreparedRequest, RequestDescriptor, RetrySettings};
use crate::http::transport::TransportFailureKind;
use crate::resilience::state::RetryState;
use crate::resilience::timeouts::escalate_timeout;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter { delay: Duration, next_timeout: Duration },
    GiveUp,
}

/// Whether `outcome` of a `method` request may be repeated at all.
pub fn is_retryable(method: &Method, outcome: &ClassifiedOutcome, retry_gateway_errors: bool) -> bool {
    if !method.is_safe() {
        return false;
    }
    match outcome {
        ClassifiedOutcome::TransportFailure { kind, .. } => *kind != TransportFailureKind::InvalidRequest,
        ClassifiedOutcome::StatusError { status, .. } => {
            retry_gateway_errors && matches!(status, 502 | 503 | 504)
        }
        _ => false,
    }
}

/// Decides retry-vs-give-up for one logical request.
#[derive(Debug, Clone)]
pub struct RetryCoordinator {
    defaults: RetryConfig,
    escalation: f64,
}

impl RetryCoordinator {
    pub fn new(retries: &RetryConfig, long_transfer: &LongTransferConfig) -> Self {
        Self {
            defaults: retries.clone(),
            escalation: long_transfer.timeout_escalation,
        }
    }

    /// The descriptor's own settings, or the configured defaults.
    pub fn settings_for(&self, descriptor: &RequestDescriptor) -> RetrySettings {
        descriptor.retry.unwrap_or(RetrySettings {
            max_attempts: self.defaults.default_max_attempts,
            delay_ms: self.defaults.default_delay_ms,
        })
    }

    /// Decide after a failed attempt, advancing `state` accordingly.
    pub fn decide(
        &self,
        request: &PreparedRequest,
        settings: RetrySettings,
        outcome: &ClassifiedOutcome,
        state: &mut RetryState,
    ) -> RetryDecision {
        let eligible = is_retryable(&request.method, outcome, self.defaults.retry_gateway_errors)
            && settings.max_attempts > 0
            && state.attempt_count() < settings.max_attempts;

        if !eligible {
            state.fail();
            return RetryDecision::GiveUp;
        }

        let next_timeout = if request.operation_class.is_long_transfer() {
            escalate_timeout(state.current_timeout(), self.escalation)
        } else {
            state.current_timeout()
        };
        state.schedule_retry(settings.delay_ms, next_timeout);

        tracing::info!(
            request_id = %request.id,
            url = %request.url,
            attempt = state.attempt_count(),
            max_attempts = settings.max_attempts,
            delay_ms = settings.delay_ms,
            next_timeout_ms = next_timeout.as_millis() as u64,
            "Retrying request"
        );

        RetryDecision::RetryAfter {
            delay: settings.delay(),
            next_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::http::decorator::RequestDecorator;
    use crate::resilience::state::AttemptPhase;
    use serde_json::json;

    fn coordinator(config: &PipelineConfig) -> RetryCoordinator {
        RetryCoordinator::new(&config.retries, &config.long_transfer)
    }

    fn network_failure() -> ClassifiedOutcome {
        ClassifiedOutcome::TransportFailure {
            kind: TransportFailureKind::Connect,
            detail: "connection refused".into(),
        }
    }

    fn prepare(config: &PipelineConfig, desc: &RequestDescriptor) -> PreparedRequest {
        RequestDecorator::new(config).decorate(desc, None)
    }

    #[test]
    fn test_retry_bound() {
        let config = PipelineConfig::default();
        let desc = RequestDescriptor::get("/api/v1/inventory/").retry(3, 10);
        let req = prepare(&config, &desc);
        let coord = coordinator(&config);
        let settings = coord.settings_for(&desc);
        let mut state = RetryState::new(req.timeout);

        let mut retries = 0;
        loop {
            state.begin_attempt();
            match coord.decide(&req, settings, &network_failure(), &mut state) {
                RetryDecision::RetryAfter { delay, .. } => {
                    assert_eq!(delay, Duration::from_millis(10));
                    retries += 1;
                }
                RetryDecision::GiveUp => break,
            }
            assert!(state.attempt_count() <= settings.max_attempts);
        }
        assert_eq!(retries, 3);
        assert_eq!(state.phase(), AttemptPhase::Failed);
    }

    #[test]
    fn test_mutations_never_retry() {
        let config = PipelineConfig::default();
        let coord = coordinator(&config);
        for desc in [
            RequestDescriptor::post("/api/v1/product/").retry(5, 10),
            RequestDescriptor::put("/api/v1/product/1/").retry(5, 10),
            RequestDescriptor::patch("/api/v1/product/1/").retry(5, 10),
            RequestDescriptor::delete("/api/v1/product/1/").retry(5, 10),
        ] {
            let req = prepare(&config, &desc);
            let mut state = RetryState::new(req.timeout);
            state.begin_attempt();
            assert_eq!(
                coord.decide(&req, coord.settings_for(&desc), &network_failure(), &mut state),
                RetryDecision::GiveUp
            );
        }
    }

    #[test]
    fn test_zero_attempts_gives_up() {
        let config = PipelineConfig::default();
        let coord = coordinator(&config);
        let desc = RequestDescriptor::get("/api/v1/inventory/");
        let req = prepare(&config, &desc);
        let mut state = RetryState::new(req.timeout);
        state.begin_attempt();
        assert_eq!(
            coord.decide(&req, coord.settings_for(&desc), &network_failure(), &mut state),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn test_answered_requests_are_not_retried() {
        let get = Method::GET;
        assert!(!is_retryable(&get, &ClassifiedOutcome::EmbeddedError("x".into()), true));
        let expired = ClassifiedOutcome::SessionExpired {
            code: 50014,
            message: "token expired".into(),
        };
        assert!(!is_retryable(&get, &expired, true));
        assert!(!is_retryable(
            &get,
            &ClassifiedOutcome::StatusError { status: 401, body: None },
            true
        ));
        assert!(!is_retryable(
            &get,
            &ClassifiedOutcome::StatusError { status: 500, body: Some(json!("boom")) },
            true
        ));
        assert!(!is_retryable(
            &get,
            &ClassifiedOutcome::StatusError { status: 503, body: None },
            false
        ));
        assert!(is_retryable(
            &get,
            &ClassifiedOutcome::StatusError { status: 503, body: None },
            true
        ));
        assert!(!is_retryable(
            &get,
            &ClassifiedOutcome::TransportFailure {
                kind: TransportFailureKind::InvalidRequest,
                detail: "bad url".into()
            },
            false
        ));
    }

    #[test]
    fn test_long_transfer_timeout_escalates() {
        let config = PipelineConfig::default();
        let coord = coordinator(&config);
        let desc = RequestDescriptor::get("/api/v1/warehouse/2/backup/").retry(2, 10);
        let req = prepare(&config, &desc);
        let settings = coord.settings_for(&desc);
        let mut state = RetryState::new(req.timeout);

        state.begin_attempt();
        assert_eq!(
            coord.decide(&req, settings, &network_failure(), &mut state),
            RetryDecision::RetryAfter {
                delay: Duration::from_millis(10),
                next_timeout: Duration::from_millis(180_000)
            }
        );
        state.begin_attempt();
        coord.decide(&req, settings, &network_failure(), &mut state);
        assert_eq!(state.current_timeout(), Duration::from_millis(270_000));
    }

    #[test]
    fn test_normal_timeout_is_stable() {
        let config = PipelineConfig::default();
        let coord = coordinator(&config);
        let desc = RequestDescriptor::get("/api/v1/inventory/").retry(1, 10);
        let req = prepare(&config, &desc);
        let mut state = RetryState::new(req.timeout);
        state.begin_attempt();
        coord.decide(&req, coord.settings_for(&desc), &network_failure(), &mut state);
        assert_eq!(state.current_timeout(), Duration::from_millis(60_000));
    }

    #[test]
    fn test_defaults_come_from_config() {
        let mut config = PipelineConfig::default();
        config.retries.default_max_attempts = 2;
        config.retries.default_delay_ms = 250;
        let coord = coordinator(&config);
        assert_eq!(
            coord.settings_for(&RequestDescriptor::get("/x")),
            RetrySettings {
                max_attempts: 2,
                delay_ms: 250
            }
        );
    }
}
