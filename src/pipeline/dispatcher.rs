//! The request pipeline.

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditLog};
use crate::classify::{ClassifiedOutcome, Payload, ResponseClassifier};
use crate::config::PipelineConfig;
use crate::errors::{
    ErrorKind, ErrorTranslator, Notifier, PipelineError, PipelineResult, TracingNotifier, TranslatedError,
};
use crate::http::request::{PreparedRequest, RequestDescriptor};
use crate::http::{ReqwestTransport, RequestDecorator, Transport};
use crate::observability::metrics;
use crate::resilience::{
    with_deadline, CancelSignal, InFlightRegistry, RetryCoordinator, RetryDecision, RetryState,
};
use crate::session::{extract_token, TokenStore};

/// Config-derived stages. Rebuilt on reload; a running request keeps the set it started with.
#[derive(Debug)]
struct Stages {
    decorator: RequestDecorator,
    classifier: ResponseClassifier,
    retries: RetryCoordinator,
    translator: ErrorTranslator,
}

impl Stages {
    fn from_config(config: &PipelineConfig) -> Self {
        Self {
            decorator: RequestDecorator::new(config),
            classifier: ResponseClassifier::new(&config.classifier),
            retries: RetryCoordinator::new(&config.retries, &config.long_transfer),
            translator: ErrorTranslator::new(&config.errors),
        }
    }
}

/// Shared entry point every API call funnels through.
///
/// `Send + Sync`; share it behind an `Arc`. Each `dispatch` runs one
/// descriptor's attempts strictly in sequence, while separate dispatches run
/// concurrently.
pub struct Pipeline {
    config: ArcSwap<PipelineConfig>,
    stages: ArcSwap<Stages>,
    session: Arc<TokenStore>,
    transport: Arc<dyn Transport>,
    audit: Arc<AuditLog>,
    notifier: Arc<dyn Notifier>,
    in_flight: InFlightRegistry,
}

impl Pipeline {
    /// Build over `transport`, restoring the persisted audit log if configured.
    pub fn new(config: PipelineConfig, transport: Arc<dyn Transport>, session: Arc<TokenStore>) -> Self {
        let audit = Arc::new(match &config.audit.persist_path {
            Some(path) => AuditLog::load_from_file(path, config.audit.capacity),
            None => AuditLog::from_config(&config.audit),
        });
        Self {
            stages: ArcSwap::from_pointee(Stages::from_config(&config)),
            config: ArcSwap::from_pointee(config),
            session,
            transport,
            audit,
            notifier: Arc::new(TracingNotifier),
            in_flight: InFlightRegistry::new(),
        }
    }

    /// Build with the reqwest transport.
    pub fn from_config(config: PipelineConfig, session: Arc<TokenStore>) -> PipelineResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.transport)?);
        Ok(Self::new(config, transport, session))
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn session(&self) -> &Arc<TokenStore> {
        &self.session
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub fn config(&self) -> Arc<PipelineConfig> {
        self.config.load_full()
    }

    /// Number of dispatches currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Swap in a new configuration for requests dispatched from now on.
    pub fn reload_config(&self, config: PipelineConfig) {
        let current = self.config.load();
        if current.transport != config.transport {
            tracing::warn!("Transport settings changed; they take effect on restart");
        }
        if current.audit != config.audit {
            tracing::warn!("Audit settings changed; they take effect on restart");
        }
        self.stages.store(Arc::new(Stages::from_config(&config)));
        self.config.store(Arc::new(config));
        tracing::info!("Pipeline configuration reloaded");
    }

    /// Apply every configuration the watcher delivers until the channel closes.
    pub fn watch_config(self: &Arc<Self>, mut updates: mpsc::UnboundedReceiver<PipelineConfig>) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(config) = updates.recv().await {
                pipeline.reload_config(config);
            }
        })
    }

    /// Cancel a running dispatch. Returns false if `id` is not in flight.
    pub fn cancel(&self, id: Uuid) -> bool {
        let found = self.in_flight.cancel(&id);
        if found {
            tracing::info!(request_id = %id, "Cancellation requested");
        }
        found
    }

    /// End the session: drop the token and the session's audit trail.
    pub async fn logout(&self) {
        self.session.logout();
        self.audit.clear();
        self.persist_audit().await;
    }

    /// Dispatch a login request and install the token it returns.
    pub async fn login(&self, descriptor: RequestDescriptor) -> PipelineResult<String> {
        let payload = self.dispatch(descriptor).await?;
        let token = payload.as_json().and_then(extract_token).ok_or_else(|| {
            TranslatedError::new(ErrorKind::Embedded, "login response did not contain a token")
        })?;
        self.session.login(token.clone());
        Ok(token)
    }

    pub async fn dispatch(&self, descriptor: RequestDescriptor) -> PipelineResult<Payload> {
        self.dispatch_with_cancel(descriptor, CancelSignal::new()).await
    }

    /// Dispatch with a caller-held cancellation signal.
    ///
    /// Cancelling stops the in-flight attempt and any pending retry delay and
    /// resolves with [`PipelineError::Cancelled`].
    pub async fn dispatch_with_cancel(
        &self,
        descriptor: RequestDescriptor,
        cancel: CancelSignal,
    ) -> PipelineResult<Payload> {
        if let Some(previous) = descriptor.supersedes {
            if self.in_flight.cancel(&previous) {
                tracing::debug!(request_id = %descriptor.id, superseded = %previous, "Superseding request");
            }
        }

        let _guard = self.in_flight.register(descriptor.id, cancel.clone());
        let stages = self.stages.load_full();
        let start = Instant::now();

        let result = self.run(&stages, &descriptor, &cancel).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(PipelineError::Cancelled(_)) => "cancelled",
            Err(_) => "failed",
        };
        metrics::record_request(descriptor.method.as_str(), outcome, start);
        result
    }

    async fn run(
        &self,
        stages: &Stages,
        descriptor: &RequestDescriptor,
        cancel: &CancelSignal,
    ) -> PipelineResult<Payload> {
        let settings = stages.retries.settings_for(descriptor);
        let mut prepared = self.prepare(stages, descriptor);
        let audited = prepared.operation_class.is_long_transfer();
        let mut state = RetryState::new(prepared.timeout);

        tracing::info!(
            request_id = %prepared.id,
            method = %prepared.method,
            url = %prepared.url,
            long_transfer = audited,
            timeout_ms = prepared.timeout.as_millis() as u64,
            "Dispatching request"
        );
        if let Some(body) = &prepared.body {
            tracing::debug!(request_id = %prepared.id, body = %body.summary(), "Request body");
        }

        loop {
            if cancel.is_cancelled() {
                let started = state.attempt_count();
                return Err(self.cancelled(&prepared, &mut state, started, audited).await);
            }

            state.begin_attempt();
            prepared.timeout = state.current_timeout();

            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = with_deadline(prepared.timeout, self.transport.send(&prepared)) => Some(result),
            };
            let Some(result) = attempt else {
                let started = state.attempt_number();
                return Err(self.cancelled(&prepared, &mut state, started, audited).await);
            };

            let outcome = match result {
                Ok(envelope) => stages.classifier.classify(&envelope, prepared.response_kind),
                Err(e) => ClassifiedOutcome::from(e),
            };

            let outcome = match outcome.into_result() {
                Ok(payload) => {
                    state.succeed();
                    if audited {
                        self.record_audit(
                            AuditAction::Completed,
                            &prepared,
                            json!({ "attempt": state.attempt_number() }),
                        ).await;
                    }
                    tracing::info!(
                        request_id = %prepared.id,
                        attempts = state.attempt_number(),
                        "Request completed"
                    );
                    return Ok(payload);
                }
                Err(outcome) => outcome,
            };

            match stages.retries.decide(&prepared, settings, &outcome, &mut state) {
                RetryDecision::RetryAfter { delay, next_timeout } => {
                    metrics::record_retry(prepared.method.as_str());
                    if audited {
                        self.record_audit(
                            AuditAction::AttemptFailed,
                            &prepared,
                            json!({
                                "attempt": state.attempt_count(),
                                "outcome": outcome.label(),
                                "error": outcome.detail(),
                                "next_delay_ms": delay.as_millis() as u64,
                                "next_timeout_ms": next_timeout.as_millis() as u64,
                            }),
                        ).await;
                    }

                    let waited = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => false,
                        _ = tokio::time::sleep(delay) => true,
                    };
                    if !waited {
                        let started = state.attempt_count();
                        return Err(self.cancelled(&prepared, &mut state, started, audited).await);
                    }

                    // Fresh token snapshot for the next attempt.
                    prepared = self.prepare(stages, descriptor);
                }
                RetryDecision::GiveUp => {
                    let error = stages
                        .translator
                        .translate(&outcome, &prepared, &descriptor.message_overrides, &self.session)
                        .unwrap_or_else(|| TranslatedError::new(ErrorKind::Status, "request failed"));

                    if audited {
                        self.record_audit(
                            AuditAction::Failed,
                            &prepared,
                            json!({
                                "attempt": state.attempt_number(),
                                "outcome": outcome.label(),
                                "kind": error.kind,
                                "status": error.status,
                                "message": error.message,
                            }),
                        ).await;
                    }
                    tracing::warn!(
                        request_id = %prepared.id,
                        method = %prepared.method,
                        url = %prepared.url,
                        attempts = state.attempt_number(),
                        outcome = outcome.label(),
                        error = %error.message,
                        "Request failed"
                    );
                    if descriptor.notify_on_error {
                        self.notifier.notify(&error);
                    }
                    return Err(PipelineError::Request(error));
                }
            }
        }
    }

    fn prepare(&self, stages: &Stages, descriptor: &RequestDescriptor) -> PreparedRequest {
        let token = self.session.snapshot();
        stages
            .decorator
            .decorate(descriptor, token.as_deref().map(String::as_str))
    }

    async fn cancelled(
        &self,
        prepared: &PreparedRequest,
        state: &mut RetryState,
        attempts_started: u32,
        audited: bool,
    ) -> PipelineError {
        state.cancel();
        if audited {
            self.record_audit(
                AuditAction::Cancelled,
                prepared,
                json!({ "attempts_started": attempts_started }),
            ).await;
        }
        tracing::info!(request_id = %prepared.id, attempts_started, "Request cancelled");
        PipelineError::Cancelled(prepared.id)
    }

    async fn record_audit(&self, action: AuditAction, prepared: &PreparedRequest, extra: Value) {
        let mut details = json!({
            "method": prepared.method.as_str(),
            "url": prepared.url,
            "timeout_ms": prepared.timeout.as_millis() as u64,
        });
        if let (Some(details), Value::Object(extra)) = (details.as_object_mut(), extra) {
            details.extend(extra);
        }
        self.audit.record(action, Some(prepared.id), details);
        if action.is_terminal() {
            self.persist_audit().await;
        }
    }

    async fn persist_audit(&self) {
        if self.audit.persist_path().is_none() {
            return;
        }
        let audit = Arc::clone(&self.audit);
        match tokio::task::spawn_blocking(move || audit.save_to_file()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to persist audit log"),
            Err(e) => tracing::warn!(error = %e, "Audit persistence task failed"),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("session", &self.session)
            .field("in_flight", &self.in_flight.len())
            .field("audit_entries", &self.audit.len())
            .finish()
    }
}
