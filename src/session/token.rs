//! Process-wide auth token holder.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::observability::metrics;

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Refreshed,
    LoggedOut,
    /// The server rejected the token; the UI must re-authenticate.
    Invalidated { reason: String },
}

/// Holder of the current auth token.
///
/// Reads are lock-free snapshots; writes replace the whole token atomically,
/// so a concurrent decoration pass sees either a complete token or none.
pub struct TokenStore {
    token: ArcSwapOption<String>,
    events: broadcast::Sender<SessionEvent>,
}

impl TokenStore {
    /// Create an unauthenticated store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            token: ArcSwapOption::empty(),
            events,
        }
    }

    /// Create a store that already holds a token.
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.store(token.into());
        store
    }

    /// Point-in-time view of the token.
    pub fn snapshot(&self) -> Option<Arc<String>> {
        self.token.load_full()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.load().is_some()
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Install the token obtained from a login.
    pub fn login(&self, token: impl Into<String>) {
        self.store(token.into());
        tracing::info!("Session established");
        self.emit(SessionEvent::LoggedIn);
    }

    /// Replace the token mid-session (e.g. after a refresh).
    pub fn refresh(&self, token: impl Into<String>) {
        self.store(token.into());
        tracing::debug!("Session token refreshed");
        self.emit(SessionEvent::Refreshed);
    }

    /// End the session at the user's request.
    pub fn logout(&self) {
        self.token.store(None);
        tracing::info!("Session ended");
        self.emit(SessionEvent::LoggedOut);
    }

    /// Drop the token because the server no longer accepts it.
    pub fn invalidate(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.token.store(None);
        metrics::record_session_invalidated();
        tracing::warn!(reason = %reason, "Session invalidated, re-authentication required");
        self.emit(SessionEvent::Invalidated { reason });
    }

    fn store(&self, token: String) {
        // An empty token would produce a bare `Bearer ` header.
        if token.is_empty() {
            self.token.store(None);
        } else {
            self.token.store(Some(Arc::new(token)));
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

/// Pull the access token out of a login response.
///
/// Accepts `{"token"}`, `{"data": {"token"}}` and `{"data": {"access_token"}}`.
pub fn extract_token(response: &Value) -> Option<String> {
    let candidates = [
        response.get("token"),
        response.pointer("/data/token"),
        response.pointer("/data/access_token"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}
