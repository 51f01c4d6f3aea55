//! Caller-driven cancellation.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;
use uuid::Uuid;

/// A one-shot cancellation flag shared between a caller and a dispatch.
///
/// Cancelling wakes both the in-flight transport call and any pending retry timer.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    fn same_signal(&self, other: &CancelSignal) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// In-flight dispatches by request ID.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    inner: DashMap<Uuid, CancelSignal>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `id` until the returned guard drops.
    pub fn register(&self, id: Uuid, signal: CancelSignal) -> InFlightGuard<'_> {
        self.inner.insert(id, signal.clone());
        InFlightGuard {
            registry: self,
            id,
            signal,
        }
    }

    /// Cancel an in-flight request. Returns false if it is not running.
    pub fn cancel(&self, id: &Uuid) -> bool {
        match self.inner.get(id) {
            Some(entry) => {
                entry.value().cancel();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.inner.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// RAII registration of one dispatch.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    registry: &'a InFlightRegistry,
    id: Uuid,
    signal: CancelSignal,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        // A later dispatch may have reused the ID; only remove our own entry.
        self.registry
            .inner
            .remove_if(&self.id, |_, signal| signal.same_signal(&self.signal));
    }
}
