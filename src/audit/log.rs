//! Bounded audit ring buffer.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::AuditConfig;
use crate::observability::metrics;

/// What happened to a long-transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// An attempt failed and a retry is scheduled.
    AttemptFailed,
    Completed,
    /// Final give-up; no further attempts.
    Failed,
    Cancelled,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::AttemptFailed => "attempt_failed",
            AuditAction::Completed => "completed",
            AuditAction::Failed => "failed",
            AuditAction::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AuditAction::AttemptFailed)
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    pub action: AuditAction,
    #[serde(default)]
    pub details: Value,
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// FIFO log of operationally significant events, oldest first.
///
/// Appends evict the oldest entry once `capacity` is reached. Entries of
/// concurrent requests interleave by arrival; filter with [`AuditLog::entries_for`].
#[derive(Debug)]
pub struct AuditLog {
    pub(crate) entries: Mutex<VecDeque<AuditEntry>>,
    pub(crate) capacity: usize,
    pub(crate) persist_path: Option<String>,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            persist_path: None,
        }
    }

    /// In-memory log sized from config. Does not read `persist_path`; see `load_from_file`.
    pub fn from_config(config: &AuditConfig) -> Self {
        let mut log = Self::new(config.capacity);
        log.persist_path = config.persist_path.clone();
        log
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an entry stamped with the current time.
    pub fn record(&self, action: AuditAction, request_id: Option<Uuid>, details: Value) -> AuditEntry {
        let entry = AuditEntry {
            timestamp_ms: now_ms(),
            request_id,
            action,
            details,
        };
        self.push(entry.clone());
        entry
    }

    pub(crate) fn push(&self, entry: AuditEntry) {
        if self.capacity == 0 {
            return;
        }
        let len = {
            let mut entries = self.entries.lock().expect("audit log mutex poisoned");
            while entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry);
            entries.len()
        };
        metrics::record_audit_size(len);
    }

    /// Snapshot of every retained entry, oldest first.
    pub fn read_all(&self) -> Vec<AuditEntry> {
        let entries = self.entries.lock().expect("audit log mutex poisoned");
        entries.iter().cloned().collect()
    }

    /// Entries of one logical request, in order.
    pub fn entries_for(&self, request_id: Uuid) -> Vec<AuditEntry> {
        let entries = self.entries.lock().expect("audit log mutex poisoned");
        entries
            .iter()
            .filter(|e| e.request_id == Some(request_id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("audit log mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().expect("audit log mutex poisoned").clear();
        metrics::record_audit_size(0);
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::from_config(&AuditConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ring_buffer_bound() {
        let log = AuditLog::new(50);
        for i in 0..60 {
            log.record(AuditAction::Completed, None, json!({ "seq": i }));
        }
        let all = log.read_all();
        assert_eq!(all.len(), 50);
        let seqs: Vec<i64> = all.iter().map(|e| e.details["seq"].as_i64().unwrap()).collect();
        assert_eq!(seqs, (10..60).collect::<Vec<_>>());
    }

    #[test]
    fn test_read_all_does_not_mutate() {
        let log = AuditLog::new(5);
        log.record(AuditAction::Failed, None, json!({}));
        assert_eq!(log.read_all().len(), 1);
        assert_eq!(log.read_all().len(), 1);
    }

    #[test]
    fn test_entries_for_filters_by_request() {
        let log = AuditLog::new(10);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        log.record(AuditAction::AttemptFailed, Some(a), json!({ "attempt": 1 }));
        log.record(AuditAction::AttemptFailed, Some(b), json!({ "attempt": 1 }));
        log.record(AuditAction::Completed, Some(a), json!({ "attempt": 2 }));

        let for_a = log.entries_for(a);
        assert_eq!(for_a.len(), 2);
        assert_eq!(for_a[0].action, AuditAction::AttemptFailed);
        assert_eq!(for_a[1].action, AuditAction::Completed);
    }

    #[test]
    fn test_clear() {
        let log = AuditLog::new(3);
        log.record(AuditAction::Cancelled, None, Value::Null);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let log = AuditLog::new(0);
        log.record(AuditAction::Completed, None, Value::Null);
        assert!(log.is_empty());
    }

    #[test]
    fn test_action_serializes_snake_case() {
        let entry = AuditEntry {
            timestamp_ms: 1,
            request_id: None,
            action: AuditAction::AttemptFailed,
            details: json!({}),
        };
        let text = serde_json::to_string(&entry).unwrap();
        assert!(text.contains("\"attempt_failed\""));
        assert!(!text.contains("request_id"));
    }
}
