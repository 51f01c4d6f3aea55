//! Per-descriptor retry state machine.
//!
//! # States
//! ```text
//! Pending → InFlight
//! InFlight → Succeeded | Retrying | Failed | Cancelled
//! Retrying → InFlight | Cancelled
//! ```
//!
//! Lives exactly as long as one logical request; discarded when it resolves.

use std::time::Duration;

/// Where a logical request is in its lifeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    Pending,
    InFlight,
    Retrying,
    Succeeded,
    Failed,
    Cancelled,
}

impl AttemptPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AttemptPhase::Succeeded | AttemptPhase::Failed | AttemptPhase::Cancelled
        )
    }
}

/// Attempt bookkeeping for one descriptor across all of its retries.
#[derive(Debug, Clone)]
pub struct RetryState {
    phase: AttemptPhase,
    /// Retries performed so far (0 during the initial attempt).
    attempt_count: u32,
    last_delay_ms: u64,
    current_timeout_ms: u64,
}

impl RetryState {
    pub fn new(initial_timeout: Duration) -> Self {
        Self {
            phase: AttemptPhase::Pending,
            attempt_count: 0,
            last_delay_ms: 0,
            current_timeout_ms: initial_timeout.as_millis() as u64,
        }
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// 1-based number of the current (or last) attempt.
    pub fn attempt_number(&self) -> u32 {
        self.attempt_count + 1
    }

    pub fn last_delay_ms(&self) -> u64 {
        self.last_delay_ms
    }

    /// Deadline for the current attempt.
    pub fn current_timeout(&self) -> Duration {
        Duration::from_millis(self.current_timeout_ms)
    }

    pub fn begin_attempt(&mut self) {
        debug_assert!(
            matches!(self.phase, AttemptPhase::Pending | AttemptPhase::Retrying),
            "attempt started from {:?}",
            self.phase
        );
        self.phase = AttemptPhase::InFlight;
    }

    pub(crate) fn schedule_retry(&mut self, delay_ms: u64, next_timeout: Duration) {
        self.attempt_count += 1;
        self.last_delay_ms = delay_ms;
        self.current_timeout_ms = next_timeout.as_millis() as u64;
        self.phase = AttemptPhase::Retrying;
    }

    pub fn succeed(&mut self) {
        self.phase = AttemptPhase::Succeeded;
    }

    pub fn fail(&mut self) {
        self.phase = AttemptPhase::Failed;
    }

    pub fn cancel(&mut self) {
        self.phase = AttemptPhase::Cancelled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifeline_with_one_retry() {
        let mut state = RetryState::new(Duration::from_millis(500));
        assert_eq!(state.phase(), AttemptPhase::Pending);
        assert_eq!(state.attempt_number(), 1);

        state.begin_attempt();
        assert_eq!(state.phase(), AttemptPhase::InFlight);

        state.schedule_retry(1_000, Duration::from_millis(750));
        assert_eq!(state.phase(), AttemptPhase::Retrying);
        assert_eq!(state.attempt_count(), 1);
        assert_eq!(state.attempt_number(), 2);
        assert_eq!(state.last_delay_ms(), 1_000);
        assert_eq!(state.current_timeout(), Duration::from_millis(750));

        state.begin_attempt();
        state.succeed();
        assert!(state.phase().is_terminal());
    }

    #[test]
    fn test_terminal_phases() {
        assert!(AttemptPhase::Failed.is_terminal());
        assert!(AttemptPhase::Cancelled.is_terminal());
        assert!(!AttemptPhase::Retrying.is_terminal());
        assert!(!AttemptPhase::InFlight.is_terminal());
    }
}
