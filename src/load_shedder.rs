//! Failure-triggered load shedding in front of the upstream search service.
//!
//! The shedder is open once `threshold` consecutive upstream errors have been
//! recorded. While open it denies traffic until `backoff` has elapsed since the
//! most recent error; after that every caller is admitted as a probe until a
//! success closes it or another error restarts the backoff window.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct LoadShedder {
    threshold: u32,
    backoff: Duration,
    state: Mutex<ShedderState>,
}

#[derive(Debug, Default)]
struct ShedderState {
    consecutive_errors: u32,
    last_error_at: Option<Instant>,
    shedding: bool,
}

impl LoadShedder {
    pub fn new(threshold: u32, backoff: Duration) -> Self {
        Self {
            threshold,
            backoff,
            state: Mutex::new(ShedderState::default()),
        }
    }

    /// Record an upstream failure. Returns whether the shedder is open afterwards.
    pub fn record_error(&self) -> bool {
        self.record_error_at(Instant::now())
    }

    pub(crate) fn record_error_at(&self, now: Instant) -> bool {
        let mut state = self.lock();
        state.consecutive_errors = state.consecutive_errors.saturating_add(1);
        state.last_error_at = Some(now);

        if !state.shedding && state.consecutive_errors >= self.threshold {
            state.shedding = true;
            tracing::warn!(
                consecutive_errors = state.consecutive_errors,
                backoff_secs = self.backoff.as_secs(),
                "upstream error threshold reached, shedding load"
            );
        }
        state.shedding
    }

    /// Record an upstream success. Always closes the shedder.
    pub fn record_success(&self) {
        let mut state = self.lock();
        if state.shedding {
            tracing::info!("upstream recovered, load shedding stopped");
        }
        state.consecutive_errors = 0;
        state.shedding = false;
    }

    /// Whether a request should be rejected before reaching the upstream.
    ///
    /// Does not change state: all callers inside the post-backoff window are admitted.
    pub fn should_shed(&self) -> bool {
        self.should_shed_at(Instant::now())
    }

    pub(crate) fn should_shed_at(&self, now: Instant) -> bool {
        let state = self.lock();
        if !state.shedding {
            return false;
        }

        match state.last_error_at {
            Some(last_error) => now.saturating_duration_since(last_error) <= self.backoff,
            None => true,
        }
    }

    pub fn is_shedding(&self) -> bool {
        self.lock().shedding
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.lock().consecutive_errors
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    fn lock(&self) -> MutexGuard<'_, ShedderState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
