//! # Fibonacci Backoff
//!
//! Retry delays for failed reconciliations. The delay grows along the
//! Fibonacci sequence, which is gentler than exponential backoff while still
//! backing off from a persistently failing API server.
//!
//! Sequence with the defaults: 5s, 5s, 10s, 15s, 25s, 40s, ... capped at 300s.

use crate::store::ObjectKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// First retry delay after a failed reconciliation
pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_secs(5);

/// Longest retry delay
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at the maximum.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff in seconds (for reset)
    min_seconds: u64,
    /// Previous backoff in seconds
    prev_seconds: u64,
    /// Current backoff in seconds
    current_seconds: u64,
    /// Maximum backoff in seconds
    max_seconds: u64,
}

impl FibonacciBackoff {
    /// Create a backoff starting at `min` and capped at `max`.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        let min_seconds = min.as_secs().max(1);
        Self {
            min_seconds,
            prev_seconds: 0,
            current_seconds: min_seconds,
            max_seconds: max.as_secs().max(min_seconds),
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_seconds;

        let next_seconds = self.prev_seconds + self.current_seconds;
        self.prev_seconds = self.current_seconds;
        self.current_seconds = std::cmp::min(next_seconds, self.max_seconds);

        Duration::from_secs(result)
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_seconds = 0;
        self.current_seconds = self.min_seconds;
    }
}

/// Backoff sequence of one key and when it last failed
#[derive(Debug, Clone)]
struct KeyBackoff {
    sequence: FibonacciBackoff,
    last_failure: Instant,
}

/// Per-Application backoff state, shared between reconcile and error policy.
///
/// The controller never reconciles an object that has left its cache, so a
/// key that failed and was then deleted is never reset. Entries without a
/// failure for twice the maximum delay are dropped instead; a key that keeps
/// failing is retried well within that window.
#[derive(Debug, Clone)]
pub struct ErrorBackoff {
    min: Duration,
    max: Duration,
    /// namespace/name -> backoff sequence
    states: Arc<Mutex<HashMap<ObjectKey, KeyBackoff>>>,
}

impl Default for ErrorBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BACKOFF, DEFAULT_MAX_BACKOFF)
    }
}

impl ErrorBackoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Delay before retrying `key` after another failure
    pub fn next_delay(&self, key: &ObjectKey) -> Duration {
        self.next_delay_at(key, Instant::now())
    }

    fn next_delay_at(&self, key: &ObjectKey, now: Instant) -> Duration {
        let mut states = match self.states.lock() {
            Ok(states) => states,
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using minimum backoff", e);
                return self.min;
            }
        };

        let idle_expiry = self.max * 2;
        let before = states.len();
        states.retain(|_, state| now.saturating_duration_since(state.last_failure) <= idle_expiry);
        if states.len() < before {
            debug!("Dropped {} idle backoff entries", before - states.len());
        }

        let state = states.entry(key.clone()).or_insert_with(|| KeyBackoff {
            sequence: FibonacciBackoff::new(self.min, self.max),
            last_failure: now,
        });
        state.last_failure = now;
        state.sequence.next_backoff()
    }

    /// Forget the failure history of `key` (on successful reconciliation)
    pub fn reset(&self, key: &ObjectKey) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(key);
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.states.lock().map(|states| states.len()).unwrap_or_default()
    }
}
