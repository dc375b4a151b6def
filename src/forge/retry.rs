//! forge::retry
//!
//! Bounded exponential backoff, expressed as an explicit state machine
//! (attempt count, next delay) rather than implicit recursion.

use std::time::Duration;

/// Backoff schedule for retrying a single request.
///
/// `max_attempts` counts the first attempt: a value of 3 allows the initial
/// request plus two retries. The delay doubles after each failure.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    max_attempts: u32,
    next_delay: Duration,
}

impl Backoff {
    /// Create a schedule with the given bound and base delay.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            next_delay: base_delay,
        }
    }

    /// Record a failed attempt.
    ///
    /// Returns the delay to wait before the next attempt, or `None` when
    /// the bound is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }
        let delay = self.next_delay;
        self.next_delay = self.next_delay.saturating_mul(2);
        Some(delay)
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}
