//! forge::rate
//!
//! Shared rate-limit budget.
//!
//! # Design
//!
//! One [`RateBudget`] is created per run and shared by every worker through
//! the client. It is refreshed from the rate-limit headers of every API
//! response and consulted before each new request. When the remaining
//! budget drops to the safety margin, all workers pause until the reported
//! reset instant; this is cooperative throttling through a single counter,
//! not per-request locking.
//!
//! The check is a synchronized read-modify-write: [`RateBudget::clearance`]
//! pre-charges one request under the lock so two workers cannot both pass
//! on the last slot. The pre-charge is corrected by the next header refresh.
//!
//! Decisions are pure given a `now` instant, which keeps the pause behavior
//! testable with a simulated clock.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Decision for a worker about to issue a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clearance {
    /// Budget is sufficient; issue the request.
    Proceed,
    /// Budget is exhausted; wait until this instant.
    PauseUntil(DateTime<Utc>),
}

#[derive(Debug, Default)]
struct BudgetState {
    /// Remaining requests, as last reported by the host. `None` until the
    /// first response arrives.
    remaining: Option<u64>,
    /// When the budget replenishes.
    reset_at: Option<DateTime<Utc>>,
}

/// Process-wide rate-limit bookkeeping for one run.
#[derive(Debug)]
pub struct RateBudget {
    state: Mutex<BudgetState>,
    safety_margin: u64,
}

impl RateBudget {
    /// Create a fresh budget. Nothing is known until the first response is
    /// recorded, so initial clearances proceed.
    pub fn new(safety_margin: u64) -> Self {
        Self {
            state: Mutex::new(BudgetState::default()),
            safety_margin,
        }
    }

    /// Refresh the budget from response metadata.
    pub fn record(&self, remaining: u64, reset_at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.remaining = Some(remaining);
        state.reset_at = Some(reset_at);
    }

    /// Decide whether a request may be issued at `now`.
    ///
    /// On `Proceed` one request is pre-charged against the budget. After the
    /// reset instant passes, the stale counter is cleared and requests flow
    /// again (the next response re-synchronizes the true count).
    pub fn clearance(&self, now: DateTime<Utc>) -> Clearance {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(reset_at) = state.reset_at {
            if now >= reset_at {
                state.remaining = None;
                state.reset_at = None;
            }
        }

        match (state.remaining, state.reset_at) {
            (Some(remaining), Some(reset_at)) if remaining <= self.safety_margin => {
                Clearance::PauseUntil(reset_at)
            }
            (Some(remaining), _) => {
                state.remaining = Some(remaining.saturating_sub(1));
                Clearance::Proceed
            }
            _ => Clearance::Proceed,
        }
    }

    /// The reset instant, when one is known.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.reset_at
    }

    /// Wait until the budget clears, sleeping through pauses.
    pub async fn acquire(&self) {
        loop {
            match self.clearance(Utc::now()) {
                Clearance::Proceed => return,
                Clearance::PauseUntil(reset_at) => {
                    let wait = (reset_at - Utc::now())
                        .to_std()
                        .unwrap_or(Duration::from_millis(0))
                        // A small cushion past the reset instant
                        + Duration::from_millis(250);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
