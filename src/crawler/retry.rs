//! Bounded retry with exponential backoff
//!
//! The policy is a plain value and the per-request state a small state
//! machine, so the schedule can be exercised without any network I/O.

use crate::state::FailureKind;
use std::time::Duration;

/// How many times a page is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(60),
        }
    }

    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after `attempt` (1-based) has failed
    ///
    /// `base_delay * 2^(attempt - 1)`, capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Starts tracking a new request; the first attempt is in flight
    pub fn start(&self) -> RetryState {
        RetryState {
            policy: *self,
            attempt: 1,
        }
    }
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then make attempt number `attempt`
    Retry { attempt: u32, delay: Duration },
    /// The failure is final
    GiveUp,
}

/// Attempt counter for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
}

impl RetryState {
    /// The attempt currently in flight (1-based)
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Records a failure and decides whether to try again
    ///
    /// Only transient failures are retried, and never beyond the policy's
    /// attempt budget.
    pub fn on_failure(&mut self, failure: &FailureKind) -> RetryDecision {
        if !failure.is_transient() || self.attempt >= self.policy.max_attempts {
            return RetryDecision::GiveUp;
        }

        let delay = self.policy.delay_after(self.attempt);
        self.attempt += 1;
        RetryDecision::Retry {
            attempt: self.attempt,
            delay,
        }
    }
}
