//! Reconnect backoff.
//!
//! The first attempt after a healthy connection drops is immediate. Each
//! consecutive failure doubles the delay, starting at the policy's initial
//! delay and capped at its maximum.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use super::config::ReconnectPolicy;

// ============================================================================
// Backoff
// ============================================================================

/// Consecutive-failure counter for the reconnect loop.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    failures: u32,
}

impl Backoff {
    /// Creates a counter with no recorded failures.
    #[inline]
    #[must_use]
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    /// Consecutive failures since the last reset.
    #[inline]
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Records a failed attempt.
    #[inline]
    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    /// Forgets all failures.
    #[inline]
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Delay before the next attempt.
    #[must_use]
    pub fn delay(&self) -> Duration {
        if self.failures == 0 {
            return Duration::ZERO;
        }

        let shift = (self.failures - 1).min(31);
        self.policy
            .initial
            .checked_mul(1_u32 << shift)
            .map_or(self.policy.max, |delay| delay.min(self.policy.max))
    }
}

// ============================================================================
// Tests
// ============================================================================
