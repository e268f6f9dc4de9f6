//! Reconnect backoff policy.
//!
//! The delay before reconnect attempt `n` (counting from 0) is
//! `min(base * 2^n + jitter, max)`, with `jitter` drawn uniformly from
//! `[0, max_jitter)`. Jitter spreads out clients that lost the same
//! server at the same moment.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// How a [`ResilientConnection`](crate::ResilientConnection) retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first retry, before jitter. Default: 50 ms.
    pub base_delay: Duration,
    /// Hard cap on any single delay, jitter included. Default: 3 s.
    pub max_delay: Duration,
    /// Upper bound (exclusive) of the random jitter. Default: 100 ms.
    pub max_jitter: Duration,
    /// Attempts allowed since the last successful open. Default: 10.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(3_000),
            max_jitter: Duration::from_millis(100),
            max_attempts: 10,
        }
    }
}

impl ReconnectConfig {
    /// Fix values that would make the formula meaningless.
    ///
    /// Called automatically when a connection is spawned. `max_delay` is
    /// raised to `base_delay` if it is smaller.
    pub fn validated(mut self) -> Self {
        if self.max_delay < self.base_delay {
            warn!(
                base_ms = self.base_delay.as_millis() as u64,
                max_ms = self.max_delay.as_millis() as u64,
                "max_delay below base_delay, raising it"
            );
            self.max_delay = self.base_delay;
        }
        self
    }

    /// Whether `attempt` retries have used up the budget.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    /// The backoff formula with an explicit jitter value.
    pub fn delay_for(&self, attempt: u32, jitter: Duration) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let exponential = self.base_delay.saturating_mul(factor);
        exponential.saturating_add(jitter).min(self.max_delay)
    }

    /// The delay before retry `attempt`, with random jitter.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            let micros = self.max_jitter.as_micros().min(u64::MAX as u128) as u64;
            Duration::from_micros(rand::rng().random_range(0..micros))
        };
        self.delay_for(attempt, jitter)
    }
}
