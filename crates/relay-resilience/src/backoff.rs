//! Exponential backoff between failover attempts.
//!
//! The schedule is deterministic (no jitter): the first delay is `initial`,
//! each following delay is the previous one times `multiplier`, and no delay
//! ever exceeds `max`.

use relay_core::RelayError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Backoff configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay after the first failed attempt
    #[serde(with = "humantime_serde")]
    pub initial: Duration,
    /// Ceiling for any single delay
    #[serde(with = "humantime_serde")]
    pub max: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(16),
            multiplier: 2,
        }
    }
}

impl BackoffConfig {
    /// Start a fresh schedule for one call
    #[must_use]
    pub fn schedule(&self) -> Backoff {
        Backoff::new(*self)
    }
}

/// Per-call backoff state.
///
/// Yields the delay to wait after each failed attempt. The sequence is
/// non-decreasing and never ends; the caller bounds it by attempt count.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    multiplier: u32,
}

impl Backoff {
    /// Create a schedule from a configuration
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            next: config.initial.min(config.max),
            max: config.max,
            multiplier: config.multiplier.max(1),
        }
    }

    /// Delay to wait now, advancing the schedule
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next;
        self.next = current
            .checked_mul(self.multiplier)
            .map_or(self.max, |d| d.min(self.max));
        current
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}

/// Sleep for `delay` unless `cancel` fires first.
///
/// # Errors
/// Returns [`RelayError::Cancelled`] if the token is cancelled before the
/// delay elapses
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<(), RelayError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!(delay_ms = delay.as_millis() as u64, "Backoff interrupted by cancellation");
            Err(RelayError::Cancelled)
        }
        () = tokio::time::sleep(delay) => Ok(()),
    }
}
