//! Exponential backoff for sink reconnection
//!
//! Delays start at `initial`, are multiplied by `factor` after every attempt
//! and never exceed `max`. A successful connection resets the sequence.

use std::time::Duration;

/// Exponential backoff schedule
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    factor: u32,
    max: Duration,
    next: Duration,
}

impl ExponentialBackoff {
    /// Creates a backoff starting at `initial`.
    ///
    /// # Arguments
    /// * `initial` - First delay returned by [`next_delay`](Self::next_delay)
    /// * `factor` - Multiplier applied after every delay (values below 1 are treated as 1)
    /// * `max` - Cap for every delay
    pub fn new(initial: Duration, factor: u32, max: Duration) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            factor: factor.max(1),
            max,
            next: initial,
        }
    }

    /// Returns the delay to wait now and advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next;
        self.next = current.saturating_mul(self.factor).min(self.max);
        current
    }

    /// Restarts the schedule from the initial delay.
    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}
