//! Periodic scan scheduling.
//!
//! One timer per watcher instance: a fixed period plus a bounded uniform
//! random jitter, so a fleet of watchers against the same registry does
//! not fire in lockstep.

use std::time::Duration;

use rand::Rng as _;

/// Scan cadence of a watcher instance.
#[derive(Debug, Clone, Copy)]
pub struct ScanSchedule {
    period: Duration,
    jitter: Duration,
}

impl ScanSchedule {
    /// Creates a schedule from period and jitter bound.
    #[must_use]
    pub const fn new(period: Duration, jitter: Duration) -> Self {
        Self { period, jitter }
    }

    /// Builds the schedule from configured seconds.
    #[must_use]
    pub const fn from_seconds(interval: u64, jitter: u64) -> Self {
        Self::new(Duration::from_secs(interval), Duration::from_secs(jitter))
    }

    /// Returns the configured period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Computes the delay until the next scan: the period plus a random
    /// jitter in `[0, jitter]`.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.period;
        }
        let extra = rand::thread_rng().gen_range(0..=jitter_ms);
        self.period + Duration::from_millis(extra)
    }
}
