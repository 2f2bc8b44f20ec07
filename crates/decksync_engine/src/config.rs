//! Configuration for the sync engine.

use crate::telemetry::SlowPassThresholds;
use std::time::Duration;

/// Configuration for sync passes.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum records per push batch.
    pub push_batch_size: usize,
    /// Maximum records requested per pull page.
    pub pull_page_size: usize,
    /// Maximum records per backfill batch.
    pub backfill_batch_size: usize,
    /// Wall-clock budget for one pass. Checked between batches, never
    /// mid-batch; an exhausted budget ends the pass as incomplete.
    pub time_budget: Duration,
    /// How long a tripped circuit breaker blocks a collection.
    pub breaker_ttl: Duration,
    /// Age after which a held concurrency lease is treated as abandoned.
    pub lease_timeout: Duration,
    /// Per-connection-class thresholds for the slow-pass signal.
    pub slow_pass: SlowPassThresholds,
}

impl SyncConfig {
    /// Creates a configuration with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            push_batch_size: 50,
            pull_page_size: 100,
            backfill_batch_size: 50,
            time_budget: Duration::from_secs(10),
            breaker_ttl: Duration::from_secs(6 * 60 * 60),
            lease_timeout: Duration::from_secs(90),
            slow_pass: SlowPassThresholds::default(),
        }
    }

    /// Sets the push batch size.
    #[must_use]
    pub fn with_push_batch_size(mut self, size: usize) -> Self {
        self.push_batch_size = size;
        self
    }

    /// Sets the pull page size.
    #[must_use]
    pub fn with_pull_page_size(mut self, size: usize) -> Self {
        self.pull_page_size = size;
        self
    }

    /// Sets the backfill batch size.
    #[must_use]
    pub fn with_backfill_batch_size(mut self, size: usize) -> Self {
        self.backfill_batch_size = size;
        self
    }

    /// Sets the per-pass wall-clock budget.
    #[must_use]
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    /// Sets the circuit-breaker TTL.
    #[must_use]
    pub fn with_breaker_ttl(mut self, ttl: Duration) -> Self {
        self.breaker_ttl = ttl;
        self
    }

    /// Sets the lease-abandon threshold.
    #[must_use]
    pub fn with_lease_timeout(mut self, timeout: Duration) -> Self {
        self.lease_timeout = timeout;
        self
    }

    /// Sets the slow-pass thresholds.
    #[must_use]
    pub fn with_slow_pass(mut self, thresholds: SlowPassThresholds) -> Self {
        self.slow_pass = thresholds;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain() {
        let config = SyncConfig::new()
            .with_push_batch_size(10)
            .with_pull_page_size(25)
            .with_time_budget(Duration::from_secs(3));

        assert_eq!(config.push_batch_size, 10);
        assert_eq!(config.pull_page_size, 25);
        assert_eq!(config.time_budget, Duration::from_secs(3));
    }

    #[test]
    fn defaults_are_sane() {
        let config = SyncConfig::default();
        assert!(config.push_batch_size > 0);
        assert!(config.pull_page_size > 0);
        assert_eq!(config.breaker_ttl, Duration::from_secs(21_600));
    }
}
