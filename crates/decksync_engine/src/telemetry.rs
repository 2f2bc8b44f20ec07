//! Pass telemetry.
//!
//! Everything here is observational: the slow-pass signal and per-pass
//! counters never affect control flow.

use std::time::Duration;

/// Coarse classification of the current network connection.
///
/// Reported by the remote adapter; the slow-pass threshold scales with it so
/// a slow network does not raise false alarms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionClass {
    /// Broadband-quality connection.
    Fast,
    /// Ordinary mobile or congested connection.
    #[default]
    Moderate,
    /// Constrained connection (2G/3G class, captive portals, etc.).
    Slow,
}

/// Per-connection-class duration thresholds for flagging a slow pass.
#[derive(Debug, Clone)]
pub struct SlowPassThresholds {
    /// Threshold on a fast connection.
    pub fast: Duration,
    /// Threshold on a moderate connection.
    pub moderate: Duration,
    /// Threshold on a slow connection.
    pub slow: Duration,
}

impl SlowPassThresholds {
    /// The threshold for a given connection class.
    #[must_use]
    pub fn for_class(&self, class: ConnectionClass) -> Duration {
        match class {
            ConnectionClass::Fast => self.fast,
            ConnectionClass::Moderate => self.moderate,
            ConnectionClass::Slow => self.slow,
        }
    }
}

impl Default for SlowPassThresholds {
    fn default() -> Self {
        Self {
            fast: Duration::from_secs(2),
            moderate: Duration::from_secs(8),
            slow: Duration::from_secs(20),
        }
    }
}

/// Returns true if a pass of the given duration should be flagged slow for
/// the detected connection class.
pub(crate) fn is_slow_pass(
    duration: Duration,
    class: ConnectionClass,
    thresholds: &SlowPassThresholds,
) -> bool {
    duration > thresholds.for_class(class)
}
