//! Records exchanged between the engine components

use serde::Serialize;
use std::time::Instant;

/// Result of one completed invocation of the benchmarked operation
#[derive(Debug, Clone, Copy)]
pub struct OutcomeRecord {
    pub timestamp: Instant,
    pub success: bool,
}

impl OutcomeRecord {
    /// Create a record stamped with the current instant
    #[inline]
    pub fn now(success: bool) -> Self {
        Self {
            timestamp: Instant::now(),
            success,
        }
    }
}

/// Counts accumulated over exactly one window
///
/// `total_count` always equals `success_count + failure_count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub success_count: i64,
    pub failure_count: i64,
    pub total_count: i64,
}

impl Snapshot {
    pub fn new(success_count: i64, failure_count: i64) -> Self {
        Self {
            success_count,
            failure_count,
            total_count: success_count + failure_count,
        }
    }

    /// Success share of the window in percent (100.0 for an empty window)
    pub fn success_rate(&self) -> f64 {
        if self.total_count == 0 {
            return 100.0;
        }
        (self.success_count as f64 / self.total_count as f64) * 100.0
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "success={} failure={} total={}",
            self.success_count, self.failure_count, self.total_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_total_is_sum() {
        let snapshot = Snapshot::new(7, 3);
        assert_eq!(snapshot.total_count, 10);
        assert_eq!(snapshot.success_rate(), 70.0);
    }

    #[test]
    fn test_empty_snapshot_rate() {
        assert_eq!(Snapshot::default().success_rate(), 100.0);
    }

    #[test]
    fn test_snapshot_display() {
        assert_eq!(
            Snapshot::new(2, 1).to_string(),
            "success=2 failure=1 total=3"
        );
    }
}
