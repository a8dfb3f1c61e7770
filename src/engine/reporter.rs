//! Forwarding of snapshots to the metrics sink

use crate::metrics::MetricsSink;
use crate::outcome::Snapshot;

use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReporterStats {
    pub reported: u64,
    pub sink_failures: u64,
}

/// Delivers each snapshot to the sink, in arrival order
pub struct Reporter {
    sink: Arc<dyn MetricsSink>,
    log_snapshots: bool,
}

impl Reporter {
    pub fn new(sink: Arc<dyn MetricsSink>, log_snapshots: bool) -> Self {
        Self {
            sink,
            log_snapshots,
        }
    }

    /// Runs until the snapshot channel is closed and drained
    pub async fn run(self, mut snapshots: mpsc::Receiver<Snapshot>) -> ReporterStats {
        let mut stats = ReporterStats::default();

        while let Some(snapshot) = snapshots.recv().await {
            if self.log_snapshots {
                info!(
                    success_tps = snapshot.success_count,
                    failure_tps = snapshot.failure_count,
                    total_tps = snapshot.total_count,
                    "throughput"
                );
            }

            stats.reported += 1;
            let sink = &self.sink;
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                sink.report(
                    snapshot.success_count,
                    snapshot.failure_count,
                    snapshot.total_count,
                )
            }));

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    stats.sink_failures += 1;
                    warn!("Failed to report window ({}): {}", snapshot, e);
                }
                Err(_) => {
                    stats.sink_failures += 1;
                    warn!("Metrics sink panicked while reporting window ({})", snapshot);
                }
            }
        }

        debug!(
            "Reporter finished: {} windows reported, {} sink failures",
            stats.reported, stats.sink_failures
        );
        stats
    }
}
