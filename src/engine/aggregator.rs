//! Per-window classification of outcome records

use crate::outcome::{OutcomeRecord, Snapshot};

use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Success/failure/total counts of the current window
///
/// `take` swaps the class counters to zero and subtracts what it took from
/// the running total, so an increment racing the swap is carried into the
/// next window instead of being lost, and every snapshot satisfies
/// `total == success + failure`.
#[derive(Debug, Default)]
pub(crate) struct WindowCounters {
    success: AtomicI64,
    failure: AtomicI64,
    total: AtomicI64,
}

impl WindowCounters {
    pub(crate) fn record(&self, success: bool) {
        if success {
            self.success.fetch_add(1, Ordering::AcqRel);
        } else {
            self.failure.fetch_add(1, Ordering::AcqRel);
        }
        self.total.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn take(&self) -> Snapshot {
        let success = self.success.swap(0, Ordering::AcqRel);
        let failure = self.failure.swap(0, Ordering::AcqRel);
        self.total.fetch_sub(success + failure, Ordering::AcqRel);
        Snapshot::new(success, failure)
    }

    /// Records counted since the last `take`
    pub(crate) fn pending(&self) -> i64 {
        self.total.load(Ordering::Acquire)
    }
}

/// What the aggregator did with the records it received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregatorStats {
    /// Snapshots handed to the reporter
    pub emitted: u64,
    /// Published records that never reached an emitted snapshot
    pub discarded: u64,
}

/// Tallies outcome records and emits one snapshot per window
pub struct Aggregator {
    window: Duration,
    counters: WindowCounters,
}

impl Aggregator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            counters: WindowCounters::default(),
        }
    }

    /// Selection loop
    ///
    /// Stops on cancellation, when every outcome sender is gone, or when the
    /// snapshot consumer has hung up. Counts of the unfinished window, and
    /// records still queued when it stops, are discarded and counted.
    pub async fn run(
        self,
        cancel: CancellationToken,
        mut outcomes: mpsc::Receiver<OutcomeRecord>,
        snapshots: mpsc::Sender<Snapshot>,
    ) -> AggregatorStats {
        let mut ticker = interval_at(Instant::now() + self.window, self.window);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = AggregatorStats::default();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Aggregator cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let snapshot = self.counters.take();
                    let delivered = tokio::select! {
                        sent = snapshots.send(snapshot) => sent.is_ok(),
                        _ = cancel.cancelled() => false,
                    };
                    if !delivered {
                        stats.discarded += snapshot.total_count as u64;
                        debug!("Snapshot not delivered, aggregator stopping");
                        break;
                    }
                    stats.emitted += 1;
                }
                record = outcomes.recv() => match record {
                    Some(record) => self.counters.record(record.success),
                    None => {
                        debug!("Outcome channel closed");
                        break;
                    }
                },
            }
        }

        // Late publishers see a closed channel from here on
        outcomes.close();
        let mut queued = 0u64;
        while outcomes.try_recv().is_ok() {
            queued += 1;
        }
        let pending = self.counters.pending() as u64;
        stats.discarded += pending + queued;

        debug!(
            "Aggregator stopped after {} snapshots ({} records in the unfinished window, {} still queued)",
            stats.emitted, pending, queued
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_take_resets_and_sums() {
        let counters = WindowCounters::default();
        for i in 0..10 {
            counters.record(i % 4 != 0);
        }
        let snapshot = counters.take();
        assert_eq!(snapshot, Snapshot::new(7, 3));
        assert_eq!(counters.pending(), 0);
        assert_eq!(counters.take(), Snapshot::default());
    }

    #[test]
    fn test_concurrent_increments_are_conserved() {
        let counters = Arc::new(WindowCounters::default());
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for i in 0..10_000 {
                        counters.record((i + w) % 3 != 0);
                    }
                })
            })
            .collect();

        let mut taken = Vec::new();
        while writers.iter().any(|w| !w.is_finished()) {
            taken.push(counters.take());
        }
        for writer in writers {
            writer.join().unwrap();
        }
        taken.push(counters.take());

        for snapshot in &taken {
            assert_eq!(
                snapshot.total_count,
                snapshot.success_count + snapshot.failure_count
            );
        }
        let total: i64 = taken.iter().map(|s| s.total_count).sum();
        assert_eq!(total, 40_000);
        assert_eq!(counters.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_are_conserved_across_windows() {
        let (outcome_tx, outcome_rx) = mpsc::channel(64);
        let (snapshot_tx, mut snapshot_rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let window = Duration::from_millis(100);

        let handle = tokio::spawn(Aggregator::new(window).run(
            cancel.clone(),
            outcome_rx,
            snapshot_tx,
        ));

        // 3 windows, 7 records per window, every 4th a failure
        let mut sent = 0;
        for window_index in 0..3 {
            tokio::time::sleep(Duration::from_millis(if window_index == 0 { 10 } else { 30 }))
                .await;
            for _ in 0..7 {
                outcome_tx
                    .send(OutcomeRecord::now(sent % 4 != 3))
                    .await
                    .unwrap();
                sent += 1;
            }
            tokio::time::sleep(Duration::from_millis(70)).await;
        }

        // Let the third tick fire, then stop before a fourth
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        let stats = handle.await.unwrap();
        assert_eq!(stats.emitted, 3);
        assert_eq!(stats.discarded, 0);

        let mut snapshots = Vec::new();
        while let Ok(snapshot) = snapshot_rx.try_recv() {
            snapshots.push(snapshot);
        }
        assert_eq!(snapshots.len(), 3);
        for snapshot in &snapshots {
            assert_eq!(snapshot.total_count, 7);
        }
        let failures: i64 = snapshots.iter().map(|s| s.failure_count).sum();
        let total: i64 = snapshots.iter().map(|s| s.total_count).sum();
        assert_eq!(total, sent);
        assert_eq!(failures, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_outcome_senders_are_gone() {
        let (outcome_tx, outcome_rx) = mpsc::channel::<OutcomeRecord>(1);
        let (snapshot_tx, _snapshot_rx) = mpsc::channel(1);
        drop(outcome_tx);
        let stats = Aggregator::new(Duration::from_secs(1))
            .run(CancellationToken::new(), outcome_rx, snapshot_tx)
            .await;
        assert_eq!(stats, AggregatorStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unfinished_window_is_counted_as_discarded() {
        let (outcome_tx, outcome_rx) = mpsc::channel(64);
        let (snapshot_tx, mut snapshot_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(Aggregator::new(Duration::from_millis(100)).run(
            cancel.clone(),
            outcome_rx,
            snapshot_tx,
        ));

        for _ in 0..4 {
            outcome_tx.send(OutcomeRecord::now(true)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
        for _ in 0..3 {
            outcome_tx.send(OutcomeRecord::now(false)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        cancel.cancel();
        let stats = handle.await.unwrap();
        assert_eq!(stats.emitted, 1);
        assert_eq!(stats.discarded, 3);
        assert_eq!(snapshot_rx.recv().await, Some(Snapshot::new(4, 0)));

        // The receiver is closed once the aggregator has stopped
        assert!(outcome_tx.send(OutcomeRecord::now(true)).await.is_err());
    }
}
