//! Bounded-concurrency request dispatcher

use crate::constants::DEBUG_LOG_INTERVAL;
use crate::engine::budget::{BudgetSlot, ConcurrencyBudget};
use crate::operation::Operation;
use crate::outcome::OutcomeRecord;

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Publication counters shared by all work units
#[derive(Debug, Default)]
pub struct DispatchStats {
    published: AtomicU64,
    abandoned: AtomicU64,
}

impl DispatchStats {
    /// Records handed to the outcome channel
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Records dropped because cancellation won the publish race or the
    /// aggregator had already stopped
    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }
}

/// Launches work units up to the budget's capacity until cancelled
pub struct Dispatcher {
    operation: Arc<dyn Operation>,
    budget: ConcurrencyBudget,
    tracker: TaskTracker,
    invocation_timeout: Option<Duration>,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    pub fn new(
        operation: Arc<dyn Operation>,
        budget: ConcurrencyBudget,
        tracker: TaskTracker,
        invocation_timeout: Option<Duration>,
    ) -> Self {
        Self {
            operation,
            budget,
            tracker,
            invocation_timeout,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Acquisition loop; returns the number of units launched
    ///
    /// Returns as soon as cancellation is observed without waiting for the
    /// units already in flight.
    pub async fn run(
        self,
        cancel: CancellationToken,
        outcomes: mpsc::Sender<OutcomeRecord>,
    ) -> u64 {
        info!(
            "Dispatching {} with up to {} concurrent invocations",
            self.operation.name(),
            self.budget.capacity()
        );

        let mut launched = 0u64;
        loop {
            let slot = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                slot = self.budget.acquire() => match slot {
                    Some(slot) => slot,
                    None => break,
                },
            };

            self.tracker.spawn(run_unit(
                slot,
                Arc::clone(&self.operation),
                self.invocation_timeout,
                outcomes.clone(),
                cancel.clone(),
                Arc::clone(&self.stats),
            ));

            launched += 1;
            if launched % DEBUG_LOG_INTERVAL == 0 {
                debug!("Dispatcher launched {} units", launched);
            }
        }

        debug!(
            "Dispatcher stopped after launching {} units ({} still in flight)",
            launched,
            self.budget.in_flight()
        );
        launched
    }
}

/// One work unit: invoke, publish, release
///
/// The slot is held for the whole unit and released when it goes out of
/// scope, whichever way the unit ends.
async fn run_unit(
    slot: BudgetSlot,
    operation: Arc<dyn Operation>,
    invocation_timeout: Option<Duration>,
    outcomes: mpsc::Sender<OutcomeRecord>,
    cancel: CancellationToken,
    stats: Arc<DispatchStats>,
) {
    let _slot = slot;
    let success = invoke(operation.as_ref(), invocation_timeout).await;
    publish(OutcomeRecord::now(success), &outcomes, &cancel, &stats).await;
}

/// Run the operation once; any error, panic or timeout is a failure
async fn invoke(operation: &dyn Operation, invocation_timeout: Option<Duration>) -> bool {
    let call = AssertUnwindSafe(operation.execute()).catch_unwind();

    let result = match invocation_timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => {
                debug!("{} timed out after {:?}", operation.name(), limit);
                return false;
            }
        },
        None => call.await,
    };

    match result {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!("{} failed: {}", operation.name(), e);
            false
        }
        Err(_) => {
            warn!("{} panicked during invocation", operation.name());
            false
        }
    }
}

/// Hand the record to the aggregator, waiting for capacity unless cancelled
async fn publish(
    record: OutcomeRecord,
    outcomes: &mpsc::Sender<OutcomeRecord>,
    cancel: &CancellationToken,
    stats: &DispatchStats,
) {
    let delivered = match outcomes.try_send(record) {
        Ok(()) => true,
        Err(TrySendError::Closed(_)) => false,
        Err(TrySendError::Full(record)) => {
            tokio::select! {
                sent = outcomes.send(record) => sent.is_ok(),
                _ = cancel.cancelled() => false,
            }
        }
    };

    if delivered {
        stats.published.fetch_add(1, Ordering::Relaxed);
    } else {
        stats.abandoned.fetch_add(1, Ordering::Relaxed);
        debug!("Outcome record abandoned during shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Result, TpsError};
    use async_trait::async_trait;

    struct Fixed(bool);

    #[async_trait]
    impl Operation for Fixed {
        async fn execute(&self) -> Result<()> {
            if self.0 {
                Ok(())
            } else {
                Err(TpsError::operation("refused"))
            }
        }
    }

    struct Panicking;

    #[async_trait]
    impl Operation for Panicking {
        async fn execute(&self) -> Result<()> {
            panic!("operation bug");
        }
    }

    struct Hanging;

    #[async_trait]
    impl Operation for Hanging {
        async fn execute(&self) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_invoke_classifies_results() {
        assert!(invoke(&Fixed(true), None).await);
        assert!(!invoke(&Fixed(false), None).await);
        assert!(!invoke(&Panicking, None).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_timeout_is_failure() {
        assert!(!invoke(&Hanging, Some(Duration::from_millis(50))).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_channel_publish_yields_to_cancellation() {
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let stats = DispatchStats::default();

        publish(OutcomeRecord::now(true), &tx, &cancel, &stats).await;
        assert_eq!(stats.published(), 1);

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        // Queue is full and nobody drains it; only cancellation can end this
        publish(OutcomeRecord::now(true), &tx, &cancel, &stats).await;
        assert_eq!(stats.published(), 1);
        assert_eq!(stats.abandoned(), 1);
    }

    #[tokio::test]
    async fn test_closed_channel_counts_abandoned() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let stats = DispatchStats::default();
        publish(OutcomeRecord::now(false), &tx, &CancellationToken::new(), &stats).await;
        assert_eq!(stats.abandoned(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatcher_stops_acquiring_after_cancel() {
        let budget = ConcurrencyBudget::new(3);
        let tracker = TaskTracker::new();
        let dispatcher = Dispatcher::new(Arc::new(Hanging), budget.clone(), tracker, None);
        let (tx, _rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(dispatcher.run(cancel.clone(), tx));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(budget.acquired(), 3);

        cancel.cancel();
        let launched = handle.await.unwrap();
        assert_eq!(launched, 3);
        assert_eq!(budget.acquired(), 3);
    }
}
