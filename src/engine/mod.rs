//! The load-generation core
//!
//! Three components connected by two bounded channels and one cancellation
//! token:
//! - [`Dispatcher`] launches work units up to the concurrency budget and
//!   publishes one [`OutcomeRecord`](crate::outcome::OutcomeRecord) per unit
//! - [`Aggregator`] tallies records and emits one
//!   [`Snapshot`](crate::outcome::Snapshot) per window
//! - [`Reporter`] forwards snapshots to a [`MetricsSink`]
//!
//! [`start`] wires them together and runs until the token is cancelled.

pub mod aggregator;
pub mod budget;
pub mod dispatcher;
pub mod reporter;

pub use aggregator::{Aggregator, AggregatorStats};
pub use budget::{BudgetSlot, ConcurrencyBudget};
pub use dispatcher::{DispatchStats, Dispatcher};
pub use reporter::{Reporter, ReporterStats};

use crate::constants::*;
use crate::errors::{Result, TpsError};
use crate::metrics::MetricsSink;
use crate::operation::Operation;

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of invocations in flight
    pub concurrency: usize,
    /// Length of one counting window
    pub window: Duration,
    /// Per-invocation limit; `None` waits for the operation indefinitely
    pub invocation_timeout: Option<Duration>,
    pub outcome_capacity: usize,
    pub snapshot_capacity: usize,
    /// How long `start` waits for in-flight units after shutdown; defaults to one window
    pub settle_timeout: Option<Duration>,
    /// Also log every snapshot at `info`
    pub log_snapshots: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            window: DEFAULT_WINDOW,
            invocation_timeout: None,
            outcome_capacity: OUTCOME_CHANNEL_CAPACITY,
            snapshot_capacity: SNAPSHOT_CHANNEL_CAPACITY,
            settle_timeout: None,
            log_snapshots: false,
        }
    }
}

impl EngineConfig {
    pub fn new(concurrency: usize, window: Duration) -> Self {
        Self {
            concurrency,
            window,
            ..Default::default()
        }
    }

    pub fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = Some(timeout);
        self
    }

    pub fn with_log_snapshots(mut self, enabled: bool) -> Self {
        self.log_snapshots = enabled;
        self
    }

    pub fn settle_timeout(&self) -> Duration {
        self.settle_timeout.unwrap_or(self.window)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(TpsError::config("Concurrency must be greater than 0"));
        }
        if self.window.is_zero() {
            return Err(TpsError::config("Window duration must be greater than 0"));
        }
        if self.outcome_capacity == 0 || self.snapshot_capacity == 0 {
            return Err(TpsError::config("Channel capacities must be greater than 0"));
        }
        if let Some(timeout) = self.invocation_timeout
            && timeout.is_zero()
        {
            return Err(TpsError::config("Invocation timeout must be greater than 0"));
        }
        Ok(())
    }
}

/// What happened during one run of the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub budget_acquired: u64,
    pub budget_released: u64,
    pub outcomes_published: u64,
    pub outcomes_abandoned: u64,
    /// Published records left in the unfinished window or the queue at shutdown
    pub outcomes_discarded: u64,
    pub snapshots_emitted: u64,
    pub snapshots_reported: u64,
    pub sink_failures: u64,
    /// Work units still running when `start` returned
    pub units_unsettled: u64,
}

/// Run the engine until `cancel` fires
///
/// Returns once all three components have stopped and in-flight units have
/// had `settle_timeout` to finish. Units still running after that are left
/// behind and counted in [`RunSummary::units_unsettled`].
pub async fn start(
    cancel: CancellationToken,
    config: EngineConfig,
    operation: Arc<dyn Operation>,
    sink: Arc<dyn MetricsSink>,
) -> Result<RunSummary> {
    config.validate()?;

    // A component fault cancels only this run, never the caller's token
    let run_token = cancel.child_token();

    let (outcome_tx, outcome_rx) = mpsc::channel(config.outcome_capacity);
    let (snapshot_tx, snapshot_rx) = mpsc::channel(config.snapshot_capacity);

    let budget = ConcurrencyBudget::new(config.concurrency);
    let tracker = TaskTracker::new();
    let dispatcher = Dispatcher::new(
        operation,
        budget.clone(),
        tracker.clone(),
        config.invocation_timeout,
    );
    let dispatch_stats = dispatcher.stats();

    info!(
        "Starting engine: concurrency {}, window {:?}, invocation timeout {:?}",
        config.concurrency, config.window, config.invocation_timeout
    );

    let reporter = spawn_component(
        "reporter",
        run_token.clone(),
        Reporter::new(sink, config.log_snapshots).run(snapshot_rx),
    );
    let aggregator = spawn_component(
        "aggregator",
        run_token.clone(),
        Aggregator::new(config.window).run(run_token.clone(), outcome_rx, snapshot_tx),
    );
    let dispatcher = spawn_component(
        "dispatcher",
        run_token.clone(),
        dispatcher.run(run_token.clone(), outcome_tx),
    );

    let launched = dispatcher.await;
    let aggregated = aggregator.await;
    let reporter_stats = reporter.await;

    tracker.close();
    let settle = config.settle_timeout();
    if tokio::time::timeout(settle, tracker.wait()).await.is_err() {
        warn!(
            "{} work units still running {:?} after shutdown",
            tracker.len(),
            settle
        );
    }

    let launched = launched?;
    let aggregated = aggregated?;
    let reporter_stats = reporter_stats?;

    let summary = RunSummary {
        budget_acquired: budget.acquired(),
        budget_released: budget.released(),
        outcomes_published: dispatch_stats.published(),
        outcomes_abandoned: dispatch_stats.abandoned(),
        outcomes_discarded: aggregated.discarded,
        snapshots_emitted: aggregated.emitted,
        snapshots_reported: reporter_stats.reported,
        sink_failures: reporter_stats.sink_failures,
        units_unsettled: tracker.len() as u64,
    };

    info!(
        "Engine stopped: {} invocations launched, {} windows reported",
        launched, summary.snapshots_reported
    );
    Ok(summary)
}

/// Spawn a component whose panic cancels the rest of the run
fn spawn_component<F>(
    name: &'static str,
    run_token: CancellationToken,
    component: F,
) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(async move {
        let fault_guard = run_token.drop_guard();
        let output = component.await;
        fault_guard.disarm();
        debug!("{} stopped", name);
        output
    })
}
