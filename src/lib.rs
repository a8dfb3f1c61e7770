//! tpsgauge: bounded-concurrency load generation with per-window
//! success/failure throughput.
//!
//! The [`engine`] runs a benchmarked [`Operation`](operation::Operation) with
//! at most `concurrency` invocations in flight, counts successes and failures
//! per window, and hands every window's counts to a
//! [`MetricsSink`](metrics::MetricsSink) until its cancellation token fires.

pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod operation;
pub mod outcome;

pub use engine::{EngineConfig, RunSummary, start};
pub use errors::{Result, TpsError};
pub use metrics::{GaugeSink, MetricsSink};
pub use operation::Operation;
pub use outcome::{OutcomeRecord, Snapshot};
