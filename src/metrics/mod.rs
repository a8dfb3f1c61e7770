//! Metrics sinks and run reporting
//!
//! This module provides:
//! - The `MetricsSink` trait the reporter forwards snapshots to
//! - A Prometheus gauge sink and the HTTP endpoint that exposes it
//! - The final report printed when a run ends

pub mod exporter;
pub mod gauge;
pub mod reporting;

pub use exporter::spawn_exporter;
pub use gauge::GaugeSink;
pub use reporting::FinalReport;

use crate::errors::Result;

/// Consumer of per-window counts
///
/// Called once per window from the reporter task. Implementations are
/// expected to be cheap (an in-memory update, not a network round trip).
pub trait MetricsSink: Send + Sync {
    fn report(&self, success: i64, failure: i64, total: i64) -> Result<()>;
}
