//! Final run report and output formatting

use crate::config::Config;
use crate::engine::RunSummary;
use crate::errors::Result;
use crate::metrics::GaugeSink;
use crate::outcome::Snapshot;

use serde::Serialize;
use std::time::Duration;

/// Everything printed when a run ends
#[derive(Debug, Clone, Serialize)]
pub struct FinalReport {
    pub target: String,
    pub concurrency: usize,
    pub window_ms: u64,
    pub elapsed_secs: f64,
    pub last_window: Snapshot,
    pub summary: RunSummary,
}

impl FinalReport {
    pub fn new(config: &Config, elapsed: Duration, summary: RunSummary, gauge: &GaugeSink) -> Self {
        let (success, failure, _) = gauge.values();
        Self {
            target: config.target.url.clone(),
            concurrency: config.load.concurrency,
            window_ms: u64::try_from(config.load.window.as_millis()).unwrap_or(u64::MAX),
            elapsed_secs: elapsed.as_secs_f64(),
            last_window: Snapshot::new(success, failure),
            summary,
        }
    }

    /// Average completed invocations per second over the whole run
    pub fn average_throughput(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.summary.outcomes_published as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Print a human-readable report
    pub fn print(&self) {
        println!("\n📊 tpsgauge Results");
        println!("═══════════════════════════════════════════════════════════════");

        println!("\n🔧 Configuration:");
        println!("   Target:           {}", self.target);
        println!("   Concurrency:      {}", self.concurrency);
        println!("   Window:           {}ms", self.window_ms);

        println!("\n📈 Overall Results:");
        println!("   Run Duration:     {:.2}s", self.elapsed_secs);
        println!("   Invocations:      {}", self.summary.budget_acquired);
        println!("   Outcomes:         {}", self.summary.outcomes_published);
        println!("   Windows Reported: {}", self.summary.snapshots_reported);
        println!("   Avg Throughput:   {:.2}/s", self.average_throughput());

        println!("\n⚡ Last Window:");
        println!("   Success:          {}", self.last_window.success_count);
        println!("   Failure:          {}", self.last_window.failure_count);
        println!("   Total:            {}", self.last_window.total_count);
        println!("   Success Rate:     {:.2}%", self.last_window.success_rate());

        if self.summary.outcomes_abandoned > 0
            || self.summary.outcomes_discarded > 0
            || self.summary.sink_failures > 0
            || self.summary.units_unsettled > 0
        {
            println!("\n⚠️  Shutdown:");
            println!("   Abandoned:        {}", self.summary.outcomes_abandoned);
            println!("   Unreported:       {}", self.summary.outcomes_discarded);
            println!("   Sink Failures:    {}", self.summary.sink_failures);
            println!("   Still Running:    {}", self.summary.units_unsettled);
        }

        println!("═══════════════════════════════════════════════════════════════");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsSink;

    fn sample_report() -> FinalReport {
        let config = Config::default_http("http://localhost:8080".to_string());
        let gauge = GaugeSink::new().unwrap();
        gauge.report(90, 10, 100).unwrap();
        let summary = RunSummary {
            budget_acquired: 400,
            budget_released: 400,
            outcomes_published: 400,
            snapshots_emitted: 4,
            snapshots_reported: 4,
            ..Default::default()
        };
        FinalReport::new(&config, Duration::from_secs(4), summary, &gauge)
    }

    #[test]
    fn test_average_throughput() {
        let report = sample_report();
        assert_eq!(report.average_throughput(), 100.0);
        assert_eq!(report.last_window, Snapshot::new(90, 10));
    }

    #[test]
    fn test_json_report() {
        let json = sample_report().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["concurrency"], 50);
        assert_eq!(value["window_ms"], 1000);
        assert_eq!(value["last_window"]["failure_count"], 10);
        assert_eq!(value["summary"]["outcomes_published"], 400);
    }
}
