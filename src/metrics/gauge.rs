//! Prometheus throughput gauges

use crate::errors::Result;
use crate::metrics::MetricsSink;

use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

const NAME_LABEL: &str = "name";
const SUCCESS_LABEL: &str = "SuccessTPS";
const FAILURE_LABEL: &str = "FailureTPS";
const TOTAL_LABEL: &str = "TotalTPS";

/// Holds the most recent window's success/failure/total throughput
///
/// Each report overwrites the previous values. The gauges live in their own
/// [`Registry`], rendered by [`render`](Self::render) for the `/metrics`
/// endpoint.
pub struct GaugeSink {
    registry: Registry,
    success: IntGaugeVec,
    failure: IntGaugeVec,
    total: IntGaugeVec,
}

impl GaugeSink {
    pub fn new() -> Result<Self> {
        let success = IntGaugeVec::new(
            Opts::new(
                "request_success_num_total",
                "Successful requests in the last window",
            ),
            &[NAME_LABEL],
        )?;
        let failure = IntGaugeVec::new(
            Opts::new(
                "request_failure_num_total",
                "Failed requests in the last window",
            ),
            &[NAME_LABEL],
        )?;
        let total = IntGaugeVec::new(
            Opts::new("request_all_num_total", "All requests in the last window"),
            &[NAME_LABEL],
        )?;

        let registry = Registry::new();
        registry.register(Box::new(success.clone()))?;
        registry.register(Box::new(failure.clone()))?;
        registry.register(Box::new(total.clone()))?;

        let sink = Self {
            registry,
            success,
            failure,
            total,
        };
        // Expose zeroes before the first window closes
        sink.set(0, 0, 0);
        Ok(sink)
    }

    /// Current `(success, failure, total)` gauge values
    pub fn values(&self) -> (i64, i64, i64) {
        (
            self.success.with_label_values(&[SUCCESS_LABEL]).get(),
            self.failure.with_label_values(&[FAILURE_LABEL]).get(),
            self.total.with_label_values(&[TOTAL_LABEL]).get(),
        )
    }

    /// Registry contents in the Prometheus text exposition format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn set(&self, success: i64, failure: i64, total: i64) {
        self.success.with_label_values(&[SUCCESS_LABEL]).set(success);
        self.failure.with_label_values(&[FAILURE_LABEL]).set(failure);
        self.total.with_label_values(&[TOTAL_LABEL]).set(total);
    }
}

impl MetricsSink for GaugeSink {
    fn report(&self, success: i64, failure: i64, total: i64) -> Result<()> {
        self.set(success, failure, total);
        Ok(())
    }
}
