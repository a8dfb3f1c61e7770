//! Command-line argument parsing for tpsgauge configuration

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

use super::defaults::Defaults;
use super::{Config, HttpMethod};
use crate::errors::{TpsError, Result};

/// HTTP method for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HttpMethodArg {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl From<HttpMethodArg> for HttpMethod {
    fn from(arg: HttpMethodArg) -> Self {
        match arg {
            HttpMethodArg::Get => HttpMethod::Get,
            HttpMethodArg::Head => HttpMethod::Head,
            HttpMethodArg::Post => HttpMethod::Post,
            HttpMethodArg::Put => HttpMethod::Put,
            HttpMethodArg::Delete => HttpMethod::Delete,
        }
    }
}

/// Raw configuration from command line arguments
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tpsgauge",
    version,
    about = "Drives a target with bounded concurrency and reports success/failure throughput per window",
    long_about = None
)]
pub struct RawConfig {
    /// Target URL
    #[arg(
        short = 't',
        long = "target",
        value_name = "URL",
        help = "Target URL to benchmark (HTTP/HTTPS)"
    )]
    pub target: String,

    /// HTTP method
    #[arg(
        short = 'm',
        long = "http-method",
        value_enum,
        default_value = "get",
        help = "HTTP method used for every request"
    )]
    pub http_method: HttpMethodArg,

    /// Disable the status check
    #[arg(
        long = "accept-any-status",
        help = "Count every completed response as a success, whatever its status"
    )]
    pub accept_any_status: bool,

    /// Concurrency ceiling
    #[arg(
        short = 'c',
        long = "concurrency",
        value_name = "COUNT",
        default_value_t = Defaults::CONCURRENCY,
        help = "Maximum number of requests in flight"
    )]
    pub concurrency: usize,

    /// Counting window
    #[arg(
        short = 'w',
        long = "window",
        value_name = "DURATION",
        default_value = Defaults::WINDOW,
        help = "Length of one counting window (e.g., '500ms', '1s')"
    )]
    pub window: String,

    /// Run duration
    #[arg(
        short = 'd',
        long = "duration",
        value_name = "DURATION",
        help = "Stop after this long (e.g., '30s', '5m'); runs until Ctrl+C when omitted"
    )]
    pub duration: Option<String>,

    /// Per-request timeout
    #[arg(
        long = "timeout",
        value_name = "DURATION",
        help = "Count a request as failed when it takes longer than this"
    )]
    pub timeout: Option<String>,

    /// Log each window
    #[arg(long = "log-snapshots", help = "Log the counts of every window")]
    pub log_snapshots: bool,

    /// Prometheus endpoint
    #[arg(
        long = "metrics-addr",
        value_name = "ADDR",
        help = "Serve the throughput gauges at http://ADDR/metrics (e.g., '0.0.0.0:2112')"
    )]
    pub metrics_addr: Option<SocketAddr>,

    /// JSON output
    #[arg(long = "json", help = "Print the final report as JSON")]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose", help = "Enable verbose logging")]
    pub verbose: bool,
}

impl RawConfig {
    /// Parse from command line arguments
    pub fn parse_from_args() -> Result<Self> {
        Ok(Self::parse())
    }

    /// Parse a duration with an optional `ms`/`s`/`m`/`h` suffix (default seconds)
    pub(crate) fn parse_duration(duration_str: &str) -> Result<Duration> {
        let duration_str = duration_str.trim();
        if duration_str.is_empty() {
            return Err(TpsError::config("Duration cannot be empty"));
        }

        let (number_part, unit_millis) = if let Some(n) = duration_str.strip_suffix("ms") {
            (n, 1)
        } else if let Some(n) = duration_str.strip_suffix(['s', 'S']) {
            (n, 1_000)
        } else if let Some(n) = duration_str.strip_suffix(['m', 'M']) {
            (n, 60_000)
        } else if let Some(n) = duration_str.strip_suffix(['h', 'H']) {
            (n, 3_600_000)
        } else {
            (duration_str, 1_000)
        };

        let value = number_part.trim().parse::<u64>().map_err(|_| {
            TpsError::config(format!(
                "Invalid duration format: '{}' - expected a number with an optional ms/s/m/h suffix",
                duration_str
            ))
        })?;

        value
            .checked_mul(unit_millis)
            .map(Duration::from_millis)
            .ok_or_else(|| TpsError::config(format!("Duration '{}' is too large", duration_str)))
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = TpsError;

    fn try_from(raw: RawConfig) -> Result<Self> {
        let window = RawConfig::parse_duration(&raw.window)?;
        let duration = raw
            .duration
            .as_deref()
            .map(RawConfig::parse_duration)
            .transpose()?;
        let invocation_timeout = raw
            .timeout
            .as_deref()
            .map(RawConfig::parse_duration)
            .transpose()?;

        let mut config = Config::default_http(raw.target);
        config.target.method = raw.http_method.into();
        config.target.check_status = !raw.accept_any_status;
        config.load.concurrency = raw.concurrency;
        config.load.window = window;
        config.load.invocation_timeout = invocation_timeout;
        config.test.duration = duration;
        config.output.verbose = raw.verbose;
        config.output.log_snapshots = raw.log_snapshots;
        config.output.json = raw.json;
        config.output.metrics_addr = raw.metrics_addr;
        Ok(config)
    }
}
