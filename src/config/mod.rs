//! Configuration management for the tpsgauge binary
//!
//! This module provides a layered approach to configuration:
//! - Core structures and enums
//! - CLI argument parsing
//! - Configuration validation
//! - Default value management

pub mod defaults;
pub mod parser;
pub mod validation;

use crate::constants::DEFAULT_HTTP_TIMEOUT;
use crate::engine::EngineConfig;
use crate::errors::Result;
use std::net::SocketAddr;
use std::time::Duration;

/// HTTP method used for each invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

/// Target configuration
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub url: String,
    pub method: HttpMethod,
    /// Count non-2xx responses as failures
    pub check_status: bool,
}

/// Load shape configuration
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub concurrency: usize,
    pub window: Duration,
    pub invocation_timeout: Option<Duration>,
}

/// Test execution configuration
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Stop after this long; `None` runs until Ctrl+C
    pub duration: Option<Duration>,
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub verbose: bool,
    pub log_snapshots: bool,
    pub json: bool,
    /// Serve the gauges at `http://<addr>/metrics` while the run lasts
    pub metrics_addr: Option<SocketAddr>,
}

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub target: TargetConfig,
    pub load: LoadConfig,
    pub test: TestConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Parse and validate configuration from command line arguments
    pub fn from_args() -> Result<Self> {
        let raw_config = parser::RawConfig::parse_from_args()?;
        let config = raw_config.try_into()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Engine settings derived from the load and output sections
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            invocation_timeout: self.load.invocation_timeout,
            log_snapshots: self.output.log_snapshots,
            ..EngineConfig::new(self.load.concurrency, self.load.window)
        }
    }

    /// Timeout for the HTTP client itself
    ///
    /// Follows the invocation timeout when one is set.
    pub fn http_timeout(&self) -> Duration {
        self.load.invocation_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT)
    }

    pub fn test_duration(&self) -> Option<Duration> {
        self.test.duration
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("📈 tpsgauge Configuration:");
        println!("   Target:           {}", self.target.url);
        println!("   HTTP Method:      {:?}", self.target.method);
        if !self.target.check_status {
            println!("   Status Check:     off (any response counts as success)");
        }
        println!("   Concurrency:      {}", self.load.concurrency);
        println!("   Window:           {:?}", self.load.window);

        match self.load.invocation_timeout {
            Some(timeout) => println!("   Timeout:          {:?}", timeout),
            None => println!("   Timeout:          none"),
        }

        match self.test.duration {
            Some(duration) => println!("   Duration:         {}s", duration.as_secs()),
            None => println!("   Duration:         until Ctrl+C"),
        }

        if let Some(addr) = self.output.metrics_addr {
            println!("   Metrics:          http://{}/metrics", addr);
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_mapping() {
        let mut config = Config::default_http("http://localhost:8080".to_string());
        config.load.concurrency = 7;
        config.load.invocation_timeout = Some(Duration::from_millis(250));
        config.output.log_snapshots = true;

        let engine = config.engine_config();
        assert_eq!(engine.concurrency, 7);
        assert_eq!(engine.window, config.load.window);
        assert_eq!(engine.invocation_timeout, Some(Duration::from_millis(250)));
        assert!(engine.log_snapshots);
        assert_eq!(config.http_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_http_timeout_falls_back_to_default() {
        let config = Config::default_http("http://localhost:8080".to_string());
        assert_eq!(config.http_timeout(), DEFAULT_HTTP_TIMEOUT);
    }
}
