//! Default values and configuration presets

use super::{Config, HttpMethod, LoadConfig, OutputConfig, TargetConfig, TestConfig};
use crate::constants::{DEFAULT_CONCURRENCY, DEFAULT_WINDOW};

/// Default configuration values
pub struct Defaults;

impl Defaults {
    pub const CONCURRENCY: usize = DEFAULT_CONCURRENCY;
    pub const WINDOW: &'static str = "1s";
}

impl Config {
    /// HTTP GET configuration with default load that runs until interrupted
    ///
    /// The CLI parser starts from this and overrides what was given.
    pub fn default_http(target_url: String) -> Self {
        Self {
            target: TargetConfig {
                url: target_url,
                method: HttpMethod::Get,
                check_status: true,
            },
            load: LoadConfig {
                concurrency: Defaults::CONCURRENCY,
                window: DEFAULT_WINDOW,
                invocation_timeout: None,
            },
            test: TestConfig { duration: None },
            output: OutputConfig {
                verbose: false,
                log_snapshots: false,
                json: false,
                metrics_addr: None,
            },
        }
    }
}
