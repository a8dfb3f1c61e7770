//! Configuration validation logic

use super::Config;
use crate::constants::MAX_CONCURRENCY_LIMIT;
use crate::errors::{Result, TpsError};
use url::Url;

/// Validate the configuration
pub fn validate(config: &Config) -> Result<()> {
    validate_target(config)?;
    validate_load_config(config)?;
    validate_test_config(config)?;
    Ok(())
}

/// Validate target configuration
fn validate_target(config: &Config) -> Result<()> {
    let url = Url::parse(&config.target.url)?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(TpsError::config(format!(
            "Invalid URL scheme '{}'. Only 'http' and 'https' are supported",
            scheme
        ))),
    }
}

/// Validate concurrency, window and timeout
fn validate_load_config(config: &Config) -> Result<()> {
    if config.load.concurrency == 0 {
        return Err(TpsError::config("Concurrency must be greater than 0"));
    }

    if config.load.concurrency > MAX_CONCURRENCY_LIMIT {
        return Err(TpsError::config(format!(
            "Concurrency cannot exceed {}",
            MAX_CONCURRENCY_LIMIT
        )));
    }

    if config.load.window.is_zero() {
        return Err(TpsError::config("Window must be greater than 0"));
    }

    if let Some(timeout) = config.load.invocation_timeout
        && timeout.is_zero()
    {
        return Err(TpsError::config("Timeout must be greater than 0"));
    }

    Ok(())
}

/// Validate test configuration
fn validate_test_config(config: &Config) -> Result<()> {
    if let Some(duration) = config.test.duration
        && duration.is_zero()
    {
        return Err(TpsError::config("Duration must be greater than 0"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_test_config() -> Config {
        let mut config = Config::default_http("http://localhost:8080/ping".to_string());
        config.test.duration = Some(Duration::from_secs(10));
        config
    }

    #[test]
    fn test_validate_valid_config() {
        let config = create_test_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_url() {
        let mut config = create_test_config();
        config.target.url = "invalid-url".to_string();
        assert!(matches!(validate(&config), Err(TpsError::UrlParse(_))));
    }

    #[test]
    fn test_validate_rejects_websocket_scheme() {
        let mut config = create_test_config();
        config.target.url = "ws://localhost:8080".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = create_test_config();
        config.load.concurrency = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_excessive_concurrency() {
        let mut config = create_test_config();
        config.load.concurrency = MAX_CONCURRENCY_LIMIT + 1;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_zero_window() {
        let mut config = create_test_config();
        config.load.window = Duration::ZERO;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_zero_timeout_and_duration() {
        let mut config = create_test_config();
        config.load.invocation_timeout = Some(Duration::ZERO);
        assert!(validate(&config).is_err());

        let mut config = create_test_config();
        config.test.duration = Some(Duration::ZERO);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_unbounded_run_is_allowed() {
        let mut config = create_test_config();
        config.test.duration = None;
        assert!(validate(&config).is_ok());
    }
}
