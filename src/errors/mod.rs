//! Domain-specific error types for the tpsgauge load generator
//!
//! Invocation failures of the benchmarked operation never surface here as
//! errors of the engine; they are classified as failed outcomes. `TpsError`
//! covers configuration problems, sink and exporter failures, and faults of
//! the engine's own tasks.

use thiserror::Error;

/// Main error type for tpsgauge
#[derive(Error, Debug)]
pub enum TpsError {
    /// Configuration-related errors (CLI parsing, validation, engine settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The benchmarked operation reported a failure
    #[error("Operation failed: {0}")]
    Operation(String),

    /// A metrics sink rejected a report
    #[error("Metrics sink error: {0}")]
    Sink(String),

    /// An engine component task panicked or was aborted
    #[error("Engine task failed: {0}")]
    Task(String),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization errors
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// Metric registration or encoding errors
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// The `/metrics` endpoint could not be served
    #[error("Metrics exporter error: {0}")]
    Exporter(String),
}

/// Result type using TpsError
pub type Result<T> = std::result::Result<T, TpsError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_config_context(self, msg: &str) -> Result<T>;
    fn with_exporter_context(self, msg: &str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn with_config_context(self, msg: &str) -> Result<T> {
        self.map_err(|e| TpsError::Config(format!("{}: {}", msg, e)))
    }

    fn with_exporter_context(self, msg: &str) -> Result<T> {
        self.map_err(|e| TpsError::Exporter(format!("{}: {}", msg, e)))
    }
}

// Convenience constructors
impl TpsError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        TpsError::Config(msg.into())
    }

    pub fn operation<S: Into<String>>(msg: S) -> Self {
        TpsError::Operation(msg.into())
    }

    pub fn sink<S: Into<String>>(msg: S) -> Self {
        TpsError::Sink(msg.into())
    }
}

impl From<tokio::task::JoinError> for TpsError {
    fn from(err: tokio::task::JoinError) -> Self {
        TpsError::Task(err.to_string())
    }
}
