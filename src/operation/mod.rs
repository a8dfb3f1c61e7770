//! The benchmarked operation
//!
//! The engine treats the operation as opaque: it only learns whether one
//! invocation completed without error. Latency and failure behavior belong
//! entirely to the implementation.

pub mod http;

pub use http::HttpOperation;

use crate::errors::Result;

use async_trait::async_trait;

/// A single unit of load issued against the system under test
#[async_trait]
pub trait Operation: Send + Sync {
    /// Perform one invocation; `Ok` is counted as a success
    async fn execute(&self) -> Result<()>;

    /// Short human-readable label used in logs
    fn name(&self) -> &str {
        "operation"
    }
}
