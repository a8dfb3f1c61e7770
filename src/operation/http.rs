//! HTTP request operation

use crate::config::HttpMethod;
use crate::errors::{ErrorContext, Result, TpsError};
use crate::operation::Operation;

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Issues one HTTP request per invocation against a fixed target
///
/// A transport error is always a failed invocation. A non-2xx status is a
/// failure too unless the status check is turned off with
/// [`with_status_check`](Self::with_status_check), in which case any
/// completed response counts as a success.
#[derive(Debug, Clone)]
pub struct HttpOperation {
    http_client: reqwest::Client,
    method: reqwest::Method,
    url: String,
    check_status: bool,
}

impl HttpOperation {
    pub fn new(url: impl Into<String>, method: HttpMethod, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .with_config_context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            method: to_reqwest_method(method),
            url: url.into(),
            check_status: true,
        })
    }

    pub fn with_status_check(mut self, enabled: bool) -> Self {
        self.check_status = enabled;
        self
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Operation for HttpOperation {
    async fn execute(&self) -> Result<()> {
        let response = self
            .http_client
            .request(self.method.clone(), &self.url)
            .send()
            .await?;

        let status = response.status();
        if self.check_status && !status.is_success() {
            debug!("{} {} returned {}", self.method, self.url, status);
            return Err(TpsError::operation(format!("HTTP status {}", status)));
        }

        // Drain the body so the connection can be reused
        response.bytes().await?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.url
    }
}
