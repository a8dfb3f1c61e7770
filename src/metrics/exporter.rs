//! HTTP endpoint exposing the throughput gauges to Prometheus

use crate::errors::{ErrorContext, Result};
use crate::metrics::GaugeSink;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub fn router(gauge: Arc<GaugeSink>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .with_state(gauge)
}

async fn metrics(State(gauge): State<Arc<GaugeSink>>) -> Response {
    match gauge.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to render metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Bind `addr` and serve `/metrics` until `cancel` fires
///
/// Binding happens before returning, so an unusable address is reported to
/// the caller. Returns the bound address and the server task.
pub async fn spawn_exporter(
    addr: SocketAddr,
    gauge: Arc<GaugeSink>,
    cancel: CancellationToken,
) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
    let listener = TcpListener::bind(addr)
        .await
        .with_exporter_context(&format!("Failed to bind {}", addr))?;
    let local_addr = listener
        .local_addr()
        .with_exporter_context("Failed to read bound address")?;
    info!("Serving metrics on http://{}/metrics", local_addr);

    let server = tokio::spawn(async move {
        axum::serve(listener, router(gauge))
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
            .with_exporter_context("Metrics server failed")
    });
    Ok((local_addr, server))
}
