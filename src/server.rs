//! # Probe Server
//!
//! Kubernetes probe and metrics endpoints for the controller:
//! `/healthz` (liveness), `/readyz` (readiness, flips once the controller
//! loop is running) and `/metrics` (Prometheus text format).
//!
//! Listens on `METRICS_PORT`, default 8080.

use crate::error::Result;
use crate::observability::metrics;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Build the probe router around the shared readiness flag
pub fn router(ready: Arc<AtomicBool>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { StatusCode::OK }))
        .route(
            "/readyz",
            get(move || {
                let ready = Arc::clone(&ready);
                async move {
                    if ready.load(Ordering::Relaxed) {
                        StatusCode::OK
                    } else {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                }
            }),
        )
        .route("/metrics", get(metrics_endpoint))
}

/// Bind the probe server and serve until the process exits
pub async fn serve(port: u16, ready: Arc<AtomicBool>) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("probe server listening on port {port}");
    axum::serve(listener, router(ready)).await?;
    Ok(())
}

async fn metrics_endpoint() -> axum::response::Response {
    match metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding failed: {e}"),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_builds_with_either_readiness_state() {
        for ready in [false, true] {
            let flag = Arc::new(AtomicBool::new(ready));
            let _ = router(flag);
        }
    }
}
