// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Telemetry HTTP endpoints.
//!
//! Prometheus metrics and the liveness/readiness probes listen on separate
//! addresses so probes keep answering when scrapes are slow.

use anyhow::{Context as _, Result};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::constants::{HEALTHZ_PATH, METRICS_SERVER_PATH, READYZ_PATH};
use crate::metrics::gather_metrics;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

async fn metrics_handler() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            body,
        ),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                e.to_string(),
            )
        }
    }
}

async fn ok_handler() -> &'static str {
    "ok"
}

/// Router serving `/metrics`.
#[must_use]
pub fn metrics_router() -> Router {
    Router::new().route(METRICS_SERVER_PATH, get(metrics_handler))
}

/// Router serving `/healthz` and `/readyz`.
#[must_use]
pub fn health_router() -> Router {
    Router::new()
        .route(HEALTHZ_PATH, get(ok_handler))
        .route(READYZ_PATH, get(ok_handler))
}

/// Serve `router` on an already bound listener until the server fails.
///
/// # Errors
///
/// Returns the server error.
pub async fn serve_on(listener: TcpListener, router: Router, name: &str) -> Result<()> {
    let address = listener.local_addr().ok();
    info!(server = name, ?address, "Serving HTTP endpoints");
    axum::serve(listener, router)
        .await
        .with_context(|| format!("{name} server failed"))
}

/// Bind `address` and serve the metrics endpoint.
///
/// # Errors
///
/// Fails when the address cannot be bound or the server stops with an error.
pub async fn run_metrics_server(address: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind metrics address {address}"))?;
    serve_on(listener, metrics_router(), "metrics").await
}

/// Bind `address` and serve the health probes.
///
/// # Errors
///
/// Fails when the address cannot be bound or the server stops with an error.
pub async fn run_health_server(address: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind health probe address {address}"))?;
    serve_on(listener, health_router(), "health").await
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
