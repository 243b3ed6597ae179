/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Health Check Module
//!
//! This module provides HTTP health check endpoints for the monitoring
//! engine. These endpoints are used by Kubernetes for liveness and readiness
//! probes.
//!
//! ## Endpoints
//!
//! - `GET /healthz`: Simple liveness check (returns 200 OK if process is alive)
//! - `GET /readyz`: Readiness check with database connectivity validation
//! - `GET /health`: Detailed health status with JSON response
//! - `GET /metrics`: Prometheus metrics in text exposition format

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;

use crate::dal::DAL;
use crate::metrics;

/// Shared state for health endpoints
#[derive(Clone)]
pub struct HealthState {
    pub dal: DAL,
    pub start_time: SystemTime,
}

/// Health status response structure
#[derive(Serialize)]
struct HealthStatus {
    status: String,
    database: DatabaseStatus,
    uptime_seconds: u64,
    version: String,
    timestamp: String,
}

/// Database health status
#[derive(Serialize)]
struct DatabaseStatus {
    connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Configures and returns the health check router
pub fn configure_health_routes(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Simple liveness check endpoint
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness check endpoint: validates store connectivity.
async fn readyz(State(state): State<HealthState>) -> impl IntoResponse {
    match state.dal.probe() {
        Ok(()) => (StatusCode::OK, "Ready"),
        Err(e) => {
            error!("Store connectivity check failed: {:?}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable")
        }
    }
}

/// Detailed health check endpoint
async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards");
    let timestamp = chrono::Utc::now().to_rfc3339();

    let uptime = now.as_secs().saturating_sub(
        state
            .start_time
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_secs(),
    );

    let (connected, db_error) = match state.dal.probe() {
        Ok(()) => (true, None),
        Err(e) => {
            error!("Store connectivity check failed: {:?}", e);
            (false, Some(format!("{:?}", e)))
        }
    };

    let status_code = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let health_status = HealthStatus {
        status: if connected { "healthy" } else { "unhealthy" }.to_string(),
        database: DatabaseStatus {
            connected,
            error: db_error,
        },
        uptime_seconds: uptime,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp,
    };

    (status_code, Json(health_status))
}

/// Prometheus metrics endpoint
async fn metrics_handler() -> impl IntoResponse {
    let metrics_data = metrics::encode_metrics();
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        metrics_data,
    )
}

/// Binds the health listener and serves until the process exits.
pub async fn serve(state: HealthState, port: u16) {
    let app = configure_health_routes(state);
    let addr = format!("0.0.0.0:{}", port);
    match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Health listener failed: {}", e);
            }
        }
        Err(e) => error!("Could not bind health listener on {}: {}", addr, e),
    }
}
