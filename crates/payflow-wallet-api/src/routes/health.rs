//! Health and metrics endpoints.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Metrics snapshot response.
#[derive(Serialize)]
pub struct MetricsResponse {
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: String,
    /// Seconds since the service started.
    pub uptime_seconds: i64,
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /metrics
async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    let uptime = state.clock.now() - state.started_at;
    Json(MetricsResponse {
        service: "wallet",
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds(),
    })
}

/// Returns the health and metrics router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
}
