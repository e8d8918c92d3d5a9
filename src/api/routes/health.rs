//! Health Routes
//!
//! Health check endpoints for monitoring.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
///
/// Running without a store is "degraded": the dashboard works but nothing
/// is persisted.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let persistence = state.controller.has_store();
    let status = if persistence { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        persistence,
        subscribed: state.controller.is_subscribed().await,
        lead_count: state.controller.leads().await.len(),
        ws_connections: state.ws_connection_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
