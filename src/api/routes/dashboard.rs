//! Dashboard Routes
//!
//! Read the dashboard and drive its local UI state.
//!
//! - GET /api/v1/dashboard - Full snapshot (state + metrics)
//! - GET /api/v1/leads - Loaded leads
//! - GET /api/v1/metrics - Derived metrics
//! - POST /api/v1/refresh - Re-list leads from the store
//! - PUT /api/v1/tab - Switch tab
//! - POST /api/v1/modal/open - Open the lead modal
//! - POST /api/v1/modal/close - Close the lead modal

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{LeadListResponse, RefreshResponse, TabRequest};
use crate::api::state::AppState;
use crate::dashboard::{DashboardSnapshot, Metrics};

/// GET /api/v1/dashboard
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardSnapshot> {
    Json(state.controller.snapshot().await)
}

/// GET /api/v1/leads
pub async fn list_leads(State(state): State<Arc<AppState>>) -> Json<LeadListResponse> {
    let leads = state.controller.leads().await;
    Json(LeadListResponse {
        total: leads.len(),
        leads,
    })
}

/// GET /api/v1/metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<Metrics> {
    Json(state.controller.snapshot().await.metrics)
}

/// POST /api/v1/refresh
///
/// `refreshed` is false without a store, on store failure, or when a newer
/// list landed first.
pub async fn refresh(State(state): State<Arc<AppState>>) -> Json<RefreshResponse> {
    let refreshed = state.controller.refresh().await;
    Json(RefreshResponse {
        refreshed,
        dashboard: state.controller.snapshot().await,
    })
}

/// PUT /api/v1/tab
pub async fn set_tab(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TabRequest>,
) -> Json<DashboardSnapshot> {
    state.controller.set_tab(req.tab).await;
    Json(state.controller.snapshot().await)
}

/// POST /api/v1/modal/open
pub async fn open_modal(State(state): State<Arc<AppState>>) -> Json<DashboardSnapshot> {
    state.controller.open_modal().await;
    Json(state.controller.snapshot().await)
}

/// POST /api/v1/modal/close
pub async fn close_modal(State(state): State<Arc<AppState>>) -> Json<DashboardSnapshot> {
    state.controller.close_modal().await;
    Json(state.controller.snapshot().await)
}
