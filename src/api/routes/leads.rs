//! Lead Routes
//!
//! - POST /api/v1/leads/:id/edit - Load a lead into the draft and open the modal
//! - PUT /api/v1/leads/:id/stage - Move a lead to another stage

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{StageRequest, StageResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::dashboard::DashboardSnapshot;
use crate::store::{LeadId, Stage};

fn parse_id(raw: &str) -> LeadId {
    match raw.parse() {
        Ok(id) => id,
        Err(never) => match never {},
    }
}

/// POST /api/v1/leads/:id/edit
pub async fn edit_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DashboardSnapshot>> {
    let id = parse_id(&id);
    if !state.controller.edit_lead(&id).await {
        return Err(ApiError::NotFound(format!("Lead {} not loaded", id)));
    }
    Ok(Json(state.controller.snapshot().await))
}

/// PUT /api/v1/leads/:id/stage
pub async fn move_stage(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<StageRequest>,
) -> ApiResult<Json<StageResponse>> {
    if !Stage::ALL.contains(&req.stage) {
        return Err(ApiError::Validation(format!("Unknown stage: {}", req.stage)));
    }

    let id = parse_id(&id);
    if state.controller.find_lead(&id).await.is_none() {
        return Err(ApiError::NotFound(format!("Lead {} not loaded", id)));
    }

    let moved = state.controller.move_to_stage(&id, req.stage).await;
    tracing::debug!(lead_id = %id, moved, "Stage move requested");

    Ok(Json(StageResponse {
        moved,
        dashboard: state.controller.snapshot().await,
    }))
}
