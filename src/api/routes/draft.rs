//! Draft Routes
//!
//! - PUT /api/v1/draft - Edit draft fields
//! - POST /api/v1/draft/save - Upsert the draft

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::SaveResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::dashboard::{DashboardSnapshot, DraftUpdate};

/// PUT /api/v1/draft
///
/// Absent fields are left as they are.
pub async fn update_draft(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DraftUpdate>,
) -> ApiResult<Json<DashboardSnapshot>> {
    validate_draft(&req)?;
    state.controller.update_draft(req).await;
    Ok(Json(state.controller.snapshot().await))
}

/// POST /api/v1/draft/save
///
/// A store failure is not an HTTP error: the response says `saved: false`
/// and the modal stays open, same as the form would.
pub async fn save_draft(State(state): State<Arc<AppState>>) -> Json<SaveResponse> {
    let saved = state.controller.save().await;
    Json(SaveResponse {
        saved,
        dashboard: state.controller.snapshot().await,
    })
}

fn validate_draft(req: &DraftUpdate) -> ApiResult<()> {
    if let Some(value) = req.value {
        if !value.is_finite() {
            return Err(ApiError::Validation("value must be a finite number".to_string()));
        }
    }
    Ok(())
}
