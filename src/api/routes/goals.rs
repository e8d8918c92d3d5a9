//! Goals Routes
//!
//! - PUT /api/v1/goals - Set revenue and/or ticket targets

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::GoalsRequest;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::dashboard::DashboardSnapshot;

/// PUT /api/v1/goals
pub async fn set_goals(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoalsRequest>,
) -> ApiResult<Json<DashboardSnapshot>> {
    validate_goal("target_revenue", req.target_revenue)?;
    validate_goal("target_ticket", req.target_ticket)?;

    let goals = state
        .controller
        .set_goals(req.target_revenue, req.target_ticket)
        .await;
    tracing::debug!(
        target_revenue = goals.target_revenue,
        target_ticket = goals.target_ticket,
        "Goals updated"
    );

    Ok(Json(state.controller.snapshot().await))
}

fn validate_goal(field: &str, value: Option<f64>) -> ApiResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ApiError::Validation(format!(
            "{} must be a non-negative number",
            field
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_goal() {
        assert!(validate_goal("target_revenue", None).is_ok());
        assert!(validate_goal("target_revenue", Some(0.0)).is_ok());
        assert!(validate_goal("target_revenue", Some(5000.0)).is_ok());
        assert!(validate_goal("target_revenue", Some(-1.0)).is_err());
        assert!(validate_goal("target_ticket", Some(f64::NAN)).is_err());
    }
}
