//! Leadboard REST API
//!
//! HTTP surface over the dashboard controller, built with Axum.
//!
//! # Endpoints
//!
//! ## Dashboard
//! - `GET /api/v1/dashboard` - Full snapshot (state + metrics)
//! - `GET /api/v1/leads` - Loaded leads, newest first
//! - `GET /api/v1/metrics` - Totals and goal progress
//! - `POST /api/v1/refresh` - Re-list leads from the store
//! - `PUT /api/v1/tab` - Switch tab
//! - `POST /api/v1/modal/open` - Open the lead modal
//! - `POST /api/v1/modal/close` - Close the lead modal
//!
//! ## Draft
//! - `PUT /api/v1/draft` - Edit draft fields
//! - `POST /api/v1/draft/save` - Upsert the draft
//!
//! ## Leads
//! - `POST /api/v1/leads/:id/edit` - Load a lead into the draft
//! - `PUT /api/v1/leads/:id/stage` - Move a lead to another stage
//!
//! ## Goals
//! - `PUT /api/v1/goals` - Set revenue and ticket targets
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /ws` - Live dashboard snapshots
//!
//! # Example
//!
//! ```rust,no_run
//! use leadboard::api::{serve, ApiConfig, AppState};
//! use leadboard::dashboard::{ControllerConfig, DashboardController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = leadboard::store::connect("https://abc.supabase.co", "anon-key");
//!     let controller = DashboardController::new(store, ControllerConfig::default());
//!     controller.mount().await;
//!
//!     let config = ApiConfig::default();
//!     serve(AppState::new(controller.clone(), config.clone()), &config).await?;
//!
//!     controller.unmount().await;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::websocket::websocket_handler;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Dashboard routes
        .route("/dashboard", get(routes::dashboard::get_dashboard))
        .route("/leads", get(routes::dashboard::list_leads))
        .route("/metrics", get(routes::dashboard::get_metrics))
        .route("/refresh", post(routes::dashboard::refresh))
        .route("/tab", put(routes::dashboard::set_tab))
        .route("/modal/open", post(routes::dashboard::open_modal))
        .route("/modal/close", post(routes::dashboard::close_modal))
        // Draft routes
        .route("/draft", put(routes::draft::update_draft))
        .route("/draft/save", post(routes::draft::save_draft))
        // Lead routes
        .route("/leads/:id/edit", post(routes::leads::edit_lead))
        .route("/leads/:id/stage", put(routes::leads::move_stage))
        // Goal routes
        .route("/goals", put(routes::goals::set_goals));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config);
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Configured origins, or anything when none are set
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Leadboard API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Leadboard API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
