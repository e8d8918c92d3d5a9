//! # Leadboard
//!
//! Lead pipeline dashboard backed by a hosted table service: leads are
//! listed and upserted over REST, and a realtime channel reports every
//! change so all open dashboards stay current.
//!
//! ## Features
//!
//! - **Optional persistence**: Without connection settings the dashboard
//!   runs as a local-only shell
//! - **Live updates**: Change notifications reload (or patch) the lead list
//! - **Ordered refreshes**: Stale list responses never overwrite newer ones
//! - **Goals**: Revenue and ticket targets with progress metrics
//!
//! ## Modules
//!
//! - [`store`]: Remote store gateway (REST + realtime, in-memory backend)
//! - [`dashboard`]: Dashboard state, metrics and controller
//! - [`api`]: REST API server with Axum
//! - [`websocket`]: Live snapshots for browser clients
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use leadboard::dashboard::{ControllerConfig, DashboardController, DraftUpdate};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = leadboard::store::connect("https://abc.supabase.co", "anon-key");
//!     let controller = DashboardController::new(store, ControllerConfig::default());
//!
//!     // Load leads and start listening for changes
//!     controller.mount().await;
//!
//!     controller.open_modal().await;
//!     controller
//!         .update_draft(DraftUpdate {
//!             name: Some("Acme".to_string()),
//!             value: Some(1000.0),
//!             ..Default::default()
//!         })
//!         .await;
//!     controller.save().await;
//!
//!     let snapshot = controller.snapshot().await;
//!     println!("{} leads, {:.2} in pipeline", snapshot.metrics.lead_count, snapshot.metrics.total_value);
//!
//!     controller.unmount().await;
//! }
//! ```

pub mod api;
pub mod config;
pub mod dashboard;
pub mod logging;
pub mod store;
pub mod websocket;

// Re-export top-level types for convenience
pub use store::{
    ChangeEvent, ChangeKind, Lead, LeadDraft, LeadId, LeadStore, MemoryStore, Stage, StoreError,
    StoreHandle, StoreResult, SubscriptionHandle, SupabaseConfig, SupabaseStore, Vendor,
};

pub use dashboard::{
    ControllerConfig, DashboardController, DashboardEvent, DashboardSnapshot, DashboardState,
    DraftUpdate, Goals, Metrics, RefreshPolicy, Tab,
};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use websocket::{ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, websocket_handler};

pub use config::{Config, ConfigError, DashboardConfig, LoggingConfig, ServerConfig, StoreConfig};
