//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::dashboard::{DashboardSnapshot, Tab};
use crate::store::{Lead, Stage};

// ============================================
// DASHBOARD DTOs
// ============================================

/// Lead list response
#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    /// Number of leads
    pub total: usize,
    /// Leads, newest first
    pub leads: Vec<Lead>,
}

/// Refresh response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// Whether the list was replaced
    pub refreshed: bool,
    pub dashboard: DashboardSnapshot,
}

/// Tab switch request
#[derive(Debug, Deserialize)]
pub struct TabRequest {
    pub tab: Tab,
}

// ============================================
// DRAFT DTOs
// ============================================

/// Save response
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    /// Whether the store accepted the record
    pub saved: bool,
    pub dashboard: DashboardSnapshot,
}

// ============================================
// LEAD DTOs
// ============================================

/// Stage move request
#[derive(Debug, Deserialize)]
pub struct StageRequest {
    /// One of the canonical stage labels
    pub stage: Stage,
}

/// Stage move response
#[derive(Debug, Serialize)]
pub struct StageResponse {
    pub moved: bool,
    pub dashboard: DashboardSnapshot,
}

// ============================================
// GOALS DTOs
// ============================================

/// Goals update; absent figures stay as they are
#[derive(Debug, Default, Deserialize)]
pub struct GoalsRequest {
    #[serde(default)]
    pub target_revenue: Option<f64>,
    #[serde(default)]
    pub target_ticket: Option<f64>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy or degraded (no persistence)
    pub status: String,
    /// Whether a store handle exists
    pub persistence: bool,
    /// Whether the change subscription is live
    pub subscribed: bool,
    /// Leads currently loaded
    pub lead_count: usize,
    /// Open WebSocket connections
    pub ws_connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
