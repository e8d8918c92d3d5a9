//! WebSocket Message Types
//!
//! Defines all message types for WebSocket communication between
//! dashboard clients and the server.

use serde::{Deserialize, Serialize};

use crate::dashboard::{DashboardEvent, DashboardSnapshot};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for the current snapshot
    Snapshot,
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established
    Connected {
        /// Unique connection identifier
        connection_id: String,
    },
    /// Full dashboard state
    Snapshot {
        /// What changed; absent on connect and on request
        #[serde(skip_serializing_if = "Option::is_none")]
        cause: Option<DashboardEvent>,
        dashboard: DashboardSnapshot,
    },
    /// Pong response to ping
    Pong,
    /// Error message
    Error {
        /// Error description
        message: String,
    },
}
