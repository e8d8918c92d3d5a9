//! WebSocket Connection Hub
//!
//! Tracks live dashboard connections and enforces the connection limit.
//! Snapshots themselves are pushed per connection from the controller's
//! event channel.

use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
        }
    }
}

/// Registry of open connections
pub struct ConnectionHub {
    /// Active connections: ConnectionId → connect time
    connections: RwLock<HashMap<ConnectionId, Instant>>,
    config: HubConfig,
}

impl ConnectionHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Register a new WebSocket connection
    ///
    /// Returns the connection ID on success, or an error if the connection
    /// limit has been reached.
    pub async fn register(&self) -> Result<ConnectionId, HubError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections);
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(id.clone(), Instant::now());

        tracing::info!(connection_id = %id, "WebSocket connected");
        Ok(id)
    }

    pub async fn unregister(&self, id: &str) {
        if let Some(connected_at) = self.connections.write().await.remove(id) {
            tracing::info!(
                connection_id = %id,
                duration_secs = connected_at.elapsed().as_secs(),
                "WebSocket disconnected"
            );
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

/// Hub errors
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections")]
    TooManyConnections,
}
