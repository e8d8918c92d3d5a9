//! Store gateway error types

use thiserror::Error;

/// Errors that can occur when talking to the hosted store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport-level failure (connect, timeout, TLS...)
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status
    #[error("Store error {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body didn't match the lead schema
    #[error("Decode error: {0}")]
    Decode(String),

    /// Realtime protocol failure (join refused, bad frame, ...)
    #[error("Realtime error: {0}")]
    Realtime(String),

    /// WebSocket transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Change feed closed before it was released
    #[error("Subscription closed")]
    Closed,
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

impl StoreError {
    /// Whether the failure is worth retrying by the user
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Http(e) => e.is_timeout() || e.is_connect(),
            StoreError::Status { status, .. } => *status == 429 || *status >= 500,
            StoreError::WebSocket(_) | StoreError::Closed => true,
            StoreError::Decode(_) | StoreError::Realtime(_) => false,
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
