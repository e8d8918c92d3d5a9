//! Refresh policy
//!
//! How the controller reacts to a change notification.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Re-list the whole table on every notification
    #[default]
    FullReload,
    /// Apply the notification's row to the in-memory list, re-listing only
    /// when the payload is incomplete
    DeltaPatch,
}

impl FromStr for RefreshPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "full_reload" | "full" => Ok(RefreshPolicy::FullReload),
            "delta_patch" | "delta" => Ok(RefreshPolicy::DeltaPatch),
            other => Err(format!("Unknown refresh policy: {}", other)),
        }
    }
}
