//! Remote Store Gateway
//!
//! Handle to the hosted lead table:
//!
//! - **types**: Lead, LeadDraft, Vendor, Stage, change events
//! - **gateway**: `LeadStore` trait and subscription handle
//! - **supabase**: hosted backend (PostgREST rows + realtime change feed)
//! - **memory**: in-process backend with the same contract
//! - **error**: Error types
//!
//! The handle is opened once at startup with [`connect`]. When either
//! connection value is missing there is no handle at all and the dashboard
//! runs without persistence.
//!
//! # Example
//!
//! ```rust,no_run
//! use leadboard::store::{self, LeadDraft};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let Some(store) = store::connect("https://abc.supabase.co", "anon-key") else {
//!         return Ok(());
//!     };
//!
//!     store
//!         .upsert_lead(&LeadDraft::new("Acme", 1000.0).stamped(chrono::Utc::now()))
//!         .await?;
//!     let leads = store.list_leads().await?;
//!     println!("{} leads", leads.len());
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod gateway;
pub mod memory;
pub mod supabase;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use gateway::{ChangeCallback, LeadStore, StoreHandle, SubscriptionHandle};
pub use memory::MemoryStore;
pub use supabase::{SupabaseConfig, SupabaseStore};
pub use types::{ChangeEvent, ChangeKind, Lead, LeadDraft, LeadId, Stage, Vendor};

use std::sync::Arc;

/// Open the hosted store with default table settings
///
/// Returns `None` when either value is empty.
pub fn connect(url: &str, anon_key: &str) -> Option<StoreHandle> {
    connect_with(SupabaseConfig::new(url.trim(), anon_key.trim()))
}

/// Open the hosted store with explicit settings
pub fn connect_with(config: SupabaseConfig) -> Option<StoreHandle> {
    if config.url.trim().is_empty() || config.anon_key.trim().is_empty() {
        tracing::info!("Store URL or key not set, persistence disabled");
        return None;
    }

    if let Err(e) = reqwest::Url::parse(config.url.trim()) {
        tracing::warn!(url = %config.url, error = %e, "Invalid store URL, persistence disabled");
        return None;
    }

    match SupabaseStore::new(config) {
        Ok(store) => {
            tracing::info!(url = %store.config().url, table = %store.config().table, "Store connected");
            Some(Arc::new(store))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build store client, persistence disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_requires_both_values() {
        assert!(connect("", "key").is_none());
        assert!(connect("https://abc.supabase.co", "").is_none());
        assert!(connect("   ", "  ").is_none());
    }

    #[test]
    fn test_connect_valid_pair() {
        let store = connect("https://abc.supabase.co", "anon-key").unwrap();
        assert_eq!(store.name(), "supabase");
    }

    #[test]
    fn test_connect_rejects_unparseable_url() {
        assert!(connect("not a url", "anon-key").is_none());
    }
}
