//! Hosted backend
//!
//! Lead store backed by a hosted Postgres project: rows through the PostgREST
//! endpoint, change notifications through the realtime socket.

mod channel;
pub mod protocol;
mod rest;

pub use rest::RestClient;

use async_trait::async_trait;

use crate::store::error::StoreResult;
use crate::store::gateway::{ChangeCallback, LeadStore, SubscriptionHandle};
use crate::store::types::{Lead, LeadDraft};

/// Connection settings for the hosted backend
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL (e.g., "https://abc.supabase.co")
    pub url: String,
    /// Anonymous access key
    pub anon_key: String,
    /// Schema holding the table
    pub schema: String,
    /// Lead table name
    pub table: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Realtime heartbeat interval in seconds
    pub heartbeat_interval_secs: u64,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            schema: "public".to_string(),
            table: "leads".to_string(),
            request_timeout_ms: 10_000,
            heartbeat_interval_secs: 25,
        }
    }
}

/// Lead store talking to the hosted backend
pub struct SupabaseStore {
    rest: RestClient,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> StoreResult<Self> {
        Ok(Self {
            rest: RestClient::new(config)?,
        })
    }

    pub fn config(&self) -> &SupabaseConfig {
        self.rest.config()
    }
}

#[async_trait]
impl LeadStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn list_leads(&self) -> StoreResult<Vec<Lead>> {
        self.rest.list().await
    }

    async fn upsert_lead(&self, record: &LeadDraft) -> StoreResult<()> {
        self.rest.upsert(record).await
    }

    async fn subscribe(&self, on_change: ChangeCallback) -> StoreResult<SubscriptionHandle> {
        channel::open(self.rest.config(), on_change).await
    }
}
