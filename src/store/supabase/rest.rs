//! PostgREST client
//!
//! HTTP client for the hosted table endpoint (`/rest/v1/<table>`).

use reqwest::{Client, RequestBuilder, Response};

use super::SupabaseConfig;
use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{Lead, LeadDraft};

/// REST client for the lead table
pub struct RestClient {
    client: Client,
    config: SupabaseConfig,
}

impl RestClient {
    /// Build the client; fails only if the TLS backend can't be initialised
    pub fn new(config: SupabaseConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&self.config.table)
        )
    }

    /// Attach the access key and, for non-default schemas, the profile header
    fn authorize(&self, request: RequestBuilder, profile_header: &str) -> RequestBuilder {
        let request = request
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", self.config.anon_key));

        if self.config.schema != "public" {
            request.header(profile_header, &self.config.schema)
        } else {
            request
        }
    }

    /// Fetch every row, newest first
    pub async fn list(&self) -> StoreResult<Vec<Lead>> {
        let request = self
            .client
            .get(self.table_url())
            .query(&[("select", "*"), ("order", "created_at.desc")]);

        let response = self.authorize(request, "Accept-Profile").send().await?;
        let body = check_status(response).await?.text().await?;

        let leads: Vec<Lead> = serde_json::from_str(&body)?;
        tracing::debug!(count = leads.len(), table = %self.config.table, "Listed leads");
        Ok(leads)
    }

    /// Insert-or-update keyed by `id`
    pub async fn upsert(&self, record: &LeadDraft) -> StoreResult<()> {
        let request = self
            .client
            .post(self.table_url())
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(record);

        let response = self.authorize(request, "Content-Profile").send().await?;
        check_status(response).await?;

        tracing::debug!(
            lead_id = ?record.id,
            name = %record.name,
            "Upserted lead"
        );
        Ok(())
    }
}

async fn check_status(response: Response) -> StoreResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Status { status, message })
}
