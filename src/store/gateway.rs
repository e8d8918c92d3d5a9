//! Store Gateway
//!
//! The contract every lead backend implements, plus the handle returned for
//! a live change subscription.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::error::StoreResult;
use super::types::{ChangeEvent, Lead, LeadDraft};

/// Callback invoked once per change on the watched table
pub type ChangeCallback = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Shared, process-scoped store handle
pub type StoreHandle = Arc<dyn LeadStore>;

/// How long `unsubscribe` waits for the feed task to wind down
const UNSUBSCRIBE_GRACE: Duration = Duration::from_secs(5);

/// Common trait for lead backends
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// All leads, newest `created_at` first
    async fn list_leads(&self) -> StoreResult<Vec<Lead>>;

    /// Insert the record if it has no matching key, overwrite otherwise
    ///
    /// Callers stamp `last_update` before calling.
    async fn upsert_lead(&self, record: &LeadDraft) -> StoreResult<()>;

    /// Open a long-lived change feed for the lead table
    async fn subscribe(&self, on_change: ChangeCallback) -> StoreResult<SubscriptionHandle>;
}

/// A live change subscription
///
/// Release it with [`SubscriptionHandle::unsubscribe`]. Dropping an
/// unreleased handle aborts the feed task so the connection never outlives it.
pub struct SubscriptionHandle {
    id: Uuid,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Wrap a feed task that stops when `shutdown` fires
    pub fn new(shutdown: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self {
            id: Uuid::new_v4(),
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the feed task is still running
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Release the channel
    pub async fn unsubscribe(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            match tokio::time::timeout(UNSUBSCRIBE_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_cancelled() => {}
                Ok(Err(e)) => {
                    tracing::warn!(subscription_id = %self.id, error = %e, "Change feed task failed");
                }
                Err(_) => {
                    tracing::warn!(subscription_id = %self.id, "Change feed did not stop in time, aborting");
                    abort.abort();
                }
            }
        }

        tracing::debug!(subscription_id = %self.id, "Change subscription released");
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            tracing::debug!(subscription_id = %self.id, "Dropping unreleased change subscription");
            task.abort();
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
