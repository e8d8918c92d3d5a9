//! In-memory lead store
//!
//! Same contract as the hosted backend: assigns keys, orders by creation
//! time and fans every write out to subscribers over a broadcast channel.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, oneshot, RwLock};

use super::error::{StoreError, StoreResult};
use super::gateway::{ChangeCallback, LeadStore, SubscriptionHandle};
use super::types::{ChangeEvent, Lead, LeadDraft, LeadId};

const CHANGE_CAPACITY: usize = 256;

/// Lead store kept entirely in process memory
pub struct MemoryStore {
    /// Rows, newest first
    rows: RwLock<Vec<Lead>>,
    next_id: AtomicI64,
    changes: broadcast::Sender<ChangeEvent>,
    unavailable: AtomicBool,
    list_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            rows: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
            changes,
            unavailable: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            upsert_calls: AtomicUsize::new(0),
        }
    }

    /// Insert a fully-formed row without notifying subscribers
    pub async fn seed(&self, lead: Lead) {
        if let LeadId::Number(n) = lead.id {
            self.next_id.fetch_max(n.saturating_add(1), Ordering::SeqCst);
        }
        self.rows.write().await.insert(0, lead);
    }

    /// Make every list/upsert fail with a 503 until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn row_count(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn get(&self, id: &LeadId) -> Option<Lead> {
        self.rows.read().await.iter().find(|l| &l.id == id).cloned()
    }

    /// Number of `list_leads` calls served so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `upsert_lead` calls served so far
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Live change subscribers
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                message: "store unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn publish(&self, event: ChangeEvent) {
        // No receivers is fine
        let _ = self.changes.send(event);
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_leads(&self) -> StoreResult<Vec<Lead>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut leads = self.rows.read().await.clone();
        // Stable: ties keep newest-inserted first
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    async fn upsert_lead(&self, record: &LeadDraft) -> StoreResult<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut rows = self.rows.write().await;

        if let Some(id) = &record.id {
            if let Some(row) = rows.iter_mut().find(|l| &l.id == id) {
                row.name = record.name.clone();
                row.value = record.value;
                row.vendor = record.vendor.clone();
                row.stage = record.stage.clone();
                row.last_update = record.last_update;
                let updated = row.clone();
                drop(rows);

                tracing::debug!(lead_id = %id, "Updated lead");
                self.publish(ChangeEvent::update(updated));
                return Ok(());
            }
        }

        let id = match &record.id {
            Some(id) => id.clone(),
            None => LeadId::Number(self.next_id.fetch_add(1, Ordering::SeqCst)),
        };
        let lead = Lead {
            id: id.clone(),
            name: record.name.clone(),
            value: record.value,
            vendor: record.vendor.clone(),
            stage: record.stage.clone(),
            last_update: record.last_update,
            created_at: Utc::now(),
        };
        rows.insert(0, lead.clone());
        drop(rows);

        tracing::debug!(lead_id = %id, "Inserted lead");
        self.publish(ChangeEvent::insert(lead));
        Ok(())
    }

    async fn subscribe(&self, on_change: ChangeCallback) -> StoreResult<SubscriptionHandle> {
        let mut rx = self.changes.subscribe();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    event = rx.recv() => match event {
                        Ok(event) => on_change(event),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Change feed lagged");
                            on_change(ChangeEvent::unknown());
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });

        Ok(SubscriptionHandle::new(shutdown_tx, task))
    }
}
