//! Dashboard Controller
//!
//! Owns the dashboard state and issues list/upsert/subscribe against the
//! store handle. Without a handle every store-backed operation is a no-op
//! and the dashboard stays an empty, local-only shell.
//!
//! ## Ordering
//!
//! List requests can overlap (mount, save, API refreshes and change
//! notifications all trigger them). Each one takes a number from a monotonic
//! counter before it is sent, and a response is applied only if no newer one
//! has been applied already.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use super::policy::RefreshPolicy;
use super::state::{DashboardSnapshot, DashboardState, DraftUpdate, Goals, Tab};
use crate::store::{ChangeCallback, ChangeEvent, ChangeKind, Lead, LeadDraft, LeadId, Stage, StoreHandle, SubscriptionHandle};

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub refresh_policy: RefreshPolicy,
    /// Capacity of the dashboard event broadcast channel
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            refresh_policy: RefreshPolicy::default(),
            event_capacity: 64,
        }
    }
}

/// Something observers of the dashboard should re-render for
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// A list response replaced the leads
    Refreshed { lead_count: usize },
    /// A change notification was applied in place
    Patched { kind: ChangeKind },
    /// A lead was upserted
    Saved { id: Option<LeadId> },
    /// Local UI state (tab, modal, draft, goals, loading) changed
    StateChanged,
}

pub struct DashboardController {
    store: Option<StoreHandle>,
    state: RwLock<DashboardState>,
    policy: RefreshPolicy,
    request_seq: AtomicU64,
    mounted: AtomicBool,
    subscription: Mutex<Option<SubscriptionHandle>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<DashboardEvent>,
}

impl DashboardController {
    pub fn new(store: Option<StoreHandle>, config: ControllerConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let persistence = store.is_some();

        Arc::new(Self {
            store,
            state: RwLock::new(DashboardState::new(persistence)),
            policy: config.refresh_policy,
            request_seq: AtomicU64::new(0),
            mounted: AtomicBool::new(false),
            subscription: Mutex::new(None),
            listener: Mutex::new(None),
            events,
        })
    }

    /// Whether a store handle exists
    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: DashboardEvent) {
        // No observers is fine
        let _ = self.events.send(event);
    }

    fn next_seq(&self) -> u64 {
        self.request_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    // ============================================
    // Lifecycle
    // ============================================

    /// Load the leads and open the change subscription
    ///
    /// Mounting an already-mounted controller does nothing.
    pub async fn mount(self: &Arc<Self>) {
        if self.mounted.swap(true, Ordering::SeqCst) {
            tracing::debug!("Dashboard already mounted");
            return;
        }

        let Some(store) = self.store.clone() else {
            tracing::info!("No store configured, dashboard running without persistence");
            self.state.write().await.loading = false;
            self.emit(DashboardEvent::StateChanged);
            return;
        };

        self.refresh().await;

        let (tx, mut rx) = mpsc::unbounded_channel::<ChangeEvent>();
        let on_change: ChangeCallback = Arc::new(move |event: ChangeEvent| {
            let _ = tx.send(event);
        });

        match store.subscribe(on_change).await {
            Ok(handle) => {
                tracing::info!(
                    store = store.name(),
                    subscription_id = %handle.id(),
                    policy = ?self.policy,
                    "Subscribed to lead changes"
                );
                *self.subscription.lock().await = Some(handle);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to subscribe to lead changes");
                return;
            }
        }

        let controller: Weak<Self> = Arc::downgrade(self);
        let listener = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                controller.handle_change(event).await;
            }
        });
        *self.listener.lock().await = Some(listener);
    }

    /// Release the change subscription
    pub async fn unmount(&self) {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self.subscription.lock().await.take() {
            handle.unsubscribe().await;
        }
        if let Some(listener) = self.listener.lock().await.take() {
            listener.abort();
        }

        tracing::info!("Dashboard unmounted");
    }

    pub async fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| h.is_active())
    }

    // ============================================
    // Store-backed operations
    // ============================================

    /// Re-list the leads
    ///
    /// Returns true if the response was applied. Failures and stale
    /// responses leave the current list untouched; `loading` is cleared
    /// either way.
    pub async fn refresh(&self) -> bool {
        let Some(store) = &self.store else {
            self.clear_loading().await;
            return false;
        };

        let seq = self.next_seq();
        let result = store.list_leads().await;

        let mut state = self.state.write().await;
        state.loading = false;

        match result {
            Ok(leads) => {
                if seq <= state.applied_seq {
                    tracing::debug!(seq, applied = state.applied_seq, "Discarding stale lead list");
                    return false;
                }

                state.applied_seq = seq;
                state.leads = leads;
                let lead_count = state.leads.len();
                drop(state);

                tracing::debug!(seq, lead_count, "Lead list refreshed");
                self.emit(DashboardEvent::Refreshed { lead_count });
                true
            }
            Err(e) => {
                drop(state);
                tracing::warn!(error = %e, transient = e.is_transient(), "Failed to list leads, keeping previous list");
                self.emit(DashboardEvent::StateChanged);
                false
            }
        }
    }

    async fn clear_loading(&self) {
        let mut state = self.state.write().await;
        if state.loading {
            state.loading = false;
            drop(state);
            self.emit(DashboardEvent::StateChanged);
        }
    }

    /// Save the draft, stamping it with the current time
    pub async fn save(&self) -> bool {
        self.save_at(Utc::now()).await
    }

    /// Save the draft with an explicit last-update time
    ///
    /// On success the list is refreshed and the modal closed. On failure the
    /// modal stays open with the draft as entered.
    pub async fn save_at(&self, now: DateTime<Utc>) -> bool {
        let Some(store) = &self.store else {
            tracing::debug!("Save ignored, no store configured");
            return false;
        };

        let record = {
            let mut state = self.state.write().await;
            state.draft.last_update = Some(now);
            state.draft.clone()
        };

        if let Err(e) = store.upsert_lead(&record).await {
            tracing::warn!(error = %e, transient = e.is_transient(), name = %record.name, "Failed to save lead");
            return false;
        }

        tracing::info!(lead_id = ?record.id, name = %record.name, stage = %record.stage, "Lead saved");
        self.refresh().await;
        self.state.write().await.modal_open = false;
        self.emit(DashboardEvent::Saved { id: record.id });
        true
    }

    /// Overwrite a lead's stage (full-record upsert)
    pub async fn move_to_stage(&self, id: &LeadId, stage: Stage) -> bool {
        self.move_to_stage_at(id, stage, Utc::now()).await
    }

    pub async fn move_to_stage_at(&self, id: &LeadId, stage: Stage, now: DateTime<Utc>) -> bool {
        let Some(store) = &self.store else {
            return false;
        };

        let record = {
            let state = self.state.read().await;
            match state.find_lead(id) {
                Some(lead) => LeadDraft::from(lead).stage(stage).stamped(now),
                None => {
                    tracing::debug!(lead_id = %id, "Stage move ignored, lead not loaded");
                    return false;
                }
            }
        };

        if let Err(e) = store.upsert_lead(&record).await {
            tracing::warn!(error = %e, lead_id = %id, "Failed to move lead");
            return false;
        }

        tracing::info!(lead_id = %id, stage = %record.stage, "Lead moved");
        self.refresh().await;
        self.emit(DashboardEvent::Saved { id: record.id });
        true
    }

    /// React to one change notification according to the refresh policy
    pub async fn handle_change(&self, event: ChangeEvent) {
        match self.policy {
            RefreshPolicy::FullReload => {
                self.refresh().await;
            }
            RefreshPolicy::DeltaPatch => {
                let seq = self.next_seq();
                let patched = {
                    let mut state = self.state.write().await;
                    if state.apply_change(&event) {
                        state.applied_seq = state.applied_seq.max(seq);
                        true
                    } else {
                        false
                    }
                };

                if patched {
                    tracing::debug!(kind = ?event.kind, seq, "Applied lead change in place");
                    self.emit(DashboardEvent::Patched { kind: event.kind });
                } else {
                    tracing::debug!(kind = ?event.kind, "Change payload incomplete, reloading");
                    self.refresh().await;
                }
            }
        }
    }

    // ============================================
    // Local UI state
    // ============================================

    pub async fn open_modal(&self) {
        self.update(|state| state.modal_open = true).await;
    }

    pub async fn close_modal(&self) {
        self.update(|state| state.modal_open = false).await;
    }

    pub async fn set_tab(&self, tab: Tab) {
        self.update(|state| state.active_tab = tab).await;
    }

    pub async fn update_draft(&self, update: DraftUpdate) {
        self.update(|state| update.apply(&mut state.draft)).await;
    }

    /// Replace the draft wholesale
    pub async fn set_draft(&self, draft: LeadDraft) {
        self.update(|state| state.draft = draft).await;
    }

    /// Update goals; `None` leaves a figure unchanged
    pub async fn set_goals(&self, target_revenue: Option<f64>, target_ticket: Option<f64>) -> Goals {
        let mut state = self.state.write().await;
        if let Some(revenue) = target_revenue {
            state.goals.target_revenue = revenue;
        }
        if let Some(ticket) = target_ticket {
            state.goals.target_ticket = ticket;
        }
        let goals = state.goals;
        drop(state);

        self.emit(DashboardEvent::StateChanged);
        goals
    }

    /// Load an existing lead into the draft and open the modal
    pub async fn edit_lead(&self, id: &LeadId) -> bool {
        let mut state = self.state.write().await;
        let Some(draft) = state.find_lead(id).map(LeadDraft::from) else {
            return false;
        };
        state.draft = draft;
        state.modal_open = true;
        drop(state);

        self.emit(DashboardEvent::StateChanged);
        true
    }

    async fn update(&self, f: impl FnOnce(&mut DashboardState)) {
        f(&mut *self.state.write().await);
        self.emit(DashboardEvent::StateChanged);
    }

    // ============================================
    // Reads
    // ============================================

    pub async fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot::from(self.state.read().await.clone())
    }

    pub async fn leads(&self) -> Vec<Lead> {
        self.state.read().await.leads.clone()
    }

    pub async fn find_lead(&self, id: &LeadId) -> Option<Lead> {
        self.state.read().await.find_lead(id).cloned()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }
}

impl Drop for DashboardController {
    fn drop(&mut self) {
        if let Ok(mut listener) = self.listener.try_lock() {
            if let Some(task) = listener.take() {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LeadStore, MemoryStore, StoreError, StoreResult, Vendor};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn controller_with(store: Arc<MemoryStore>, policy: RefreshPolicy) -> Arc<DashboardController> {
        DashboardController::new(
            Some(store as StoreHandle),
            ControllerConfig {
                refresh_policy: policy,
                ..Default::default()
            },
        )
    }

    /// Poll until `check` holds or a second passes
    async fn eventually<F: Fn() -> bool>(check: F) -> bool {
        for _ in 0..100 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        check()
    }

    #[tokio::test]
    async fn test_offline_mount_never_touches_store() {
        let controller = DashboardController::new(None, ControllerConfig::default());
        controller.mount().await;

        let snapshot = controller.snapshot().await;
        assert!(!snapshot.state.loading);
        assert!(!snapshot.state.persistence);
        assert!(snapshot.state.leads.is_empty());

        // Local interaction still works
        controller.open_modal().await;
        controller.update_draft(DraftUpdate {
            name: Some("Acme".to_string()),
            ..Default::default()
        })
        .await;
        assert!(!controller.save().await);
        assert!(!controller.refresh().await);
        controller.set_goals(Some(5000.0), None).await;

        let snapshot = controller.snapshot().await;
        assert!(snapshot.state.modal_open);
        assert_eq!(snapshot.state.goals.target_revenue, 5000.0);
        assert!(!controller.is_subscribed().await);
        controller.unmount().await;
    }

    #[tokio::test]
    async fn test_acme_scenario() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_with(Arc::clone(&store), RefreshPolicy::FullReload);
        controller.mount().await;
        assert!(!controller.is_loading().await);
        assert!(controller.leads().await.is_empty());

        controller.open_modal().await;
        controller
            .update_draft(DraftUpdate {
                name: Some("Acme".to_string()),
                value: Some(1000.0),
                vendor: Some(Vendor::Vendor1),
                stage: None,
            })
            .await;

        let stamped = Utc.with_ymd_and_hms(2024, 6, 1, 15, 30, 0).unwrap();
        assert!(controller.save_at(stamped).await);

        assert_eq!(store.row_count().await, 1);
        let row = store.list_leads().await.unwrap().remove(0);
        assert_eq!(row.name, "Acme");
        assert_eq!(row.value, 1000.0);
        assert_eq!(row.vendor, Vendor::Vendor1);
        assert_eq!(row.stage, Stage::Contact);
        assert_eq!(row.last_update, Some(stamped));

        let snapshot = controller.snapshot().await;
        assert!(!snapshot.state.modal_open);
        assert_eq!(snapshot.state.leads.len(), 1);
        // Draft isn't reset after a save
        assert_eq!(snapshot.state.draft.name, "Acme");

        controller.unmount().await;
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_lists_all_rows_newest_first() {
        let store = Arc::new(MemoryStore::new());
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            store.seed(Lead {
                id: LeadId::Number(i as i64 + 1),
                name: name.to_string(),
                value: 1.0,
                vendor: Vendor::Vendor2,
                stage: Stage::Contact,
                last_update: None,
                created_at: Utc.with_ymd_and_hms(2024, 1, 1 + i as u32, 0, 0, 0).unwrap(),
            })
            .await;
        }

        let controller = controller_with(Arc::clone(&store), RefreshPolicy::FullReload);
        assert!(controller.refresh().await);

        let names: Vec<_> = controller.leads().await.into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_save_existing_key_overwrites() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_lead(&LeadDraft::new("Acme", 1000.0)).await.unwrap();

        let controller = controller_with(Arc::clone(&store), RefreshPolicy::FullReload);
        controller.refresh().await;
        let id = controller.leads().await[0].id.clone();

        assert!(controller.edit_lead(&id).await);
        assert!(controller.snapshot().await.state.modal_open);
        controller
            .update_draft(DraftUpdate {
                value: Some(2500.0),
                ..Default::default()
            })
            .await;
        assert!(controller.save().await);

        assert_eq!(store.row_count().await, 1);
        assert_eq!(store.get(&id).await.unwrap().value, 2500.0);
        assert_eq!(controller.leads().await[0].value, 2500.0);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_modal_and_draft() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_with(Arc::clone(&store), RefreshPolicy::FullReload);
        controller.mount().await;

        controller.open_modal().await;
        controller.set_draft(LeadDraft::new("Acme", 1000.0)).await;
        store.set_unavailable(true);

        assert!(!controller.save().await);
        let snapshot = controller.snapshot().await;
        assert!(snapshot.state.modal_open);
        assert_eq!(snapshot.state.draft.name, "Acme");
        assert_eq!(store.row_count().await, 0);
        assert_eq!(store.upsert_calls(), 1);

        controller.unmount().await;
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_list() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_lead(&LeadDraft::new("Acme", 1.0)).await.unwrap();
        let controller = controller_with(Arc::clone(&store), RefreshPolicy::FullReload);
        assert!(controller.refresh().await);

        store.set_unavailable(true);
        assert!(!controller.refresh().await);
        assert_eq!(controller.leads().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_first_refresh_clears_loading() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let controller = controller_with(Arc::clone(&store), RefreshPolicy::FullReload);

        controller.mount().await;
        assert!(!controller.is_loading().await);
        assert!(controller.leads().await.is_empty());
        controller.unmount().await;
    }

    #[tokio::test]
    async fn test_remote_change_triggers_exactly_one_refresh() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_with(Arc::clone(&store), RefreshPolicy::FullReload);
        controller.mount().await;
        assert_eq!(store.list_calls(), 1);

        // A write from another client
        store.upsert_lead(&LeadDraft::new("Remote", 10.0)).await.unwrap();

        assert!(eventually(|| store.list_calls() == 2).await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.list_calls(), 2);
        assert_eq!(controller.leads().await.len(), 1);

        controller.unmount().await;
    }

    #[tokio::test]
    async fn test_mount_twice_subscribes_once() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_with(Arc::clone(&store), RefreshPolicy::FullReload);
        controller.mount().await;
        controller.mount().await;

        assert_eq!(store.subscriber_count(), 1);
        assert_eq!(store.list_calls(), 1);
        assert!(controller.is_subscribed().await);

        controller.unmount().await;
        assert_eq!(store.subscriber_count(), 0);
        assert!(!controller.is_subscribed().await);
    }

    #[tokio::test]
    async fn test_delta_patch_applies_without_listing() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_with(Arc::clone(&store), RefreshPolicy::DeltaPatch);
        controller.mount().await;
        let mut events = controller.subscribe_events();

        store.upsert_lead(&LeadDraft::new("Remote", 10.0)).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, DashboardEvent::Patched { kind: ChangeKind::Insert });
        assert_eq!(controller.leads().await[0].name, "Remote");
        assert_eq!(store.list_calls(), 1);

        controller.unmount().await;
    }

    #[tokio::test]
    async fn test_delta_patch_falls_back_to_reload() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_with(Arc::clone(&store), RefreshPolicy::DeltaPatch);
        store.upsert_lead(&LeadDraft::new("Acme", 10.0)).await.unwrap();

        controller.handle_change(ChangeEvent::unknown()).await;
        assert_eq!(store.list_calls(), 1);
        assert_eq!(controller.leads().await.len(), 1);
    }

    #[tokio::test]
    async fn test_move_to_stage_overwrites_record() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_lead(&LeadDraft::new("Acme", 10.0)).await.unwrap();
        let controller = controller_with(Arc::clone(&store), RefreshPolicy::FullReload);
        controller.refresh().await;
        let id = controller.leads().await[0].id.clone();

        let now = Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap();
        assert!(controller.move_to_stage_at(&id, Stage::Negotiation, now).await);

        let row = store.get(&id).await.unwrap();
        assert_eq!(row.stage, Stage::Negotiation);
        assert_eq!(row.last_update, Some(now));
        assert_eq!(row.name, "Acme");
        assert!(!controller.move_to_stage(&LeadId::Number(999), Stage::Won).await);
    }

    /// Store whose list responses are released by the test, in any order
    struct GatedStore {
        gates: std::sync::Mutex<VecDeque<oneshot::Receiver<Vec<Lead>>>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LeadStore for GatedStore {
        fn name(&self) -> &str {
            "gated"
        }

        async fn list_leads(&self) -> StoreResult<Vec<Lead>> {
            let gate = self.gates.lock().unwrap().pop_front();
            self.calls.fetch_add(1, Ordering::SeqCst);
            match gate {
                Some(gate) => gate.await.map_err(|_| StoreError::Closed),
                None => Err(StoreError::Closed),
            }
        }

        async fn upsert_lead(&self, _record: &LeadDraft) -> StoreResult<()> {
            Ok(())
        }

        async fn subscribe(&self, _on_change: ChangeCallback) -> StoreResult<SubscriptionHandle> {
            Err(StoreError::Closed)
        }
    }

    fn named(id: i64, name: &str) -> Lead {
        Lead {
            id: LeadId::Number(id),
            name: name.to_string(),
            value: 0.0,
            vendor: Vendor::Vendor1,
            stage: Stage::Contact,
            last_update: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_stale_list_response_is_discarded() {
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        let store = Arc::new(GatedStore {
            gates: std::sync::Mutex::new(VecDeque::from(vec![first_rx, second_rx])),
            calls: AtomicUsize::new(0),
        });
        let controller = DashboardController::new(Some(store.clone() as StoreHandle), ControllerConfig::default());

        let slow = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.refresh().await }
        });
        assert!(eventually(|| store.calls.load(Ordering::SeqCst) == 1).await);

        let fast = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.refresh().await }
        });
        assert!(eventually(|| store.calls.load(Ordering::SeqCst) == 2).await);

        // Newer request answers first
        second_tx.send(vec![named(2, "fresh")]).unwrap();
        assert!(fast.await.unwrap());

        // Older response lands last and must not win
        first_tx.send(vec![named(1, "stale")]).unwrap();
        assert!(!slow.await.unwrap());

        let leads = controller.leads().await;
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].name, "fresh");
    }

    #[tokio::test]
    async fn test_patch_discards_list_already_in_flight() {
        let (list_tx, list_rx) = oneshot::channel();
        let store = Arc::new(GatedStore {
            gates: std::sync::Mutex::new(VecDeque::from(vec![list_rx])),
            calls: AtomicUsize::new(0),
        });
        let config = ControllerConfig {
            refresh_policy: RefreshPolicy::DeltaPatch,
            ..Default::default()
        };
        let controller = DashboardController::new(Some(store.clone() as StoreHandle), config);

        let pending = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.refresh().await }
        });
        assert!(eventually(|| store.calls.load(Ordering::SeqCst) == 1).await);

        controller.handle_change(ChangeEvent::insert(named(7, "patched"))).await;
        assert_eq!(controller.leads().await.len(), 1);

        // List requested before the patch lands after it and is dropped
        list_tx.send(vec![named(1, "before patch")]).unwrap();
        assert!(!pending.await.unwrap());

        let leads = controller.leads().await;
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].name, "patched");
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }
}
