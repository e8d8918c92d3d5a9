//! Dashboard State
//!
//! In-memory UI state owned by the controller. Plain data; all mutation goes
//! through [`DashboardController`](super::DashboardController).

use serde::{Deserialize, Serialize};

use super::metrics::Metrics;
use crate::store::{ChangeEvent, ChangeKind, Lead, LeadDraft, LeadId, Stage, Vendor};

/// Which dashboard panel is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    Pipeline,
    Metrics,
}

/// Process-local targets, never persisted
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Goals {
    pub target_revenue: f64,
    pub target_ticket: f64,
}

/// Partial edit of the draft form; absent fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DraftUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub vendor: Option<Vendor>,
    #[serde(default)]
    pub stage: Option<Stage>,
}

impl DraftUpdate {
    pub fn apply(self, draft: &mut LeadDraft) {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(value) = self.value {
            draft.value = value;
        }
        if let Some(vendor) = self.vendor {
            draft.vendor = vendor;
        }
        if let Some(stage) = self.stage {
            draft.stage = stage;
        }
    }
}

/// Everything the dashboard shows
#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    /// Newest first, replaced wholesale on every applied list
    pub leads: Vec<Lead>,
    /// True until the first list attempt completes
    pub loading: bool,
    pub active_tab: Tab,
    pub modal_open: bool,
    pub draft: LeadDraft,
    pub goals: Goals,
    /// Whether a store handle exists
    pub persistence: bool,
    /// Sequence number of the last list response (or patch) applied
    #[serde(skip)]
    pub(crate) applied_seq: u64,
}

impl DashboardState {
    pub fn new(persistence: bool) -> Self {
        Self {
            leads: Vec::new(),
            loading: true,
            active_tab: Tab::default(),
            modal_open: false,
            draft: LeadDraft::default(),
            goals: Goals::default(),
            persistence,
            applied_seq: 0,
        }
    }

    pub fn find_lead(&self, id: &LeadId) -> Option<&Lead> {
        self.leads.iter().find(|l| &l.id == id)
    }

    pub fn metrics(&self) -> Metrics {
        Metrics::compute(&self.leads, &self.goals)
    }

    /// Patch the lead list from a change notification
    ///
    /// Returns false when the event doesn't carry enough to patch with; the
    /// caller then falls back to a full list.
    pub(crate) fn apply_change(&mut self, event: &ChangeEvent) -> bool {
        match (event.kind, &event.record) {
            (ChangeKind::Insert | ChangeKind::Update, Some(record)) => {
                if let Some(old_id) = &event.old_id {
                    self.remove_lead(old_id);
                }
                self.remove_lead(&record.id);
                self.insert_ordered(record.clone());
                true
            }
            (ChangeKind::Delete, _) => match &event.old_id {
                Some(id) => {
                    self.remove_lead(id);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn remove_lead(&mut self, id: &LeadId) {
        self.leads.retain(|l| &l.id != id);
    }

    /// Keep newest `created_at` first; ties put the incoming row first
    fn insert_ordered(&mut self, lead: Lead) {
        let position = self
            .leads
            .iter()
            .position(|l| l.created_at <= lead.created_at)
            .unwrap_or(self.leads.len());
        self.leads.insert(position, lead);
    }
}

/// Serializable view of the dashboard, state plus derived metrics
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    #[serde(flatten)]
    pub state: DashboardState,
    pub metrics: Metrics,
}

impl From<DashboardState> for DashboardSnapshot {
    fn from(state: DashboardState) -> Self {
        let metrics = state.metrics();
        Self { state, metrics }
    }
}
