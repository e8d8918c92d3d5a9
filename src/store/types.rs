//! Lead data model
//!
//! Types persisted in (and read back from) the hosted `leads` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Opaque key assigned by the store
///
/// The hosted table may use a numeric or a text primary key; both are kept
/// exactly as received so an upsert sends back the same JSON type.
/// Equality goes by the printed key, so `42` parsed from a URL path still
/// matches a text key `"42"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeadId {
    Number(i64),
    Text(String),
}

impl PartialEq for LeadId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LeadId::Number(a), LeadId::Number(b)) => a == b,
            (LeadId::Text(a), LeadId::Text(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl Eq for LeadId {}

impl Hash for LeadId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadId::Number(n) => write!(f, "{}", n),
            LeadId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl FromStr for LeadId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>()
            .map(LeadId::Number)
            .unwrap_or_else(|_| LeadId::Text(s.to_string())))
    }
}

impl From<i64> for LeadId {
    fn from(n: i64) -> Self {
        LeadId::Number(n)
    }
}

/// Salesperson a lead is assigned to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Vendor {
    #[default]
    Vendor1,
    Vendor2,
    Vendor3,
    /// Label stored by someone else that we don't know about
    Other(String),
}

impl Vendor {
    pub const ALL: [Vendor; 3] = [Vendor::Vendor1, Vendor::Vendor2, Vendor::Vendor3];

    pub fn label(&self) -> &str {
        match self {
            Vendor::Vendor1 => "Vendedor 1",
            Vendor::Vendor2 => "Vendedor 2",
            Vendor::Vendor3 => "Vendedor 3",
            Vendor::Other(label) => label,
        }
    }
}

impl From<String> for Vendor {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Vendedor 1" => Vendor::Vendor1,
            "Vendedor 2" => Vendor::Vendor2,
            "Vendedor 3" => Vendor::Vendor3,
            _ => Vendor::Other(label),
        }
    }
}

impl From<Vendor> for String {
    fn from(vendor: Vendor) -> Self {
        vendor.label().to_string()
    }
}

impl FromStr for Vendor {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Vendor::from(s.to_string()))
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pipeline stage of a lead
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
    #[default]
    Contact,
    Proposal,
    Negotiation,
    Won,
    Lost,
    Other(String),
}

impl Stage {
    /// Canonical pipeline order
    pub const ALL: [Stage; 5] = [
        Stage::Contact,
        Stage::Proposal,
        Stage::Negotiation,
        Stage::Won,
        Stage::Lost,
    ];

    pub fn label(&self) -> &str {
        match self {
            Stage::Contact => "contato",
            Stage::Proposal => "proposta",
            Stage::Negotiation => "negociacao",
            Stage::Won => "fechado",
            Stage::Lost => "perdido",
            Stage::Other(label) => label,
        }
    }
}

impl From<String> for Stage {
    fn from(label: String) -> Self {
        match label.as_str() {
            "contato" => Stage::Contact,
            "proposta" => Stage::Proposal,
            "negociacao" => Stage::Negotiation,
            "fechado" => Stage::Won,
            "perdido" => Stage::Lost,
            _ => Stage::Other(label),
        }
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        stage.label().to_string()
    }
}

impl FromStr for Stage {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Stage::from(s.to_string()))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Missing and `null` columns both decode to the default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A row of the `leads` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vendor: Vendor,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stage: Stage,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Editable fields of a lead, staged by the form before an upsert
///
/// A draft without an `id` is an insert; with one it overwrites that row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LeadDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LeadId>,
    pub name: String,
    pub value: f64,
    pub vendor: Vendor,
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl LeadDraft {
    /// Create a draft for a new lead
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            ..Default::default()
        }
    }

    /// Builder: set vendor
    pub fn vendor(mut self, vendor: Vendor) -> Self {
        self.vendor = vendor;
        self
    }

    /// Builder: set stage
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    /// Stamp the last-update time; the store never does this itself
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        self.last_update = Some(now);
        self
    }
}

impl From<&Lead> for LeadDraft {
    fn from(lead: &Lead) -> Self {
        Self {
            id: Some(lead.id.clone()),
            name: lead.name.clone(),
            value: lead.value,
            vendor: lead.vendor.clone(),
            stage: lead.stage.clone(),
            last_update: lead.last_update,
        }
    }
}

/// Kind of row change reported by the change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// Something changed but the feed didn't say what
    Unknown,
}

/// A change notification for the watched table
///
/// `record` is the new row (insert/update); `old_id` the key of the removed
/// or replaced row. Either may be missing depending on the table's replica
/// identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub record: Option<Lead>,
    pub old_id: Option<LeadId>,
}

impl ChangeEvent {
    pub fn insert(lead: Lead) -> Self {
        Self {
            kind: ChangeKind::Insert,
            record: Some(lead),
            old_id: None,
        }
    }

    pub fn update(lead: Lead) -> Self {
        let old_id = Some(lead.id.clone());
        Self {
            kind: ChangeKind::Update,
            record: Some(lead),
            old_id,
        }
    }

    pub fn delete(id: LeadId) -> Self {
        Self {
            kind: ChangeKind::Delete,
            record: None,
            old_id: Some(id),
        }
    }

    /// A change with no usable payload
    pub fn unknown() -> Self {
        Self {
            kind: ChangeKind::Unknown,
            record: None,
            old_id: None,
        }
    }
}
