//! View/State Controller
//!
//! Everything the lead dashboard shows and how it changes:
//!
//! - **state**: Leads, loading flag, tab, modal, draft and goals
//! - **metrics**: Totals, average ticket and goal progress derived from state
//! - **controller**: Mount/unmount lifecycle, refresh, save and UI actions
//! - **policy**: Whether change notifications reload or patch the list
//!
//! The controller is the only writer of state. Observers read snapshots and
//! listen for [`DashboardEvent`]s to know when to read again.

pub mod controller;
pub mod metrics;
pub mod policy;
pub mod state;

pub use controller::{ControllerConfig, DashboardController, DashboardEvent};
pub use metrics::{Metrics, StageSummary};
pub use policy::RefreshPolicy;
pub use state::{DashboardSnapshot, DashboardState, DraftUpdate, Goals, Tab};
