//! API Routes
//!
//! Route handlers organized by functionality.

pub mod dashboard;
pub mod draft;
pub mod goals;
pub mod health;
pub mod leads;
