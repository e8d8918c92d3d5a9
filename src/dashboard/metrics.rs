//! Goal metrics
//!
//! Aggregate figures shown on the metrics tab, derived from the current
//! lead list and the in-memory goals.

use serde::Serialize;

use super::state::Goals;
use crate::store::{Lead, Stage};

/// Totals for one pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub count: usize,
    pub value: f64,
}

/// Dashboard aggregates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub lead_count: usize,
    pub total_value: f64,
    pub average_ticket: f64,
    pub target_revenue: f64,
    pub target_ticket: f64,
    /// `total_value / target_revenue`, absent while no goal is set
    pub revenue_progress: Option<f64>,
    /// `average_ticket / target_ticket`, absent while no goal is set
    pub ticket_progress: Option<f64>,
    pub by_stage: Vec<StageSummary>,
}

impl Metrics {
    pub fn compute(leads: &[Lead], goals: &Goals) -> Self {
        let lead_count = leads.len();
        let total_value: f64 = leads.iter().map(|l| l.value).sum();
        let average_ticket = if lead_count == 0 {
            0.0
        } else {
            total_value / lead_count as f64
        };

        let mut by_stage: Vec<StageSummary> = Stage::ALL
            .iter()
            .map(|stage| StageSummary {
                stage: stage.clone(),
                count: 0,
                value: 0.0,
            })
            .collect();

        for lead in leads {
            match by_stage.iter_mut().find(|s| s.stage == lead.stage) {
                Some(summary) => {
                    summary.count += 1;
                    summary.value += lead.value;
                }
                // Labels we don't know go after the canonical stages
                None => by_stage.push(StageSummary {
                    stage: lead.stage.clone(),
                    count: 1,
                    value: lead.value,
                }),
            }
        }

        Self {
            lead_count,
            total_value,
            average_ticket,
            target_revenue: goals.target_revenue,
            target_ticket: goals.target_ticket,
            revenue_progress: ratio(total_value, goals.target_revenue),
            ticket_progress: ratio(average_ticket, goals.target_ticket),
            by_stage,
        }
    }
}

fn ratio(actual: f64, target: f64) -> Option<f64> {
    (target > 0.0).then(|| actual / target)
}
