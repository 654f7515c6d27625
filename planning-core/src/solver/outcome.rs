use serde::Serialize;
use shared::types::{PlannedShift, SolveStatus, TdMarker};

use crate::domain::locks::SkippedLock;
use crate::solver::penalty::PenaltyCategory;

/// Realized penalties for one soft-constraint family.
#[derive(Debug, Clone, Serialize)]
pub struct PenaltyEntry {
    pub category: PenaltyCategory,
    /// Number of terms that fired (realized value above zero).
    pub violations: u32,
    /// Weighted contribution to the objective; negative for bonuses.
    pub amount: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PenaltyReport {
    pub objective: i64,
    pub entries: Vec<PenaltyEntry>,
}

impl PenaltyReport {
    pub fn amount_of(&self, category: PenaltyCategory) -> i64 {
        self.entries
            .iter()
            .find(|e| e.category == category)
            .map_or(0, |e| e.amount)
    }
}

/// A satisfying assignment extracted from the solver.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub status: SolveStatus,
    pub assignments: Vec<PlannedShift>,
    pub td_markers: Vec<TdMarker>,
    pub penalties: PenaltyReport,
    pub skipped_locks: Vec<SkippedLock>,
}

/// Why no plan could be produced.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub status: SolveStatus,
    pub findings: Vec<String>,
}

/// Value-typed solve result: infeasibility is an outcome, not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanOutcome {
    Planned(Plan),
    Failed(Diagnosis),
}

impl PlanOutcome {
    pub fn as_plan(&self) -> Option<&Plan> {
        match self {
            Self::Planned(plan) => Some(plan),
            Self::Failed(_) => None,
        }
    }

    pub fn status(&self) -> SolveStatus {
        match self {
            Self::Planned(plan) => plan.status,
            Self::Failed(diagnosis) => diagnosis.status,
        }
    }
}
