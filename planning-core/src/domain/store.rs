use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::types::{PriorAssignment, ShiftCode};
use uuid::Uuid;

use crate::error::PlannerError;

/// Previously committed shifts keyed by (employee, date).
pub type PreviousShifts = BTreeMap<(Uuid, NaiveDate), ShiftCode>;

/// Read-only access to assignments committed by earlier planning runs.
///
/// The store is queried twice per solve: once for the initial lookback
/// window, then per employee whose chain saturates that window.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn assignments_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriorAssignment>, PlannerError>;

    async fn employee_assignments_between(
        &self,
        employee_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriorAssignment>, PlannerError>;
}

/// In-memory store for tests and embedders without a database.
#[derive(Debug, Default)]
pub struct MemoryAssignmentStore {
    rows: Vec<PriorAssignment>,
}

impl MemoryAssignmentStore {
    pub fn new(rows: Vec<PriorAssignment>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl AssignmentStore for MemoryAssignmentStore {
    async fn assignments_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriorAssignment>, PlannerError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| from <= row.date && row.date <= to)
            .cloned()
            .collect())
    }

    async fn employee_assignments_between(
        &self,
        employee_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriorAssignment>, PlannerError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| row.employee_id == employee_id && from <= row.date && row.date <= to)
            .cloned()
            .collect())
    }
}
