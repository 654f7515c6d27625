use std::sync::Arc;

use chrono::Duration;
use shared::time;

use crate::domain::bundle::{self, PlanInput};
use crate::domain::horizon::Horizon;
use crate::domain::store::{AssignmentStore, PreviousShifts};
use crate::error::PlannerError;
use crate::settings::PlannerSettings;
use crate::solver;
use crate::solver::outcome::PlanOutcome;

/// Orchestrates one solve: validate the bundle, build the horizon, load the
/// previous-shift history, then hand off to the constraint compiler on a
/// blocking worker. One solve per call; the store stays read-only throughout.
pub struct PlanningService {
    store: Arc<dyn AssignmentStore>,
    settings: PlannerSettings,
}

impl PlanningService {
    pub fn new(store: Arc<dyn AssignmentStore>, settings: PlannerSettings) -> Self {
        Self { store, settings }
    }

    #[tracing::instrument(skip(self, input), fields(from = %input.from, to = %input.to))]
    pub async fn plan(&self, input: PlanInput) -> Result<PlanOutcome, PlannerError> {
        bundle::validate(&input)?;
        let horizon = Horizon::build(input.from, input.to)?;
        let previous = self.load_previous_shifts(&input, &horizon).await?;

        let settings = self.settings.clone();
        tokio::task::spawn_blocking(move || solver::plan(&input, &horizon, &previous, &settings))
            .await
            .map_err(|e| PlannerError::Internal(format!("Solver task failed: {e}")))?
    }

    /// Two-pass history load. The initial window spans the largest
    /// consecutive-day limit; any employee whose chain fills that window
    /// contiguously gets a second, deeper query up to the safety ceiling.
    async fn load_previous_shifts(
        &self,
        input: &PlanInput,
        horizon: &Horizon,
    ) -> Result<PreviousShifts, PlannerError> {
        let per_shift = input
            .shift_kinds
            .iter()
            .map(|s| s.max_consecutive_days)
            .max()
            .unwrap_or(0);
        let lookback_days = per_shift.max(self.settings.max_consecutive_any) as i64;
        if lookback_days == 0 {
            return Ok(PreviousShifts::new());
        }

        let (from, to) = horizon.lookback_window(lookback_days);
        let rows = self.store.assignments_between(from, to).await?;
        let mut previous: PreviousShifts = rows
            .into_iter()
            .map(|row| ((row.employee_id, row.date), row.code))
            .collect();
        tracing::debug!(%from, %to, loaded = previous.len(), "Initial lookback loaded");

        let window: Vec<_> = time::days_between(from, to).collect();
        let ceiling_from =
            horizon.extended_start - Duration::days(self.settings.lookback_ceiling_days);
        let older_to = from - Duration::days(1);
        if ceiling_from > older_to {
            return Ok(previous);
        }

        for employee in input.employees.iter().filter(|e| e.is_plannable()) {
            let saturated = window
                .iter()
                .all(|date| previous.contains_key(&(employee.id, *date)));
            if !saturated {
                continue;
            }
            tracing::info!(
                employee_id = %employee.id,
                %ceiling_from,
                "Initial lookback saturated; extending the history query"
            );
            let older = self
                .store
                .employee_assignments_between(employee.id, ceiling_from, older_to)
                .await?;
            for row in older {
                previous.insert((row.employee_id, row.date), row.code);
            }
        }

        Ok(previous)
    }
}
