use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::types::{Absence, Employee, RotationGroup, ShiftCode, ShiftKind, Team, WeekRef};
use uuid::Uuid;

use crate::error::PlannerError;

/// Previously committed decisions that must (or should) be preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockSet {
    /// Team `t` keeps shift code `c` for ISO week `w`.
    pub team_shift: BTreeMap<(Uuid, WeekRef), ShiftCode>,
    /// Employee works exactly shift `c` on a date.
    pub employee_shift: BTreeMap<(Uuid, NaiveDate), ShiftCode>,
    /// Employee does (or does not) work on a weekend date.
    pub employee_weekend: BTreeMap<(Uuid, NaiveDate), bool>,
    /// Employee holds (or must not hold) the TD marker for a week.
    pub td: BTreeMap<(Uuid, WeekRef), bool>,
}

impl LockSet {
    pub fn is_empty(&self) -> bool {
        self.team_shift.is_empty()
            && self.employee_shift.is_empty()
            && self.employee_weekend.is_empty()
            && self.td.is_empty()
    }
}

/// The immutable input bundle for one solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub employees: Vec<Employee>,
    pub teams: Vec<Team>,
    pub shift_kinds: Vec<ShiftKind>,
    pub rotation_groups: Vec<RotationGroup>,
    pub absences: Vec<Absence>,
    pub locks: LockSet,
    /// Fallback rotation cycle for teams without an explicit group.
    pub default_rotation: Vec<ShiftCode>,
}

impl PlanInput {
    /// The rotation cycle a team advances through: its group's cycle, or the
    /// injected default when it has no group.
    pub fn rotation_cycle(&self, team: &Team) -> Vec<ShiftCode> {
        if let Some(group_id) = team.rotation_group_id
            && let Some(group) = self.rotation_groups.iter().find(|g| g.id == group_id)
        {
            return group.cycle.clone();
        }
        self.default_rotation.clone()
    }

    /// Shift codes a team may be assigned for a week. An empty allow-list
    /// falls back to the rotation cycle, and failing that to every code.
    pub fn workable_codes(&self, team: &Team) -> Vec<ShiftCode> {
        if !team.allowed_codes.is_empty() {
            return team.allowed_codes.clone();
        }
        let cycle = self.rotation_cycle(team);
        if !cycle.is_empty() {
            return cycle;
        }
        self.shift_kinds.iter().map(|s| s.code.clone()).collect()
    }
}

/// Rejects malformed bundles before any decision variable exists.
pub fn validate(input: &PlanInput) -> Result<(), PlannerError> {
    if input.from > input.to {
        return Err(PlannerError::InvalidInput(format!(
            "Planning range starts after it ends: {} > {}",
            input.from, input.to
        )));
    }

    if input.shift_kinds.is_empty() {
        return Err(PlannerError::InvalidInput(
            "At least one shift type is required".into(),
        ));
    }

    let mut codes: BTreeSet<&ShiftCode> = BTreeSet::new();
    for shift in &input.shift_kinds {
        if !codes.insert(&shift.code) {
            return Err(PlannerError::InvalidInput(format!(
                "Duplicate shift code {}",
                shift.code
            )));
        }
        if !shift.operates.iter().any(|&on| on) {
            return Err(PlannerError::InvalidInput(format!(
                "Shift {} has an empty weekday mask",
                shift.code
            )));
        }
        if shift.min_staff_weekday > shift.max_staff_weekday
            || shift.min_staff_weekend > shift.max_staff_weekend
        {
            return Err(PlannerError::InvalidInput(format!(
                "Shift {} has min staffing above max staffing",
                shift.code
            )));
        }
    }

    let team_ids: BTreeSet<Uuid> = input.teams.iter().map(|t| t.id).collect();
    for employee in &input.employees {
        if let Some(team_id) = employee.team_id
            && !team_ids.contains(&team_id)
        {
            return Err(PlannerError::InvalidInput(format!(
                "Employee {} references unknown team {team_id}",
                employee.id
            )));
        }
    }

    let group_ids: BTreeSet<Uuid> = input.rotation_groups.iter().map(|g| g.id).collect();
    for team in &input.teams {
        for code in &team.allowed_codes {
            if !codes.contains(code) {
                return Err(PlannerError::InvalidInput(format!(
                    "Team {} allows unknown shift code {code}",
                    team.id
                )));
            }
        }
        if let Some(group_id) = team.rotation_group_id
            && !group_ids.contains(&group_id)
        {
            return Err(PlannerError::InvalidInput(format!(
                "Team {} references unknown rotation group {group_id}",
                team.id
            )));
        }
    }

    for group in &input.rotation_groups {
        if group.cycle.is_empty() {
            return Err(PlannerError::InvalidInput(format!(
                "Rotation group {} has an empty cycle",
                group.id
            )));
        }
        for code in &group.cycle {
            if !codes.contains(code) {
                return Err(PlannerError::InvalidInput(format!(
                    "Rotation group {} cycles through unknown shift code {code}",
                    group.id
                )));
            }
        }
    }

    for code in &input.default_rotation {
        if !codes.contains(code) {
            return Err(PlannerError::InvalidInput(format!(
                "Default rotation contains unknown shift code {code}"
            )));
        }
    }

    for absence in &input.absences {
        if absence.from > absence.to {
            return Err(PlannerError::InvalidInput(format!(
                "Absence for employee {} starts after it ends",
                absence.employee_id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testkit;

    #[test]
    fn valid_fixture_passes() {
        let input = testkit::small_input();
        assert!(validate(&input).is_ok());
    }

    #[test]
    fn rejects_unknown_team_reference() {
        let mut input = testkit::small_input();
        input.employees[0].team_id = Some(Uuid::new_v4());

        let output = validate(&input);

        assert!(matches!(output, Err(PlannerError::InvalidInput(_))));
    }

    #[test]
    fn rejects_empty_weekday_mask() {
        let mut input = testkit::small_input();
        input.shift_kinds[0].operates = [false; 7];

        let output = validate(&input);

        assert!(matches!(output, Err(PlannerError::InvalidInput(_))));
    }

    #[test]
    fn rejects_inverted_range() {
        let mut input = testkit::small_input();
        input.from = input.to + chrono::Duration::days(1);

        let output = validate(&input);

        assert!(matches!(output, Err(PlannerError::InvalidInput(_))));
    }

    #[test]
    fn rejects_min_staff_above_max() {
        let mut input = testkit::small_input();
        input.shift_kinds[0].min_staff_weekday = 9;

        let output = validate(&input);

        assert!(matches!(output, Err(PlannerError::InvalidInput(_))));
    }
}
