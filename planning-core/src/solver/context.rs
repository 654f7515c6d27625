use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use shared::time;
use shared::types::{Employee, ShiftCode, ShiftKind, Team};
use uuid::Uuid;

use crate::domain::bundle::PlanInput;
use crate::domain::horizon::Horizon;
use crate::domain::locks::{self, ResolvedLocks};
use crate::domain::store::PreviousShifts;
use crate::settings::PlannerSettings;

/// Everything the compiler passes need, resolved once per solve.
///
/// Iteration sources (`employees`, `teams`, `shifts`) are sorted so variable
/// creation order is deterministic.
pub(crate) struct PlanContext<'a> {
    pub horizon: &'a Horizon,
    pub settings: &'a PlannerSettings,
    /// Store-loaded history merged with demoted boundary-week locks.
    pub previous: PreviousShifts,
    pub locks: ResolvedLocks,
    pub employees: Vec<&'a Employee>,
    pub teams: Vec<&'a Team>,
    pub members: BTreeMap<Uuid, Vec<&'a Employee>>,
    pub shifts: Vec<&'a ShiftKind>,
    pub shift_by_code: BTreeMap<ShiftCode, &'a ShiftKind>,
    pub workable: BTreeMap<Uuid, Vec<ShiftCode>>,
    pub rotation: BTreeMap<Uuid, Vec<ShiftCode>>,
    absent: BTreeSet<(Uuid, NaiveDate)>,
    training: BTreeSet<(Uuid, NaiveDate)>,
}

impl<'a> PlanContext<'a> {
    pub fn prepare(
        input: &'a PlanInput,
        horizon: &'a Horizon,
        previous: PreviousShifts,
        settings: &'a PlannerSettings,
    ) -> Self {
        let resolved = locks::resolve(input, horizon);
        let mut previous = previous;
        for (key, code) in &resolved.boundary_history {
            previous.entry(*key).or_insert_with(|| code.clone());
        }

        let mut employees: Vec<&Employee> =
            input.employees.iter().filter(|e| e.is_plannable()).collect();
        employees.sort_by_key(|e| e.id);

        let mut teams: Vec<&Team> = input.teams.iter().collect();
        teams.sort_by_key(|t| t.id);

        let mut members: BTreeMap<Uuid, Vec<&Employee>> = BTreeMap::new();
        for employee in &employees {
            let team_id = employee.team_id.expect("plannable employees have a team");
            members.entry(team_id).or_default().push(*employee);
        }

        let mut shifts: Vec<&ShiftKind> = input.shift_kinds.iter().collect();
        shifts.sort_by(|a, b| a.code.cmp(&b.code));
        let shift_by_code = shifts.iter().map(|s| (s.code.clone(), *s)).collect();

        let workable = teams
            .iter()
            .map(|t| (t.id, input.workable_codes(t)))
            .collect();
        let rotation = teams
            .iter()
            .map(|t| (t.id, input.rotation_cycle(t)))
            .collect();

        let mut absent = BTreeSet::new();
        let mut training = BTreeSet::new();
        for absence in &input.absences {
            for date in time::days_between(absence.from, absence.to) {
                if !horizon.in_extended(date) {
                    continue;
                }
                absent.insert((absence.employee_id, date));
                if absence.kind.accrues_hours() {
                    training.insert((absence.employee_id, date));
                }
            }
        }

        Self {
            horizon,
            settings,
            previous,
            locks: resolved,
            employees,
            teams,
            members,
            shifts,
            shift_by_code,
            workable,
            rotation,
            absent,
            training,
        }
    }

    pub fn is_absent(&self, employee_id: Uuid, date: NaiveDate) -> bool {
        self.absent.contains(&(employee_id, date))
    }

    pub fn is_training_day(&self, employee_id: Uuid, date: NaiveDate) -> bool {
        self.training.contains(&(employee_id, date))
    }

    pub fn team_of(&self, employee: &Employee) -> &'a Team {
        let team_id = employee.team_id.expect("plannable employees have a team");
        self.teams
            .iter()
            .copied()
            .find(|t| t.id == team_id)
            .expect("validated team reference")
    }

    /// The previously committed shift for a date before the extended range.
    pub fn previous_code(&self, employee_id: Uuid, date: NaiveDate) -> Option<&ShiftCode> {
        self.previous.get(&(employee_id, date))
    }

    /// Shifts ranked by weekday capacity, highest first. Drives the
    /// understaffing weight ladder and the fill-high-shifts-first bias.
    pub fn capacity_ranked(&self) -> Vec<&'a ShiftKind> {
        let mut ranked = self.shifts.clone();
        ranked.sort_by(|a, b| {
            b.max_staff_weekday
                .cmp(&a.max_staff_weekday)
                .then_with(|| a.code.cmp(&b.code))
        });
        ranked
    }
}
