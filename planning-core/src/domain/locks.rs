use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use shared::time;
use shared::types::{Employee, ShiftCode, Team, WeekRef};
use uuid::Uuid;

use crate::domain::bundle::PlanInput;
use crate::domain::horizon::Horizon;
use crate::domain::store::PreviousShifts;

/// Identifies one lock from the input bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockRef {
    TeamShift {
        team_id: Uuid,
        week: WeekRef,
        code: ShiftCode,
    },
    EmployeeShift {
        employee_id: Uuid,
        date: NaiveDate,
        code: ShiftCode,
    },
    EmployeeWeekend {
        employee_id: Uuid,
        date: NaiveDate,
        working: bool,
    },
    Td {
        employee_id: Uuid,
        week: WeekRef,
        holding: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// Two different codes would pin the same (team, week); all involved
    /// locks are demoted and the week is replanned freely.
    TeamWeekConflict,
    /// The date lies in a week straddling the original range, which is
    /// being replanned anyway.
    BoundaryWeek,
    /// The employee is absent; absence always wins over a lock.
    AbsenceConflict,
    /// The lock names an entity, code, or day the model has no variable for.
    UnknownTarget,
    /// The lock falls entirely outside the extended planning range.
    OutsideHorizon,
}

/// A lock that was demoted instead of asserted.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedLock {
    pub lock: LockRef,
    pub reason: SkipReason,
}

/// Locks that survived conflict detection and will be asserted as hard.
#[derive(Debug, Clone, Default)]
pub struct ResolvedLocks {
    pub team_week: BTreeMap<(Uuid, WeekRef), ShiftCode>,
    pub employee_shift: BTreeMap<(Uuid, NaiveDate), ShiftCode>,
    pub employee_weekend: BTreeMap<(Uuid, NaiveDate), bool>,
    pub td: BTreeMap<(Uuid, WeekRef), bool>,
    /// Demoted boundary-week shifts that predate the original range; folded
    /// into the previous-shift map so consecutive-day windows still see them.
    pub boundary_history: PreviousShifts,
    pub skipped: Vec<SkippedLock>,
}

impl ResolvedLocks {
    fn skip(&mut self, lock: LockRef, reason: SkipReason) {
        tracing::warn!(?lock, ?reason, "Skipping lock");
        self.skipped.push(SkippedLock { lock, reason });
    }
}

struct Lookups<'a> {
    employees: BTreeMap<Uuid, &'a Employee>,
    teams: BTreeMap<Uuid, &'a Team>,
    codes: BTreeSet<&'a ShiftCode>,
    absent: BTreeSet<(Uuid, NaiveDate)>,
}

impl<'a> Lookups<'a> {
    fn new(input: &'a PlanInput, horizon: &Horizon) -> Self {
        let mut absent = BTreeSet::new();
        for absence in &input.absences {
            for date in time::days_between(absence.from, absence.to) {
                if horizon.in_extended(date) {
                    absent.insert((absence.employee_id, date));
                }
            }
        }
        Self {
            employees: input.employees.iter().map(|e| (e.id, e)).collect(),
            teams: input.teams.iter().map(|t| (t.id, t)).collect(),
            codes: input.shift_kinds.iter().map(|s| &s.code).collect(),
            absent,
        }
    }

    fn absent_in_week(&self, employee_id: Uuid, week: WeekRef) -> bool {
        let monday = week.monday();
        (0..7).any(|offset| {
            self.absent
                .contains(&(employee_id, monday + chrono::Duration::days(offset)))
        })
    }
}

/// Resolves the lock maps against the horizon and absence calendar.
///
/// Detection order matters: absence conflicts first (absence always wins),
/// then team-week code conflicts across explicit and employee-implied locks,
/// then the boundary-week demotion.
pub fn resolve(input: &PlanInput, horizon: &Horizon) -> ResolvedLocks {
    let lookups = Lookups::new(input, horizon);
    let mut resolved = ResolvedLocks::default();

    let mut surviving_employee: BTreeMap<(Uuid, NaiveDate), ShiftCode> = BTreeMap::new();

    for ((employee_id, date), code) in &input.locks.employee_shift {
        let lock = LockRef::EmployeeShift {
            employee_id: *employee_id,
            date: *date,
            code: code.clone(),
        };
        if !horizon.in_extended(*date) {
            resolved.skip(lock, SkipReason::OutsideHorizon);
            continue;
        }
        if lookups.absent.contains(&(*employee_id, *date)) {
            resolved.skip(lock, SkipReason::AbsenceConflict);
            continue;
        }
        if !lockable_shift(&lookups, input, *employee_id, *date, code) {
            resolved.skip(lock, SkipReason::UnknownTarget);
            continue;
        }
        surviving_employee.insert((*employee_id, *date), code.clone());
    }

    // Team-week conflict detection over explicit team locks and the codes
    // implied by weekday employee locks.
    let mut implied: BTreeMap<(Uuid, WeekRef), BTreeSet<ShiftCode>> = BTreeMap::new();
    let mut explicit: BTreeMap<(Uuid, WeekRef), ShiftCode> = BTreeMap::new();

    for ((team_id, week), code) in &input.locks.team_shift {
        let lock = LockRef::TeamShift {
            team_id: *team_id,
            week: *week,
            code: code.clone(),
        };
        if !horizon.weeks.iter().any(|w| w.week == *week) {
            resolved.skip(lock, SkipReason::OutsideHorizon);
            continue;
        }
        let Some(team) = lookups.teams.get(team_id) else {
            resolved.skip(lock, SkipReason::UnknownTarget);
            continue;
        };
        if !input.workable_codes(team).contains(code) {
            resolved.skip(lock, SkipReason::UnknownTarget);
            continue;
        }
        explicit.insert((*team_id, *week), code.clone());
        implied
            .entry((*team_id, *week))
            .or_default()
            .insert(code.clone());
    }

    for ((employee_id, date), code) in &surviving_employee {
        if time::is_weekend(*date) {
            continue;
        }
        let team_id = lookups.employees[employee_id]
            .team_id
            .expect("surviving locks belong to plannable employees");
        implied
            .entry((team_id, WeekRef::of(*date)))
            .or_default()
            .insert(code.clone());
    }

    let conflicted: BTreeSet<(Uuid, WeekRef)> = implied
        .iter()
        .filter(|(_, codes)| codes.len() > 1)
        .map(|(key, _)| *key)
        .collect();

    for key in &conflicted {
        if let Some(code) = explicit.remove(key) {
            resolved.skip(
                LockRef::TeamShift {
                    team_id: key.0,
                    week: key.1,
                    code,
                },
                SkipReason::TeamWeekConflict,
            );
        }
    }
    surviving_employee.retain(|(employee_id, date), code| {
        if time::is_weekend(*date) {
            return true;
        }
        let team_id = lookups.employees[employee_id].team_id.expect("plannable");
        if conflicted.contains(&(team_id, WeekRef::of(*date))) {
            resolved.skip(
                LockRef::EmployeeShift {
                    employee_id: *employee_id,
                    date: *date,
                    code: code.clone(),
                },
                SkipReason::TeamWeekConflict,
            );
            false
        } else {
            true
        }
    });
    resolved.team_week = explicit;

    // Boundary-week demotion for the remaining per-date employee locks.
    for ((employee_id, date), code) in surviving_employee {
        if horizon.is_boundary(date) {
            if date < horizon.original_start {
                resolved
                    .boundary_history
                    .insert((employee_id, date), code.clone());
            }
            resolved.skip(
                LockRef::EmployeeShift {
                    employee_id,
                    date,
                    code,
                },
                SkipReason::BoundaryWeek,
            );
        } else {
            resolved.employee_shift.insert((employee_id, date), code);
        }
    }

    for ((employee_id, date), working) in &input.locks.employee_weekend {
        let lock = LockRef::EmployeeWeekend {
            employee_id: *employee_id,
            date: *date,
            working: *working,
        };
        if !horizon.in_extended(*date) {
            resolved.skip(lock, SkipReason::OutsideHorizon);
            continue;
        }
        if !time::is_weekend(*date) || !plannable(&lookups, *employee_id) {
            resolved.skip(lock, SkipReason::UnknownTarget);
            continue;
        }
        if *working && lookups.absent.contains(&(*employee_id, *date)) {
            resolved.skip(lock, SkipReason::AbsenceConflict);
            continue;
        }
        if horizon.is_boundary(*date) {
            resolved.skip(lock, SkipReason::BoundaryWeek);
            continue;
        }
        resolved
            .employee_weekend
            .insert((*employee_id, *date), *working);
    }

    for ((employee_id, week), holding) in &input.locks.td {
        let lock = LockRef::Td {
            employee_id: *employee_id,
            week: *week,
            holding: *holding,
        };
        if !horizon.weeks.iter().any(|w| w.week == *week) {
            resolved.skip(lock, SkipReason::OutsideHorizon);
            continue;
        }
        let qualified = lookups
            .employees
            .get(employee_id)
            .is_some_and(|e| e.is_plannable() && e.td_qualified);
        if !qualified {
            resolved.skip(lock, SkipReason::UnknownTarget);
            continue;
        }
        if *holding && lookups.absent_in_week(*employee_id, *week) {
            resolved.skip(lock, SkipReason::AbsenceConflict);
            continue;
        }
        resolved.td.insert((*employee_id, *week), *holding);
    }

    resolved
}

fn plannable(lookups: &Lookups<'_>, employee_id: Uuid) -> bool {
    lookups
        .employees
        .get(&employee_id)
        .is_some_and(|e| e.is_plannable())
}

fn lockable_shift(
    lookups: &Lookups<'_>,
    input: &PlanInput,
    employee_id: Uuid,
    date: NaiveDate,
    code: &ShiftCode,
) -> bool {
    if !lookups.codes.contains(code) {
        return false;
    }
    let Some(employee) = lookups.employees.get(&employee_id) else {
        return false;
    };
    if !employee.is_plannable() {
        return false;
    }
    let shift = input
        .shift_kinds
        .iter()
        .find(|s| &s.code == code)
        .expect("code existence checked above");
    if !shift.operates_on(date) {
        return false;
    }
    if time::is_weekend(date) {
        // weekend work is independent of the team's weekly code
        return true;
    }
    let team = lookups.teams[&employee.team_id.expect("plannable")];
    input.workable_codes(team).contains(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testkit;
    use shared::types::{Absence, AbsenceKind};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn conflicting_team_week_locks_are_demoted_together() {
        // Two employees of the same team locked to different codes in the
        // same overlapping week; the whole week must be freed.
        let mut input = testkit::march_input();
        let team_id = input.teams[0].id;
        let (first, second) = {
            let mut members = input
                .employees
                .iter()
                .filter(|e| e.team_id == Some(team_id));
            (
                members.next().unwrap().id,
                members.next().unwrap().id,
            )
        };
        input
            .locks
            .employee_shift
            .insert((first, date(2026, 3, 30)), "F".into());
        input
            .locks
            .employee_shift
            .insert((second, date(2026, 3, 31)), "S".into());
        let horizon = Horizon::build(input.from, input.to).unwrap();

        let output = resolve(&input, &horizon);

        assert!(output.employee_shift.is_empty());
        assert_eq!(output.skipped.len(), 2);
        assert!(
            output
                .skipped
                .iter()
                .all(|s| s.reason == SkipReason::TeamWeekConflict)
        );
    }

    #[test]
    fn absence_wins_over_a_lock() {
        let mut input = testkit::march_input();
        let employee_id = input.employees[0].id;
        input.absences.push(Absence {
            employee_id,
            from: date(2026, 3, 1),
            to: date(2026, 3, 8),
            kind: AbsenceKind::Sick,
        });
        input
            .locks
            .employee_shift
            .insert((employee_id, date(2026, 3, 2)), "F".into());
        let horizon = Horizon::build(input.from, input.to).unwrap();

        let output = resolve(&input, &horizon);

        assert!(output.employee_shift.is_empty());
        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.skipped[0].reason, SkipReason::AbsenceConflict);
    }

    #[test]
    fn boundary_week_locks_feed_the_history_map() {
        // Planning March 2026; the first week starts on 2026-02-23.
        let mut input = testkit::march_input();
        let employee_id = input.employees[0].id;
        for day in 23..=28 {
            input
                .locks
                .employee_shift
                .insert((employee_id, date(2026, 2, day)), "F".into());
        }
        let horizon = Horizon::build(input.from, input.to).unwrap();

        let output = resolve(&input, &horizon);

        assert!(output.employee_shift.is_empty());
        assert_eq!(output.boundary_history.len(), 6);
        assert!(
            output
                .skipped
                .iter()
                .all(|s| s.reason == SkipReason::BoundaryWeek)
        );
    }

    #[test]
    fn mid_month_lock_survives() {
        let mut input = testkit::march_input();
        let employee_id = input.employees[0].id;
        input
            .locks
            .employee_shift
            .insert((employee_id, date(2026, 3, 11)), "F".into());
        let horizon = Horizon::build(input.from, input.to).unwrap();

        let output = resolve(&input, &horizon);

        assert_eq!(output.employee_shift.len(), 1);
        assert!(output.skipped.is_empty());
    }

    #[test]
    fn td_lock_for_unqualified_employee_is_skipped() {
        let mut input = testkit::march_input();
        input.employees[0].td_qualified = false;
        let employee_id = input.employees[0].id;
        let week = WeekRef::of(date(2026, 3, 11));
        input.locks.td.insert((employee_id, week), true);
        let horizon = Horizon::build(input.from, input.to).unwrap();

        let output = resolve(&input, &horizon);

        assert!(output.td.is_empty());
        assert_eq!(output.skipped[0].reason, SkipReason::UnknownTarget);
    }
}
