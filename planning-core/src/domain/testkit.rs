//! Deterministic fixtures shared by unit and scenario tests.

use chrono::NaiveDate;
use shared::types::{Employee, ShiftCode, ShiftKind, Team};
use uuid::Uuid;

use crate::domain::bundle::{LockSet, PlanInput};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn shift(code: &str, name: &str, min_wd: u32, max_wd: u32) -> ShiftKind {
    ShiftKind {
        code: ShiftCode::new(code),
        name: name.into(),
        duration_hours: 8,
        operates: [true; 7],
        min_staff_weekday: min_wd,
        max_staff_weekday: max_wd,
        min_staff_weekend: 1,
        max_staff_weekend: 3,
        target_weekly_hours: 48,
        max_consecutive_days: 6,
    }
}

/// The canonical three-shift catalogue: early, late, night.
pub fn standard_shifts(min_wd: u32, max_wd: u32) -> Vec<ShiftKind> {
    vec![
        shift("F", "Early", min_wd, max_wd),
        shift("S", "Late", min_wd, max_wd),
        shift("N", "Night", min_wd, max_wd),
    ]
}

/// `team_count` teams with staggered rotation offsets and `per_team`
/// employees each, every one TD-qualified and active.
pub fn input_for(
    from: NaiveDate,
    to: NaiveDate,
    team_count: usize,
    per_team: usize,
    min_wd: u32,
    max_wd: u32,
) -> PlanInput {
    let teams: Vec<Team> = (0..team_count)
        .map(|i| Team {
            id: Uuid::new_v4(),
            name: format!("Team {}", i + 1),
            allowed_codes: Vec::new(),
            rotation_group_id: None,
            rotation_offset: i as u32,
        })
        .collect();

    let employees: Vec<Employee> = teams
        .iter()
        .enumerate()
        .flat_map(|(t, team)| {
            (0..per_team).map(move |i| Employee {
                id: Uuid::new_v4(),
                name: format!("Employee {}-{}", t + 1, i + 1),
                team_id: Some(team.id),
                td_qualified: true,
                active: true,
            })
        })
        .collect();

    PlanInput {
        from,
        to,
        employees,
        teams,
        shift_kinds: standard_shifts(min_wd, max_wd),
        rotation_groups: Vec::new(),
        absences: Vec::new(),
        locks: LockSet::default(),
        default_rotation: vec!["F".into(), "N".into(), "S".into()],
    }
}

/// Three teams of five over January 2026.
pub fn small_input() -> PlanInput {
    input_for(date(2026, 1, 1), date(2026, 1, 31), 3, 5, 2, 5)
}

/// Three teams of five over March 2026; its first and last weeks straddle
/// the month, which is what the boundary-week scenarios need.
pub fn march_input() -> PlanInput {
    input_for(date(2026, 3, 1), date(2026, 3, 31), 3, 5, 2, 5)
}

/// One aligned ISO week with three teams of two; small enough for fast
/// solver round-trips in unit tests.
pub fn tiny_input() -> PlanInput {
    input_for(date(2026, 1, 5), date(2026, 1, 11), 3, 2, 1, 2)
}
