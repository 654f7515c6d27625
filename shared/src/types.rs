use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time;

// region: Shift catalogue

/// Short symbolic shift name, e.g. `F` (early), `S` (late), `N` (night).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShiftCode(String);

impl ShiftCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShiftCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShiftCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// A shift type, immutable for the duration of one solve.
///
/// `operates` is a Monday-first weekday mask; a shift with `operates[5] == false`
/// never runs on Saturdays and no decision variable is created for it there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftKind {
    pub code: ShiftCode,
    pub name: String,
    pub duration_hours: u32,
    pub operates: [bool; 7],
    pub min_staff_weekday: u32,
    pub max_staff_weekday: u32,
    pub min_staff_weekend: u32,
    pub max_staff_weekend: u32,
    pub target_weekly_hours: u32,
    pub max_consecutive_days: u32,
}

impl ShiftKind {
    pub fn operates_on(&self, date: NaiveDate) -> bool {
        self.operates[date.weekday().num_days_from_monday() as usize]
    }

    pub fn min_staff(&self, date: NaiveDate) -> u32 {
        if time::is_weekend(date) {
            self.min_staff_weekend
        } else {
            self.min_staff_weekday
        }
    }

    pub fn max_staff(&self, date: NaiveDate) -> u32 {
        if time::is_weekend(date) {
            self.max_staff_weekend
        } else {
            self.max_staff_weekday
        }
    }
}

// endregion: Shift catalogue

// region: Workforce

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    /// `None` marks an administrative account that is never planned.
    pub team_id: Option<Uuid>,
    pub td_qualified: bool,
    pub active: bool,
}

impl Employee {
    pub fn is_plannable(&self) -> bool {
        self.active && self.team_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    /// Shift codes this team may be assigned; empty means "any".
    pub allowed_codes: Vec<ShiftCode>,
    pub rotation_group_id: Option<Uuid>,
    /// Phase shift into the rotation cycle, in weeks.
    pub rotation_offset: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationGroup {
    pub id: Uuid,
    pub name: String,
    /// Ordered cycle of shift codes the member teams advance through.
    pub cycle: Vec<ShiftCode>,
}

// endregion: Workforce

// region: Absences

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbsenceKind {
    Sick,
    Vacation,
    Training,
    Other,
}

impl AbsenceKind {
    /// Training still counts toward worked hours for reporting purposes.
    pub fn accrues_hours(&self) -> bool {
        matches!(self, Self::Training)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Absence {
    pub employee_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub kind: AbsenceKind,
}

impl Absence {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

// endregion: Absences

// region: Calendar

/// Absolute ISO week reference, stable across planning calls that share a week.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct WeekRef {
    pub year: i32,
    pub week: u32,
}

impl WeekRef {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Monday of this ISO week.
    pub fn monday(&self) -> NaiveDate {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
            .expect("valid ISO week reference")
    }
}

impl fmt::Display for WeekRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

// endregion: Calendar

// region: Assignments

/// A committed (employee, date, shift) row from a previous planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorAssignment {
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub code: ShiftCode,
}

/// One planned shift in the output; at most one per (employee, date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedShift {
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub code: ShiftCode,
}

/// Weekly day-duty marker; an organisational overlay, not a shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TdMarker {
    pub employee_id: Uuid,
    pub week: WeekRef,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

// endregion: Assignments
