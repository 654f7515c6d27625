use std::fmt;

use selen::prelude::VarId;
use serde::Serialize;

/// Soft-constraint families, in the fixed order penalties are aggregated in
/// so the objective value is reproducible run to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PenaltyCategory {
    MinHoursShortage,
    TargetHoursShortage,
    RotationOrder,
    TotalWeekendCap,
    CrossShiftCapacity,
    DailyShiftRatio,
    WeekendOverstaff,
    WeekdayUnderstaff,
    WeekdayOverstaff,
    ShiftPreference,
    ConsecutiveDays,
    ShiftHopping,
    RestSundayMonday,
    RestOther,
    BlockBonus,
}

impl fmt::Display for PenaltyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MinHoursShortage => "min_hours_shortage",
            Self::TargetHoursShortage => "target_hours_shortage",
            Self::RotationOrder => "rotation_order_violation",
            Self::TotalWeekendCap => "total_weekend_cap",
            Self::CrossShiftCapacity => "cross_shift_capacity",
            Self::DailyShiftRatio => "daily_shift_ratio",
            Self::WeekendOverstaff => "weekend_overstaff",
            Self::WeekdayUnderstaff => "weekday_understaff",
            Self::WeekdayOverstaff => "weekday_overstaff",
            Self::ShiftPreference => "shift_preference",
            Self::ConsecutiveDays => "consecutive_days",
            Self::ShiftHopping => "shift_hopping",
            Self::RestSundayMonday => "rest_time_sunday_monday",
            Self::RestOther => "rest_time_other",
            Self::BlockBonus => "block_scheduling_bonus",
        };
        f.write_str(name)
    }
}

/// One weighted objective term.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PenaltyTerm {
    pub category: PenaltyCategory,
    pub weight: i64,
    pub var: VarId,
}

/// Collects penalty terms during constraint emission.
#[derive(Default)]
pub(crate) struct PenaltyLedger {
    terms: Vec<PenaltyTerm>,
}

impl PenaltyLedger {
    pub fn add(&mut self, category: PenaltyCategory, weight: i64, var: VarId) {
        self.terms.push(PenaltyTerm {
            category,
            weight,
            var,
        });
    }

    /// Terms sorted by category, preserving emission order within one.
    pub fn in_category_order(&self) -> Vec<PenaltyTerm> {
        let mut terms = self.terms.clone();
        terms.sort_by_key(|t| t.category);
        terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }
}
