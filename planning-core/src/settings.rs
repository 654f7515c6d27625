use serde::{Deserialize, Serialize};
use shared::types::ShiftCode;

use crate::error::PlannerError;

/// Objective weights for every soft-constraint family.
///
/// The spread over four orders of magnitude is what keeps the program
/// feasible in practice: only staffing minima, team rotation and the lock
/// assertions are truly hard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    pub min_hours_shortage: i64,
    pub target_hours_shortage: i64,
    pub rotation_order: i64,
    pub total_weekend_cap: i64,
    pub cross_shift_capacity: i64,
    pub daily_shift_ratio: i64,
    pub weekend_overstaff: i64,
    /// Indexed by the shift's capacity rank (highest max staffing first);
    /// ranks beyond the end reuse the last entry.
    pub weekday_understaff: Vec<i64>,
    pub weekday_overstaff: i64,
    pub shift_preference: i64,
    pub consecutive_days: i64,
    pub shift_hopping: i64,
    pub rest_sunday_monday: i64,
    pub rest_other: i64,
    pub block_weekdays: i64,
    pub block_weekend: i64,
    pub block_full_week: i64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            min_hours_shortage: 100,
            target_hours_shortage: 100,
            rotation_order: 10_000,
            total_weekend_cap: 150,
            cross_shift_capacity: 150,
            daily_shift_ratio: 200,
            weekend_overstaff: 50,
            weekday_understaff: vec![20, 12, 5],
            weekday_overstaff: 1,
            shift_preference: 3,
            consecutive_days: 400,
            shift_hopping: 200,
            rest_sunday_monday: 5_000,
            rest_other: 50_000,
            block_weekdays: -5,
            block_weekend: -5,
            block_full_week: -10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    /// Solver time budget in seconds.
    pub time_limit_secs: u64,
    /// Advisory worker count; the CSP backend searches single-threaded.
    pub workers: u32,
    /// Minimum rest between shifts in hours; 0 disables the rest rule.
    pub min_rest_hours: u32,
    /// Day-to-day shift transitions that break the rest rule, as
    /// (previous, next) code pairs.
    pub forbidden_rest_transitions: Vec<(ShiftCode, ShiftCode)>,
    /// Cap on total employees across all shifts on one weekend date.
    pub weekend_total_cap: u32,
    /// Longest permitted chain of working days regardless of shift code.
    pub max_consecutive_any: u32,
    /// Safety ceiling for the per-employee extended lookback, in days.
    pub lookback_ceiling_days: i64,
    /// Hours are modelled as integers scaled by this factor.
    pub hour_scale: i64,
    /// Absolute monthly hour floor, prorated to the horizon length.
    pub monthly_min_hours: u32,
    pub weights: PenaltyWeights,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            time_limit_secs: 300,
            workers: 8,
            min_rest_hours: 11,
            forbidden_rest_transitions: vec![
                ("S".into(), "F".into()),
                ("N".into(), "F".into()),
            ],
            weekend_total_cap: 12,
            max_consecutive_any: 6,
            lookback_ceiling_days: 60,
            hour_scale: 10,
            monthly_min_hours: 192,
            weights: PenaltyWeights::default(),
        }
    }
}

impl PlannerSettings {
    /// Loads settings from a TOML file; missing keys fall back to defaults.
    pub fn load(path: &str) -> Result<Self, PlannerError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PlannerError::InvalidInput(format!("Cannot read settings {path}: {e}")))?;
        toml::from_str(&raw)
            .map_err(|e| PlannerError::InvalidInput(format!("Cannot parse settings {path}: {e}")))
    }
}
