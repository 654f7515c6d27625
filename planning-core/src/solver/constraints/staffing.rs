use std::collections::BTreeMap;

use selen::prelude::*;
use shared::time;
use shared::types::ShiftCode;

use crate::solver::context::PlanContext;
use crate::solver::cp::Cp;
use crate::solver::penalty::{PenaltyCategory, PenaltyLedger};
use crate::solver::variables::VarSet;

/// Per-day staffing: the minimum is the one hard bound; everything above it
/// is steered by weighted slacks (weekend caps, over-/understaffing, the
/// capacity-ordered fill bias).
pub(crate) fn apply(cp: &mut Cp, ctx: &PlanContext<'_>, vars: &VarSet, ledger: &mut PenaltyLedger) {
    let weights = &ctx.settings.weights;
    let headcount = ctx.employees.len() as i64;

    let ranked = ctx.capacity_ranked();
    let rank_of: BTreeMap<&ShiftCode, usize> = ranked
        .iter()
        .enumerate()
        .map(|(rank, shift)| (&shift.code, rank))
        .collect();

    for date in ctx.horizon.dates() {
        let weekend = time::is_weekend(date);
        let mut counts: Vec<(&ShiftCode, VarId)> = Vec::new();

        for shift in &ctx.shifts {
            if !shift.operates_on(date) {
                continue;
            }
            let assigned: Vec<VarId> = ctx
                .employees
                .iter()
                .flat_map(|e| vars.use_vars(e.id, date, &shift.code))
                .collect();
            let count = cp.sum(&assigned);
            counts.push((&shift.code, count));

            let min = shift.min_staff(date) as i64;
            let max = shift.max_staff(date) as i64;
            cp.model.c(count).ge(int(min as i32));

            if weekend {
                let over = cp.excess(&[count], max, headcount);
                ledger.add(PenaltyCategory::WeekendOverstaff, weights.weekend_overstaff, over);
            } else {
                let rank = rank_of[&shift.code];
                let under_weight = weights
                    .weekday_understaff
                    .get(rank)
                    .or(weights.weekday_understaff.last())
                    .copied()
                    .unwrap_or(0);
                let under = cp.shortage(&[count], max, 0);
                ledger.add(PenaltyCategory::WeekdayUnderstaff, under_weight, under);
                let over = cp.excess(&[count], max, headcount);
                ledger.add(PenaltyCategory::WeekdayOverstaff, weights.weekday_overstaff, over);
            }

            // fill-high-shifts-first bias: bonus on the widest shift, malus
            // on the narrowest
            if ranked.len() > 1 {
                let rank = rank_of[&shift.code];
                if rank == 0 {
                    ledger.add(PenaltyCategory::ShiftPreference, -weights.shift_preference, count);
                } else if rank == ranked.len() - 1 {
                    ledger.add(PenaltyCategory::ShiftPreference, weights.shift_preference, count);
                }
            }
        }

        if counts.is_empty() {
            continue;
        }

        if weekend {
            let all: Vec<VarId> = counts.iter().map(|(_, c)| *c).collect();
            let cap = ctx.settings.weekend_total_cap as i64;
            let over = cp.excess(&all, cap, headcount);
            ledger.add(PenaltyCategory::TotalWeekendCap, weights.total_weekend_cap, over);
        }

        // spill pressure from low- into high-capacity shifts: penalize the
        // overlap of "low above its maximum" and "high below its maximum"
        for (hi_code, hi_count) in &counts {
            for (lo_code, lo_count) in &counts {
                let hi = ctx.shift_by_code[*hi_code];
                let lo = ctx.shift_by_code[*lo_code];
                if hi.max_staff(date) <= lo.max_staff(date) {
                    continue;
                }
                let spare_low = cp.excess(&[*lo_count], lo.max_staff(date) as i64, headcount);
                let room_high = cp.shortage(&[*hi_count], hi.max_staff(date) as i64, 0);
                let overlap = cp
                    .model
                    .min(&[spare_low, room_high])
                    .expect("non-empty var list");
                ledger.add(
                    PenaltyCategory::CrossShiftCapacity,
                    weights.cross_shift_capacity,
                    overlap,
                );
            }
        }

        // descending-capacity ordering of daily counts
        let mut ordered = counts.clone();
        ordered.sort_by_key(|(code, _)| rank_of[*code]);
        for pair in ordered.windows(2) {
            let (_, hi_count) = pair[0];
            let (_, lo_count) = pair[1];
            let breach = cp.slack(headcount);
            let allowed = cp.model.sum(&[hi_count, breach]);
            cp.model.c(lo_count).le(allowed);
            ledger.add(PenaltyCategory::DailyShiftRatio, weights.daily_shift_ratio, breach);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::horizon::Horizon;
    use crate::domain::testkit;
    use crate::settings::PlannerSettings;
    use crate::solver::constraints::{coverage, team};

    #[test]
    fn minimum_staffing_is_hard() {
        let input = testkit::tiny_input();
        let horizon = Horizon::build(input.from, input.to).unwrap();
        let settings = PlannerSettings::default();
        let ctx = PlanContext::prepare(&input, &horizon, Default::default(), &settings);
        let mut cp = Cp::new();
        let vars = VarSet::build(&mut cp, &ctx);
        let mut ledger = PenaltyLedger::default();
        team::apply(&mut cp, &ctx, &vars);
        coverage::apply(&mut cp, &ctx, &vars);
        apply(&mut cp, &ctx, &vars, &mut ledger);

        let solution = cp.model.solve().expect("tiny fixture is satisfiable");
        for date in horizon.dates() {
            for shift in &ctx.shifts {
                if !shift.operates_on(date) {
                    continue;
                }
                let staffed: i32 = ctx
                    .employees
                    .iter()
                    .flat_map(|e| vars.use_vars(e.id, date, &shift.code))
                    .map(|v| solution.get::<i32>(v))
                    .sum();
                assert!(
                    staffed >= shift.min_staff(date) as i32,
                    "{} understaffed on {date}",
                    shift.code
                );
            }
        }
    }

    #[test]
    fn impossible_minimum_staffing_is_infeasible() {
        let mut input = testkit::tiny_input();
        for shift in &mut input.shift_kinds {
            // 3 shifts x 4 minimum = 12 heads needed, only 6 exist
            shift.min_staff_weekday = 4;
            shift.max_staff_weekday = 4;
        }
        let horizon = Horizon::build(input.from, input.to).unwrap();
        let settings = PlannerSettings::default();
        let ctx = PlanContext::prepare(&input, &horizon, Default::default(), &settings);
        let mut cp = Cp::new();
        let vars = VarSet::build(&mut cp, &ctx);
        let mut ledger = PenaltyLedger::default();
        team::apply(&mut cp, &ctx, &vars);
        coverage::apply(&mut cp, &ctx, &vars);
        apply(&mut cp, &ctx, &vars, &mut ledger);

        assert!(cp.model.solve().is_err());
    }
}
