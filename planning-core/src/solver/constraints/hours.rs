use selen::prelude::*;

use crate::solver::context::PlanContext;
use crate::solver::cp::Cp;
use crate::solver::penalty::{PenaltyCategory, PenaltyLedger};
use crate::solver::variables::VarSet;

/// Monthly hour floors, both demoted to weighted shortages: the absolute
/// minimum (192 h scaled, prorated to the horizon) and the proportional
/// target derived from the weekly target hours. Hours only count inside the
/// original reporting window; training days credit a flat day of hours.
pub(crate) fn apply(cp: &mut Cp, ctx: &PlanContext<'_>, vars: &VarSet, ledger: &mut PenaltyLedger) {
    let weights = &ctx.settings.weights;
    let scale = ctx.settings.hour_scale;
    let in_days = (ctx.horizon.original_end - ctx.horizon.original_start).num_days() + 1;
    let min_floor = ctx.settings.monthly_min_hours as i64 * scale * in_days / 30;

    let original_dates: Vec<_> = ctx
        .horizon
        .dates()
        .filter(|d| ctx.horizon.in_original(*d))
        .collect();

    for employee in &ctx.employees {
        let team = ctx.team_of(employee);

        let mut hour_terms: Vec<VarId> = Vec::new();
        for shift in &ctx.shifts {
            let uses: Vec<VarId> = original_dates
                .iter()
                .flat_map(|d| vars.use_vars(employee.id, *d, &shift.code))
                .collect();
            if uses.is_empty() {
                continue;
            }
            let days_on_shift = cp.sum(&uses);
            let hours_per_day = cp.konst(shift.duration_hours as i64 * scale);
            hour_terms.push(cp.model.mul(days_on_shift, hours_per_day));
        }

        let training_days = original_dates
            .iter()
            .filter(|d| ctx.is_training_day(employee.id, **d))
            .count() as i64;
        let credit = training_days * 8 * scale;

        let min_shortage = cp.shortage(&hour_terms, min_floor, credit);
        ledger.add(
            PenaltyCategory::MinHoursShortage,
            weights.min_hours_shortage,
            min_shortage,
        );

        let weekly_target = ctx.workable[&team.id]
            .iter()
            .map(|code| ctx.shift_by_code[code].target_weekly_hours)
            .max()
            .unwrap_or(0) as i64;
        let target_floor = weekly_target * scale * in_days / 7;
        let target_shortage = cp.shortage(&hour_terms, target_floor, credit);
        ledger.add(
            PenaltyCategory::TargetHoursShortage,
            weights.target_hours_shortage,
            target_shortage,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::horizon::Horizon;
    use crate::domain::testkit;
    use crate::settings::PlannerSettings;
    use crate::solver::constraints::{coverage, team};

    /// With every active variable forced off, both shortages realize their
    /// full floors.
    #[test]
    fn idle_employee_realizes_full_shortage() {
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

        for (_, &active) in &vars.active {
            cp.model.c(active).eq(int(0));
        }
        let terms = ledger.in_category_order();
        let shortage_vars: Vec<_> = terms
            .iter()
            .filter(|t| t.category == PenaltyCategory::MinHoursShortage)
            .map(|t| t.var)
            .collect();
        assert_eq!(shortage_vars.len(), ctx.employees.len());

        let objective = cp.sum(&shortage_vars);
        let solution = cp.model.minimize(objective).expect("satisfiable");
        // 7-day horizon: floor = 192 * 10 * 7 / 30 = 448 deci-hours
        for var in shortage_vars {
            assert_eq!(solution.get::<i32>(var), 448);
        }
    }
}
