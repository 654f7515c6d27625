use selen::prelude::*;
use shared::time;

use crate::solver::context::PlanContext;
use crate::solver::cp::Cp;
use crate::solver::variables::VarSet;

/// Links employee-day work to the team's weekly code, enforces the
/// no-double-shift and weekly shift-type-consistency invariants, wires
/// weekend variables into the same indicator set, and keeps the TD marker
/// unique per team and week.
pub(crate) fn apply(cp: &mut Cp, ctx: &PlanContext<'_>, vars: &VarSet) {
    for employee in &ctx.employees {
        let team = ctx.team_of(employee);
        for bucket in &ctx.horizon.weeks {
            for &date in &bucket.dates {
                let Some(&active) = vars.active.get(&(employee.id, date)) else {
                    continue;
                };
                let mut day_vars: Vec<VarId> = Vec::new();
                if time::is_weekend(date) {
                    for shift in &ctx.shifts {
                        let key = (employee.id, date, shift.code.clone());
                        if let Some(&weekend) = vars.weekend.get(&key) {
                            day_vars.push(weekend);
                        }
                    }
                } else {
                    for code in &ctx.workable[&team.id] {
                        let key = (employee.id, date, code.clone());
                        let team_key = (team.id, bucket.week, code.clone());
                        let Some(&team_shift) = vars.team_shift.get(&team_key) else {
                            continue;
                        };
                        // working a code, in-team or loaned out, requires the
                        // team to hold that code this week
                        if let Some(&own) = vars.own.get(&key) {
                            cp.model.c(own).le(team_shift);
                            day_vars.push(own);
                        }
                        if let Some(&cross) = vars.cross.get(&key) {
                            cp.model.c(cross).le(team_shift);
                            day_vars.push(cross);
                        }
                    }
                }
                // exactly the active days carry work; one shift at most
                let total = cp.sum(&day_vars);
                cp.model.c(total).eq(active);
            }

            // weekly shift-type consistency across weekday and weekend use
            let mut indicator_vars: Vec<VarId> = Vec::new();
            for shift in &ctx.shifts {
                let week_key = (employee.id, bucket.week, shift.code.clone());
                let Some(&indicator) = vars.week_code.get(&week_key) else {
                    continue;
                };
                indicator_vars.push(indicator);
                for &date in &bucket.dates {
                    for used in vars.use_vars(employee.id, date, &shift.code) {
                        cp.model.c(used).le(indicator);
                    }
                }
            }
            if !indicator_vars.is_empty() {
                let total = cp.sum(&indicator_vars);
                cp.model.c(total).le(int(1));
            }

            // the TD holder has to be present during the week
            if let Some(&td) = vars.td.get(&(employee.id, bucket.week)) {
                let weekday_active: Vec<VarId> = bucket
                    .weekdays()
                    .iter()
                    .filter_map(|d| vars.active.get(&(employee.id, *d)).copied())
                    .collect();
                let presence = cp.sum(&weekday_active);
                cp.model.c(td).le(presence);
            }
        }
    }

    // at most one TD marker per team and week
    for team in &ctx.teams {
        let Some(members) = ctx.members.get(&team.id) else {
            continue;
        };
        for bucket in &ctx.horizon.weeks {
            let holders: Vec<VarId> = members
                .iter()
                .filter_map(|e| vars.td.get(&(e.id, bucket.week)).copied())
                .collect();
            if holders.len() > 1 {
                let total = cp.sum(&holders);
                cp.model.c(total).le(int(1));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::horizon::Horizon;
    use crate::domain::testkit;
    use crate::settings::PlannerSettings;
    use crate::solver::constraints::team;

    #[test]
    fn active_day_carries_exactly_one_use_variable() {
        let input = testkit::tiny_input();
        let horizon = Horizon::build(input.from, input.to).unwrap();
        let settings = PlannerSettings::default();
        let ctx = PlanContext::prepare(&input, &horizon, Default::default(), &settings);
        let mut cp = Cp::new();
        let vars = VarSet::build(&mut cp, &ctx);
        team::apply(&mut cp, &ctx, &vars);
        apply(&mut cp, &ctx, &vars);

        // force one employee to work the whole week
        let employee_id = ctx.employees[0].id;
        for &date in &horizon.weeks[0].dates {
            let active = vars.active[&(employee_id, date)];
            cp.model.c(active).eq(int(1));
        }

        let solution = cp.model.solve().expect("coverage alone is satisfiable");
        for &date in &horizon.weeks[0].dates {
            let used: i32 = ctx
                .shifts
                .iter()
                .flat_map(|s| vars.use_vars(employee_id, date, &s.code))
                .map(|v| solution.get::<i32>(v))
                .sum();
            assert_eq!(used, 1, "exactly one shift on {date}");
        }
    }

    #[test]
    fn weekly_consistency_holds_a_single_code() {
        let input = testkit::tiny_input();
        let horizon = Horizon::build(input.from, input.to).unwrap();
        let settings = PlannerSettings::default();
        let ctx = PlanContext::prepare(&input, &horizon, Default::default(), &settings);
        let mut cp = Cp::new();
        let vars = VarSet::build(&mut cp, &ctx);
        team::apply(&mut cp, &ctx, &vars);
        apply(&mut cp, &ctx, &vars);

        let employee_id = ctx.employees[0].id;
        for &date in &horizon.weeks[0].dates {
            let active = vars.active[&(employee_id, date)];
            cp.model.c(active).eq(int(1));
        }

        let solution = cp.model.solve().expect("satisfiable");
        let mut codes_seen = std::collections::BTreeSet::new();
        for &date in &horizon.weeks[0].dates {
            for shift in &ctx.shifts {
                for var in vars.use_vars(employee_id, date, &shift.code) {
                    if solution.get::<i32>(var) == 1 {
                        codes_seen.insert(shift.code.clone());
                    }
                }
            }
        }
        assert_eq!(codes_seen.len(), 1, "one shift code across the ISO week");
    }
}
