use selen::prelude::*;

use crate::solver::context::PlanContext;
use crate::solver::cp::Cp;
use crate::solver::variables::VarSet;

/// Every team carries exactly one shift code per week, and teams follow
/// their rotation cycle indexed by absolute ISO week number. A locked
/// (team, week) pair overrides the rotation formula.
pub(crate) fn apply(cp: &mut Cp, ctx: &PlanContext<'_>, vars: &VarSet) {
    for team in &ctx.teams {
        let cycle = &ctx.rotation[&team.id];
        for bucket in &ctx.horizon.weeks {
            let week = bucket.week;
            let code_vars: Vec<VarId> = ctx.workable[&team.id]
                .iter()
                .filter_map(|code| {
                    vars.team_shift
                        .get(&(team.id, week, code.clone()))
                        .copied()
                })
                .collect();
            if code_vars.is_empty() {
                continue;
            }
            let total = cp.sum(&code_vars);
            cp.model.c(total).eq(int(1));

            if let Some(code) = ctx.locks.team_week.get(&(team.id, week)) {
                if let Some(&var) = vars.team_shift.get(&(team.id, week, code.clone())) {
                    cp.model.c(var).eq(int(1));
                } else {
                    tracing::warn!(team = %team.name, %week, %code, "Locked code has no variable");
                }
                continue;
            }

            if cycle.is_empty() {
                continue;
            }
            let index = (week.week as usize + team.rotation_offset as usize) % cycle.len();
            let code = &cycle[index];
            match vars.team_shift.get(&(team.id, week, code.clone())) {
                Some(&var) => {
                    cp.model.c(var).eq(int(1));
                }
                None => {
                    tracing::warn!(
                        team = %team.name,
                        %week,
                        %code,
                        "Rotation code not workable for team; week left open"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::horizon::Horizon;
    use crate::domain::testkit;
    use crate::settings::PlannerSettings;
    use crate::solver::context::PlanContext;
    use crate::solver::cp::Cp;
    use crate::solver::variables::VarSet;

    #[test]
    fn rotation_pins_each_team_to_its_cycle_code() {
        let input = testkit::tiny_input();
        let horizon = Horizon::build(input.from, input.to).unwrap();
        let settings = PlannerSettings::default();
        let ctx = PlanContext::prepare(&input, &horizon, Default::default(), &settings);
        let mut cp = Cp::new();
        let vars = VarSet::build(&mut cp, &ctx);

        super::apply(&mut cp, &ctx, &vars);

        let solution = cp.model.solve().expect("rotation alone is satisfiable");
        let week = horizon.weeks[0].week;
        let cycle = &ctx.rotation[&ctx.teams[0].id];
        for team in &ctx.teams {
            let expected =
                &cycle[(week.week as usize + team.rotation_offset as usize) % cycle.len()];
            for code in &ctx.workable[&team.id] {
                let var = vars.team_shift[&(team.id, week, code.clone())];
                let assigned = solution.get::<i32>(var) == 1;
                assert_eq!(assigned, code == expected, "team {} code {}", team.name, code);
            }
        }
    }

    #[test]
    fn team_lock_overrides_rotation() {
        let mut input = testkit::tiny_input();
        let horizon = Horizon::build(input.from, input.to).unwrap();
        let week = horizon.weeks[0].week;
        let team_id = {
            let mut ids: Vec<_> = input.teams.iter().map(|t| t.id).collect();
            ids.sort();
            ids[0]
        };
        input.locks.team_shift.insert((team_id, week), "S".into());
        let settings = PlannerSettings::default();
        let ctx = PlanContext::prepare(&input, &horizon, Default::default(), &settings);
        let mut cp = Cp::new();
        let vars = VarSet::build(&mut cp, &ctx);

        super::apply(&mut cp, &ctx, &vars);

        let solution = cp.model.solve().expect("lock is satisfiable");
        let var = vars.team_shift[&(team_id, week, "S".into())];
        assert_eq!(solution.get::<i32>(var), 1);
    }
}
