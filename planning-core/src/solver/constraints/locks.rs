use selen::prelude::*;

use crate::solver::context::PlanContext;
use crate::solver::cp::Cp;
use crate::solver::variables::VarSet;

/// Asserts every lock that survived resolution. Team-week locks are
/// consumed by the rotation pass; this pass pins the per-employee decisions.
pub(crate) fn apply(cp: &mut Cp, ctx: &PlanContext<'_>, vars: &VarSet) {
    for ((employee_id, date), code) in &ctx.locks.employee_shift {
        let uses = vars.use_vars(*employee_id, *date, code);
        if uses.is_empty() {
            tracing::warn!(%employee_id, %date, %code, "Surviving lock has no variable");
            continue;
        }
        let total = cp.sum(&uses);
        cp.model.c(total).eq(int(1));
    }

    for ((employee_id, date), working) in &ctx.locks.employee_weekend {
        match vars.active.get(&(*employee_id, *date)) {
            Some(&active) => {
                cp.model.c(active).eq(int(i32::from(*working)));
            }
            None => {
                tracing::warn!(%employee_id, %date, "Weekend lock has no variable");
            }
        }
    }

    for ((employee_id, week), holding) in &ctx.locks.td {
        match vars.td.get(&(*employee_id, *week)) {
            Some(&td) => {
                cp.model.c(td).eq(int(i32::from(*holding)));
            }
            None => {
                tracing::warn!(%employee_id, %week, "TD lock has no variable");
            }
        }
    }
}
