use std::collections::BTreeMap;

use selen::prelude::*;
use shared::types::{PlannedShift, SolveStatus, TdMarker};

use crate::error::PlannerError;
use crate::solver::context::PlanContext;
use crate::solver::outcome::{PenaltyEntry, PenaltyReport, Plan};
use crate::solver::penalty::{PenaltyCategory, PenaltyLedger};
use crate::solver::variables::VarSet;

/// Walks the satisfying assignment and emits one row per worked
/// (employee, date) inside the original range.
///
/// Seeing two realized codes on one day means the no-double-shift linkage
/// was compiled wrong; that is fatal, the database unique index is only the
/// backstop behind this check.
pub(crate) fn extract(
    ctx: &PlanContext<'_>,
    vars: &VarSet,
    ledger: &PenaltyLedger,
    solution: &Solution,
    status: SolveStatus,
) -> Result<Plan, PlannerError> {
    let mut assignments = Vec::new();
    for employee in &ctx.employees {
        for date in ctx.horizon.dates() {
            if !ctx.horizon.in_original(date) || ctx.is_absent(employee.id, date) {
                continue;
            }
            let mut realized = Vec::new();
            for shift in &ctx.shifts {
                let worked = vars
                    .use_vars(employee.id, date, &shift.code)
                    .iter()
                    .any(|&var| solution.get::<i32>(var) == 1);
                if worked {
                    realized.push(shift.code.clone());
                }
            }
            match realized.len() {
                0 => {}
                1 => assignments.push(PlannedShift {
                    employee_id: employee.id,
                    date,
                    code: realized.pop().expect("one element"),
                }),
                _ => {
                    return Err(PlannerError::Internal(format!(
                        "Employee {} realized {} shifts on {date}",
                        employee.id,
                        realized.len()
                    )));
                }
            }
        }
    }

    let mut td_markers = Vec::new();
    for ((employee_id, week), &var) in &vars.td {
        let monday = week.monday();
        let sunday = monday + chrono::Duration::days(6);
        let intersects = monday <= ctx.horizon.original_end && sunday >= ctx.horizon.original_start;
        if intersects && solution.get::<i32>(var) == 1 {
            td_markers.push(TdMarker {
                employee_id: *employee_id,
                week: *week,
            });
        }
    }

    let penalties = penalty_report(ledger, solution);
    for entry in &penalties.entries {
        if entry.amount != 0 {
            tracing::info!(
                category = %entry.category,
                violations = entry.violations,
                amount = entry.amount,
                "Realized penalty"
            );
        }
    }
    tracing::info!(
        ?status,
        objective = penalties.objective,
        assignments = assignments.len(),
        "Extracted plan"
    );

    Ok(Plan {
        status,
        assignments,
        td_markers,
        penalties,
        skipped_locks: ctx.locks.skipped.clone(),
    })
}

fn penalty_report(ledger: &PenaltyLedger, solution: &Solution) -> PenaltyReport {
    let mut grouped: BTreeMap<PenaltyCategory, (u32, i64)> = BTreeMap::new();
    let mut objective = 0i64;
    for term in ledger.in_category_order() {
        let value = solution.get::<i32>(term.var) as i64;
        let amount = term.weight * value;
        objective += amount;
        let entry = grouped.entry(term.category).or_insert((0, 0));
        if value > 0 {
            entry.0 += 1;
        }
        entry.1 += amount;
    }
    PenaltyReport {
        objective,
        entries: grouped
            .into_iter()
            .map(|(category, (violations, amount))| PenaltyEntry {
                category,
                violations,
                amount,
            })
            .collect(),
    }
}
