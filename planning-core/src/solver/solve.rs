use std::time::{Duration, Instant};

use selen::prelude::*;
use shared::time;
use shared::types::SolveStatus;

use crate::domain::bundle::PlanInput;
use crate::domain::horizon::Horizon;
use crate::domain::store::PreviousShifts;
use crate::error::PlannerError;
use crate::settings::PlannerSettings;
use crate::solver::constraints;
use crate::solver::context::PlanContext;
use crate::solver::cp::Cp;
use crate::solver::extract;
use crate::solver::outcome::{Diagnosis, PlanOutcome};
use crate::solver::penalty::PenaltyLedger;
use crate::solver::variables::VarSet;

/// Compiles the constraint program and drives the solver.
///
/// Two passes: an optimization pass under the time budget, then a
/// satisfiability pass if optimization proves nothing in time, so a usable
/// plan is still produced whenever one exists. Only when both passes come
/// back empty does the driver classify the program as infeasible or timed
/// out.
pub fn plan(
    input: &PlanInput,
    horizon: &Horizon,
    previous: &PreviousShifts,
    settings: &PlannerSettings,
) -> Result<PlanOutcome, PlannerError> {
    let ctx = PlanContext::prepare(input, horizon, previous.clone(), settings);
    tracing::info!(
        employees = ctx.employees.len(),
        teams = ctx.teams.len(),
        weeks = ctx.horizon.weeks.len(),
        previous_shifts = ctx.previous.len(),
        workers = settings.workers,
        "Compiling constraint program"
    );

    let limit = Duration::from_secs(settings.time_limit_secs.max(1));
    let started = Instant::now();

    let (mut cp, vars, ledger) = compile(&ctx);
    let objective = build_objective(&mut cp, &ledger);
    let optimized = run_with_deadline(limit, move || cp.into_model().minimize(objective));

    match optimized {
        Some(Ok(solution)) => {
            tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "Optimum found");
            let plan = extract::extract(&ctx, &vars, &ledger, &solution, SolveStatus::Optimal)?;
            return Ok(PlanOutcome::Planned(plan));
        }
        Some(Err(e)) => {
            tracing::warn!(
                error = format!("{e:?}"),
                "Optimization pass found no solution; running satisfiability pass"
            );
        }
        None => {
            tracing::warn!(
                time_limit_secs = settings.time_limit_secs,
                "Optimization pass hit the time limit; running satisfiability pass"
            );
        }
    }

    let (cp, vars, ledger) = compile(&ctx);
    let satisfied = run_with_deadline(limit, move || cp.into_model().solve());

    match satisfied {
        Some(Ok(solution)) => {
            let plan = extract::extract(&ctx, &vars, &ledger, &solution, SolveStatus::Feasible)?;
            Ok(PlanOutcome::Planned(plan))
        }
        Some(Err(e)) => {
            let mut findings = diagnose(&ctx);
            findings.push(format!("Solver verdict: {e:?}"));
            tracing::error!(?findings, "Constraint program is infeasible");
            Ok(PlanOutcome::Failed(Diagnosis {
                status: SolveStatus::Infeasible,
                findings,
            }))
        }
        None => {
            let findings = vec![format!(
                "Time budget of {}s exhausted before the solver reached a verdict; \
                 rerun with a longer limit",
                settings.time_limit_secs
            )];
            tracing::error!("Solve timed out without a verdict");
            Ok(PlanOutcome::Failed(Diagnosis {
                status: SolveStatus::Unknown,
                findings,
            }))
        }
    }
}

fn compile(ctx: &PlanContext<'_>) -> (Cp, VarSet, PenaltyLedger) {
    let mut cp = Cp::new();
    let vars = VarSet::build(&mut cp, ctx);
    let ledger = constraints::apply_all(&mut cp, ctx, &vars);
    (cp, vars, ledger)
}

/// Weighted penalty sum in fixed category order.
fn build_objective(cp: &mut Cp, ledger: &PenaltyLedger) -> VarId {
    let mut terms: Vec<VarId> = Vec::new();
    for term in ledger.in_category_order() {
        match term.weight {
            0 => {}
            1 => terms.push(term.var),
            weight => {
                let factor = cp.konst(weight);
                terms.push(cp.model.mul(term.var, factor));
            }
        }
    }
    cp.sum(&terms)
}

/// Runs the blocking solve on a watchdog thread; `None` means the deadline
/// passed first. The CSP backend has no wall-clock parameter of its own, so
/// the budget is enforced here.
fn run_with_deadline<T, F>(limit: Duration, job: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = std::sync::mpsc::channel();
    let spawned = std::thread::Builder::new()
        .name("cp-solve".into())
        .spawn(move || {
            let _ = tx.send(job());
        });
    if spawned.is_err() {
        return None;
    }
    rx.recv_timeout(limit).ok()
}

/// Inspects the input for the known shapes behind an infeasible program.
fn diagnose(ctx: &PlanContext<'_>) -> Vec<String> {
    let mut findings = Vec::new();
    let horizon = ctx.horizon;

    let partial_start = horizon.original_start != horizon.extended_start;
    let partial_end = horizon.original_end != horizon.extended_end;
    if (partial_start || partial_end) && ctx.teams.len() == 3 && ctx.shifts.len() == 3 {
        findings.push(
            "The range starts or ends mid-week while three teams rotate over three shifts; \
             the boundary weeks leave no slack to meet staffing minima"
                .to_string(),
        );
    }

    for team in &ctx.teams {
        let size = ctx.members.get(&team.id).map_or(0, |m| m.len());
        let need = ctx.workable[&team.id]
            .iter()
            .map(|code| ctx.shift_by_code[code].min_staff_weekday)
            .max()
            .unwrap_or(0);
        if (size as u32) < need {
            findings.push(format!(
                "Team {} has {size} members but its shifts require at least {need}",
                team.name
            ));
        }
    }

    for shift in &ctx.shifts {
        let mut worst: Option<(chrono::NaiveDate, usize, u32)> = None;
        for date in horizon.dates() {
            if !shift.operates_on(date) {
                continue;
            }
            let eligible = ctx
                .employees
                .iter()
                .filter(|e| !ctx.is_absent(e.id, date))
                .filter(|e| {
                    time::is_weekend(date)
                        || ctx.workable[&e.team_id.expect("plannable")].contains(&shift.code)
                })
                .count();
            let need = shift.min_staff(date);
            if (eligible as u32) < need && worst.is_none_or(|(_, have, _)| eligible < have) {
                worst = Some((date, eligible, need));
            }
        }
        if let Some((date, eligible, need)) = worst {
            findings.push(format!(
                "Shift {} needs {need} on {date} but only {eligible} employees are eligible",
                shift.code
            ));
        }
    }

    for ((employee_id, date), code) in &ctx.locks.employee_shift {
        if time::is_weekend(*date) {
            continue;
        }
        let employee = ctx
            .employees
            .iter()
            .find(|e| e.id == *employee_id)
            .expect("surviving locks reference plannable employees");
        let team = ctx.team_of(employee);
        if let Some(team_code) = ctx.locks.team_week.get(&(team.id, shared::types::WeekRef::of(*date)))
            && team_code != code
        {
            findings.push(format!(
                "Lock {code} for employee {employee_id} on {date} contradicts the \
                 team-week lock {team_code}"
            ));
        }
    }

    if findings.is_empty() {
        findings.push(
            "No known failure pattern matched; the constraint interactions themselves \
             are unsatisfiable"
                .to_string(),
        );
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testkit;

    #[test]
    fn diagnose_names_undersized_teams() {
        let mut input = testkit::tiny_input();
        for shift in &mut input.shift_kinds {
            shift.min_staff_weekday = 4;
            shift.max_staff_weekday = 4;
        }
        let horizon = Horizon::build(input.from, input.to).unwrap();
        let settings = PlannerSettings::default();
        let ctx = PlanContext::prepare(&input, &horizon, Default::default(), &settings);

        let findings = diagnose(&ctx);

        assert!(findings.iter().any(|f| f.contains("members")));
    }

    #[test]
    fn infeasible_program_returns_a_diagnosis() {
        let mut input = testkit::tiny_input();
        for shift in &mut input.shift_kinds {
            shift.min_staff_weekday = 4;
            shift.max_staff_weekday = 4;
        }
        let horizon = Horizon::build(input.from, input.to).unwrap();
        let mut settings = PlannerSettings::default();
        settings.time_limit_secs = 60;

        let outcome = plan(&input, &horizon, &PreviousShifts::new(), &settings).unwrap();

        match outcome {
            PlanOutcome::Failed(diagnosis) => {
                assert_eq!(diagnosis.status, SolveStatus::Infeasible);
                assert!(!diagnosis.findings.is_empty());
            }
            PlanOutcome::Planned(_) => panic!("expected infeasibility"),
        }
    }
}
