//! Constraint emission, in a fixed pass order: team rotation, employee
//! coverage linkage, staffing, lock assertion, hour floors, day-sequence
//! rules. Hard constraints are posted directly; soft ones add weighted slack
//! variables to the penalty ledger.

pub(crate) mod coverage;
pub(crate) mod hours;
pub(crate) mod locks;
pub(crate) mod sequence;
pub(crate) mod staffing;
pub(crate) mod team;

use crate::solver::context::PlanContext;
use crate::solver::cp::Cp;
use crate::solver::penalty::PenaltyLedger;
use crate::solver::variables::VarSet;

pub(crate) fn apply_all(cp: &mut Cp, ctx: &PlanContext<'_>, vars: &VarSet) -> PenaltyLedger {
    let mut ledger = PenaltyLedger::default();
    team::apply(cp, ctx, vars);
    coverage::apply(cp, ctx, vars);
    staffing::apply(cp, ctx, vars, &mut ledger);
    locks::apply(cp, ctx, vars);
    hours::apply(cp, ctx, vars, &mut ledger);
    sequence::apply(cp, ctx, vars, &mut ledger);
    tracing::debug!(penalty_terms = ledger.len(), "Constraint emission finished");
    ledger
}
