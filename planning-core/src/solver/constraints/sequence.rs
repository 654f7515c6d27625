use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use selen::prelude::*;
use shared::types::ShiftCode;
use uuid::Uuid;

use crate::solver::context::PlanContext;
use crate::solver::cp::Cp;
use crate::solver::penalty::{PenaltyCategory, PenaltyLedger};
use crate::solver::variables::VarSet;

/// Whether an employee carries a shift on one calendar day: decided for days
/// before the extended range (previous-shift map), variable inside it.
#[derive(Clone, Copy)]
enum DayUse {
    No,
    Yes,
    Open(VarId),
}

/// Day-sequence rules: rest transitions, rotation order between weeks,
/// consecutive-day windows (per code and any-shift), A-B-A shift hopping,
/// and the contiguous-block bonuses.
pub(crate) fn apply(cp: &mut Cp, ctx: &PlanContext<'_>, vars: &VarSet, ledger: &mut PenaltyLedger) {
    Emitter {
        cp,
        ctx,
        vars,
        ledger,
        code_use: BTreeMap::new(),
        any_use: BTreeMap::new(),
    }
    .run();
}

struct Emitter<'a, 'b> {
    cp: &'b mut Cp,
    ctx: &'b PlanContext<'a>,
    vars: &'b VarSet,
    ledger: &'b mut PenaltyLedger,
    code_use: BTreeMap<(Uuid, NaiveDate, ShiftCode), DayUse>,
    any_use: BTreeMap<(Uuid, NaiveDate), DayUse>,
}

impl Emitter<'_, '_> {
    fn run(mut self) {
        self.rotation_order();
        self.rest_transitions();
        self.consecutive_windows();
        self.shift_hopping();
        self.block_bonuses();
    }

    fn code_use(&mut self, employee_id: Uuid, date: NaiveDate, code: &ShiftCode) -> DayUse {
        let key = (employee_id, date, code.clone());
        if let Some(&cached) = self.code_use.get(&key) {
            return cached;
        }
        let resolved = if date < self.ctx.horizon.extended_start {
            match self.ctx.previous_code(employee_id, date) {
                Some(previous) if previous == code => DayUse::Yes,
                _ => DayUse::No,
            }
        } else if date < self.ctx.horizon.original_start
            && let Some(previous) = self.ctx.previous_code(employee_id, date)
        {
            // a demoted boundary-week lock; the day is replanned, but the
            // counter still treats the committed shift as history
            if previous == code {
                DayUse::Yes
            } else {
                DayUse::No
            }
        } else {
            let uses = self.vars.use_vars(employee_id, date, code);
            if uses.is_empty() {
                DayUse::No
            } else {
                DayUse::Open(self.cp.sum(&uses))
            }
        };
        self.code_use.insert(key, resolved);
        resolved
    }

    fn any_use(&mut self, employee_id: Uuid, date: NaiveDate) -> DayUse {
        let key = (employee_id, date);
        if let Some(&cached) = self.any_use.get(&key) {
            return cached;
        }
        let decided = date < self.ctx.horizon.extended_start
            || (date < self.ctx.horizon.original_start
                && self.ctx.previous_code(employee_id, date).is_some());
        let resolved = if decided {
            if self.ctx.previous_code(employee_id, date).is_some() {
                DayUse::Yes
            } else {
                DayUse::No
            }
        } else {
            match self.vars.active.get(&key) {
                Some(&active) => DayUse::Open(active),
                None => DayUse::No,
            }
        };
        self.any_use.insert(key, resolved);
        resolved
    }

    /// Adds one penalty unit that fires when every day in `pattern` carries
    /// its shift. Days already decided in the past tighten the threshold;
    /// a single impossible day cancels the whole window.
    fn penalize_pattern(&mut self, pattern: &[DayUse], category: PenaltyCategory, weight: i64) {
        let mut open: Vec<VarId> = Vec::new();
        for day in pattern {
            match day {
                DayUse::No => return,
                DayUse::Yes => {}
                DayUse::Open(var) => open.push(*var),
            }
        }
        if open.is_empty() {
            return;
        }
        let fired = self.cp.flag();
        let threshold = open.len() as i64 - 1;
        self.cp.at_least_overflow(fired, &open, threshold);
        self.ledger.add(category, weight, fired);
    }

    /// Week-to-week transitions outside the rotation cycle order. Repeats and
    /// the cyclic wrap are always valid.
    fn rotation_order(&mut self) {
        let weight = self.ctx.settings.weights.rotation_order;
        for employee in &self.ctx.employees {
            let team = self.ctx.team_of(employee);
            let cycle = &self.ctx.rotation[&team.id];
            if cycle.len() < 2 {
                continue;
            }
            let mut invalid: Vec<(&ShiftCode, &ShiftCode)> = Vec::new();
            for (i, from) in cycle.iter().enumerate() {
                let successor = &cycle[(i + 1) % cycle.len()];
                for to in cycle {
                    if to != from && to != successor {
                        invalid.push((from, to));
                    }
                }
            }
            for weeks in self.ctx.horizon.weeks.windows(2) {
                for (from, to) in &invalid {
                    let first = self
                        .vars
                        .week_code
                        .get(&(employee.id, weeks[0].week, (*from).clone()));
                    let second = self
                        .vars
                        .week_code
                        .get(&(employee.id, weeks[1].week, (*to).clone()));
                    if let (Some(&first), Some(&second)) = (first, second) {
                        let fired = self.cp.flag();
                        self.cp.at_least_overflow(fired, &[first, second], 1);
                        self.ledger.add(PenaltyCategory::RotationOrder, weight, fired);
                    }
                }
            }
        }
    }

    /// The 11-hour rule, expressed as forbidden (previous, next) code pairs.
    /// Sunday-to-Monday transitions stay cheap enough for rotation to force
    /// them; all others are priced as effectively hard.
    fn rest_transitions(&mut self) {
        if self.ctx.settings.min_rest_hours == 0 {
            return;
        }
        let transitions = self.ctx.settings.forbidden_rest_transitions.clone();
        let sunday_weight = self.ctx.settings.weights.rest_sunday_monday;
        let other_weight = self.ctx.settings.weights.rest_other;
        let employees: Vec<Uuid> = self.ctx.employees.iter().map(|e| e.id).collect();
        let dates: Vec<NaiveDate> = self.ctx.horizon.dates().collect();

        for employee_id in employees {
            for &next_day in &dates {
                let prev_day = next_day - Duration::days(1);
                let (category, weight) = if prev_day.weekday() == Weekday::Sun {
                    (PenaltyCategory::RestSundayMonday, sunday_weight)
                } else {
                    (PenaltyCategory::RestOther, other_weight)
                };
                for (prev_code, next_code) in &transitions {
                    let pattern = [
                        self.code_use(employee_id, prev_day, prev_code),
                        self.code_use(employee_id, next_day, next_code),
                    ];
                    self.penalize_pattern(&pattern, category, weight);
                }
            }
        }
    }

    /// Calendar-day windows one day longer than the allowed maximum, per
    /// shift code and over any shift. Windows reach back into the
    /// previous-shift map so cross-month chains are detected.
    fn consecutive_windows(&mut self) {
        let weight = self.ctx.settings.weights.consecutive_days;
        let extended_start = self.ctx.horizon.extended_start;
        let extended_end = self.ctx.horizon.extended_end;
        let employees: Vec<Uuid> = self.ctx.employees.iter().map(|e| e.id).collect();
        let codes: Vec<(ShiftCode, i64)> = self
            .ctx
            .shifts
            .iter()
            .map(|s| (s.code.clone(), s.max_consecutive_days as i64))
            .collect();

        for employee_id in &employees {
            for (code, limit) in &codes {
                if *limit == 0 {
                    continue;
                }
                let mut start = extended_start - Duration::days(*limit);
                while start + Duration::days(*limit) <= extended_end {
                    let pattern: Vec<DayUse> = (0..=*limit)
                        .map(|offset| {
                            self.code_use(*employee_id, start + Duration::days(offset), code)
                        })
                        .collect();
                    self.penalize_pattern(&pattern, PenaltyCategory::ConsecutiveDays, weight);
                    start += Duration::days(1);
                }
            }

            let any_limit = self.ctx.settings.max_consecutive_any as i64;
            if any_limit == 0 {
                continue;
            }
            let mut start = extended_start - Duration::days(any_limit);
            while start + Duration::days(any_limit) <= extended_end {
                let pattern: Vec<DayUse> = (0..=any_limit)
                    .map(|offset| self.any_use(*employee_id, start + Duration::days(offset)))
                    .collect();
                self.penalize_pattern(&pattern, PenaltyCategory::ConsecutiveDays, weight);
                start += Duration::days(1);
            }
        }
    }

    /// A-B-A patterns across three consecutive days.
    fn shift_hopping(&mut self) {
        let weight = self.ctx.settings.weights.shift_hopping;
        let employees: Vec<Uuid> = self.ctx.employees.iter().map(|e| e.id).collect();
        let codes: Vec<ShiftCode> = self.ctx.shifts.iter().map(|s| s.code.clone()).collect();
        let dates: Vec<NaiveDate> = self.ctx.horizon.dates().collect();

        for employee_id in employees {
            for &last in &dates {
                let first = last - Duration::days(2);
                let middle = last - Duration::days(1);
                for a in &codes {
                    for b in &codes {
                        if a == b {
                            continue;
                        }
                        let pattern = [
                            self.code_use(employee_id, first, a),
                            self.code_use(employee_id, middle, b),
                            self.code_use(employee_id, last, a),
                        ];
                        self.penalize_pattern(&pattern, PenaltyCategory::ShiftHopping, weight);
                    }
                }
            }
        }
    }

    /// Negative-weight flags that fire when an employee works a contiguous
    /// weekday block, weekend block, or the whole week.
    fn block_bonuses(&mut self) {
        let weights = self.ctx.settings.weights.clone();
        for employee in &self.ctx.employees {
            for bucket in &self.ctx.horizon.weeks {
                let weekday_actives: Vec<VarId> = bucket
                    .weekdays()
                    .iter()
                    .filter_map(|d| self.vars.active.get(&(employee.id, *d)).copied())
                    .collect();
                if weekday_actives.len() == 5 {
                    self.block_flag(&weekday_actives, weights.block_weekdays);
                }

                let weekend_actives: Vec<VarId> = bucket
                    .weekend()
                    .iter()
                    .filter_map(|d| self.vars.active.get(&(employee.id, *d)).copied())
                    .collect();
                if weekend_actives.len() == 2 {
                    self.block_flag(&weekend_actives, weights.block_weekend);
                }

                if weekday_actives.len() == 5 && weekend_actives.len() == 2 {
                    let full: Vec<VarId> = weekday_actives
                        .iter()
                        .chain(weekend_actives.iter())
                        .copied()
                        .collect();
                    self.block_flag(&full, weights.block_full_week);
                }
            }
        }
    }

    fn block_flag(&mut self, actives: &[VarId], weight: i64) {
        let bonus = self.cp.flag();
        for &active in actives {
            self.cp.model.c(bonus).le(active);
        }
        self.ledger.add(PenaltyCategory::BlockBonus, weight, bonus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::horizon::Horizon;
    use crate::domain::store::PreviousShifts;
    use crate::domain::testkit;
    use crate::settings::PlannerSettings;
    use crate::solver::constraints::{coverage, team};

    fn compile(
        input: &crate::domain::bundle::PlanInput,
        horizon: &Horizon,
        previous: PreviousShifts,
        settings: &PlannerSettings,
    ) -> (Cp, VarSet, PenaltyLedger) {
        let ctx = PlanContext::prepare(input, horizon, previous, settings);
        let mut cp = Cp::new();
        let vars = VarSet::build(&mut cp, &ctx);
        let mut ledger = PenaltyLedger::default();
        team::apply(&mut cp, &ctx, &vars);
        coverage::apply(&mut cp, &ctx, &vars);
        apply(&mut cp, &ctx, &vars, &mut ledger);
        (cp, vars, ledger)
    }

    /// An employee whose team holds shift F in the first horizon week, so
    /// forcing them onto F does not contradict rotation.
    fn f_team_employee(input: &crate::domain::bundle::PlanInput, horizon: &Horizon) -> Uuid {
        let week = horizon.weeks[0].week;
        let team = input
            .teams
            .iter()
            .find(|t| (week.week as usize + t.rotation_offset as usize) % 3 == 0)
            .expect("one team rotates onto F");
        input
            .employees
            .iter()
            .find(|e| e.team_id == Some(team.id))
            .expect("team has members")
            .id
    }

    #[test]
    fn saturated_prior_chain_fires_consecutive_penalty() {
        let input = testkit::tiny_input();
        let horizon = Horizon::build(input.from, input.to).unwrap();
        let settings = PlannerSettings::default();

        // employee worked the six days right before the extended range
        let employee_id = f_team_employee(&input, &horizon);
        let mut previous = PreviousShifts::new();
        for back in 1..=6 {
            previous.insert(
                (employee_id, horizon.extended_start - Duration::days(back)),
                "F".into(),
            );
        }

        let (mut cp, vars, ledger) = compile(&input, &horizon, previous, &settings);

        // force the same employee to also work the first horizon day on F
        let monday = horizon.extended_start;
        for var in vars.use_vars(employee_id, monday, &"F".into()) {
            cp.model.c(var).eq(int(0));
        }
        // without working day 7, no window is saturated
        let consecutive: Vec<VarId> = ledger
            .in_category_order()
            .iter()
            .filter(|t| t.category == PenaltyCategory::ConsecutiveDays)
            .map(|t| t.var)
            .collect();
        assert!(!consecutive.is_empty());
        let objective = cp.sum(&consecutive);
        let solution = cp.model.minimize(objective).expect("satisfiable");
        let fired: i32 = consecutive.iter().map(|v| solution.get::<i32>(*v)).sum();
        assert_eq!(fired, 0, "chain broken on day seven fires nothing");
    }

    #[test]
    fn prior_chain_plus_first_day_is_detected() {
        let input = testkit::tiny_input();
        let horizon = Horizon::build(input.from, input.to).unwrap();
        let settings = PlannerSettings::default();

        let employee_id = f_team_employee(&input, &horizon);
        let mut previous = PreviousShifts::new();
        for back in 1..=6 {
            previous.insert(
                (employee_id, horizon.extended_start - Duration::days(back)),
                "F".into(),
            );
        }

        let (mut cp, vars, ledger) = compile(&input, &horizon, previous, &settings);

        // employee keeps the chain going on the first Monday
        let monday = horizon.extended_start;
        let monday_f = vars.use_vars(employee_id, monday, &"F".into());
        let total = cp.sum(&monday_f);
        cp.model.c(total).eq(int(1));

        let consecutive: Vec<VarId> = ledger
            .in_category_order()
            .iter()
            .filter(|t| t.category == PenaltyCategory::ConsecutiveDays)
            .map(|t| t.var)
            .collect();
        let objective = cp.sum(&consecutive);
        let solution = cp.model.minimize(objective).expect("satisfiable");
        let fired: i32 = consecutive.iter().map(|v| solution.get::<i32>(*v)).sum();
        // the 6-day prior chain + Monday saturates one per-code window and
        // one any-shift window
        assert!(fired >= 2, "expected both window families to fire, got {fired}");
    }

    #[test]
    fn sunday_monday_rest_transition_is_cheap_but_detected() {
        let input = testkit::tiny_input();
        let horizon = Horizon::build(input.from, input.to).unwrap();
        let settings = PlannerSettings::default();

        // previous Sunday on S, so working F on the first Monday violates rest
        let employee_id = f_team_employee(&input, &horizon);
        let mut previous = PreviousShifts::new();
        previous.insert(
            (employee_id, horizon.extended_start - Duration::days(1)),
            "S".into(),
        );

        let (mut cp, vars, ledger) = compile(&input, &horizon, previous, &settings);

        let monday = horizon.extended_start;
        let monday_f = vars.use_vars(employee_id, monday, &"F".into());
        let total = cp.sum(&monday_f);
        cp.model.c(total).eq(int(1));

        let rest: Vec<VarId> = ledger
            .in_category_order()
            .iter()
            .filter(|t| t.category == PenaltyCategory::RestSundayMonday)
            .map(|t| t.var)
            .collect();
        assert!(!rest.is_empty());
        let objective = cp.sum(&rest);
        let solution = cp.model.minimize(objective).expect("satisfiable");
        let fired: i32 = rest.iter().map(|v| solution.get::<i32>(*v)).sum();
        assert_eq!(fired, 1);
    }
}
