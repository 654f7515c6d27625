use std::collections::BTreeMap;

use chrono::NaiveDate;
use selen::prelude::VarId;
use shared::time;
use shared::types::{ShiftCode, WeekRef};
use uuid::Uuid;

use crate::solver::context::PlanContext;
use crate::solver::cp::Cp;

/// All decision variables, keyed the way the constraint passes look them up.
///
/// A missing entry is semantically a variable fixed to 0: impossible states
/// (absent employee, shift not operating that weekday, code outside the
/// team's reach) are simply never created.
pub(crate) struct VarSet {
    /// Team `t` is assigned code `c` for week `w`.
    pub team_shift: BTreeMap<(Uuid, WeekRef, ShiftCode), VarId>,
    /// Employee works on a date, own-team or cross-team.
    pub active: BTreeMap<(Uuid, NaiveDate), VarId>,
    /// Employee works their own team's shift `c` on a weekday.
    pub own: BTreeMap<(Uuid, NaiveDate, ShiftCode), VarId>,
    /// Employee is loaned out on shift `c` on a weekday.
    pub cross: BTreeMap<(Uuid, NaiveDate, ShiftCode), VarId>,
    /// Employee works shift `c` on a weekend date; independent of rotation.
    pub weekend: BTreeMap<(Uuid, NaiveDate, ShiftCode), VarId>,
    /// Employee holds the weekly day-duty marker.
    pub td: BTreeMap<(Uuid, WeekRef), VarId>,
    /// Employee works code `c` at least once in week `w`.
    pub week_code: BTreeMap<(Uuid, WeekRef, ShiftCode), VarId>,
}

impl VarSet {
    pub fn build(cp: &mut Cp, ctx: &PlanContext<'_>) -> Self {
        let mut vars = Self {
            team_shift: BTreeMap::new(),
            active: BTreeMap::new(),
            own: BTreeMap::new(),
            cross: BTreeMap::new(),
            weekend: BTreeMap::new(),
            td: BTreeMap::new(),
            week_code: BTreeMap::new(),
        };

        for team in &ctx.teams {
            for bucket in &ctx.horizon.weeks {
                for code in &ctx.workable[&team.id] {
                    vars.team_shift
                        .insert((team.id, bucket.week, code.clone()), cp.flag());
                }
            }
        }

        for employee in &ctx.employees {
            let team = ctx.team_of(employee);
            for bucket in &ctx.horizon.weeks {
                let mut week_codes: Vec<ShiftCode> = Vec::new();
                for &date in &bucket.dates {
                    if ctx.is_absent(employee.id, date) {
                        continue;
                    }
                    vars.active.insert((employee.id, date), cp.flag());
                    if time::is_weekend(date) {
                        for shift in &ctx.shifts {
                            if !shift.operates_on(date) {
                                continue;
                            }
                            vars.weekend
                                .insert((employee.id, date, shift.code.clone()), cp.flag());
                            if !week_codes.contains(&shift.code) {
                                week_codes.push(shift.code.clone());
                            }
                        }
                    } else {
                        for code in &ctx.workable[&team.id] {
                            if !ctx.shift_by_code[code].operates_on(date) {
                                continue;
                            }
                            vars.own
                                .insert((employee.id, date, code.clone()), cp.flag());
                            vars.cross
                                .insert((employee.id, date, code.clone()), cp.flag());
                            if !week_codes.contains(code) {
                                week_codes.push(code.clone());
                            }
                        }
                    }
                }

                for code in week_codes {
                    vars.week_code
                        .insert((employee.id, bucket.week, code), cp.flag());
                }

                let absent_this_week = bucket
                    .dates
                    .iter()
                    .any(|d| ctx.is_absent(employee.id, *d));
                if employee.td_qualified && !absent_this_week {
                    vars.td.insert((employee.id, bucket.week), cp.flag());
                }
            }
        }

        vars
    }

    /// The variables realizing "employee works `code` on `date`": own plus
    /// cross on weekdays, the weekend variable otherwise. At most one of them
    /// is 1 in any solution.
    pub fn use_vars(&self, employee_id: Uuid, date: NaiveDate, code: &ShiftCode) -> Vec<VarId> {
        let key = (employee_id, date, code.clone());
        if time::is_weekend(date) {
            self.weekend.get(&key).copied().into_iter().collect()
        } else {
            self.own
                .get(&key)
                .copied()
                .into_iter()
                .chain(self.cross.get(&key).copied())
                .collect()
        }
    }
}
