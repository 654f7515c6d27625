use std::collections::BTreeMap;

use selen::prelude::*;

/// Thin wrapper around the CSP model: 0/1 flags, cached constants, and the
/// linearization helpers the constraint compiler leans on.
pub(crate) struct Cp {
    pub model: Model,
    consts: BTreeMap<i64, VarId>,
}

impl Cp {
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            consts: BTreeMap::new(),
        }
    }

    /// Hands the finished model to the solver.
    pub fn into_model(self) -> Model {
        self.model
    }

    /// A fresh boolean decision variable.
    pub fn flag(&mut self) -> VarId {
        self.model.int(0, 1)
    }

    /// A non-negative slack variable bounded by `cap`.
    pub fn slack(&mut self, cap: i64) -> VarId {
        self.model.int(0, cap.max(0) as i32)
    }

    /// A variable fixed to `value`; reused across calls.
    pub fn konst(&mut self, value: i64) -> VarId {
        if let Some(&var) = self.consts.get(&value) {
            return var;
        }
        let var = self.model.int(value as i32, value as i32);
        self.consts.insert(value, var);
        var
    }

    /// Sum of `vars`, degrading gracefully for empty and singleton slices.
    pub fn sum(&mut self, vars: &[VarId]) -> VarId {
        match vars.len() {
            0 => self.konst(0),
            1 => vars[0],
            _ => self.model.sum(vars),
        }
    }

    /// Posts `z >= Σ vars − k`, the standard push-up linearization: `z` must
    /// fire once every term in `vars` does.
    pub fn at_least_overflow(&mut self, z: VarId, vars: &[VarId], k: i64) {
        let lhs = self.sum(vars);
        let offset = self.konst(k);
        let rhs = self.model.sum(&[z, offset]);
        self.model.c(lhs).le(rhs);
    }

    /// Returns a slack `s` with `s >= floor − (Σ vars + credit)`, clamped to
    /// `[0, floor]`.
    pub fn shortage(&mut self, vars: &[VarId], floor: i64, credit: i64) -> VarId {
        let s = self.slack(floor);
        let mut terms = vars.to_vec();
        terms.push(s);
        if credit != 0 {
            terms.push(self.konst(credit));
        }
        let lhs = self.sum(&terms);
        self.model.c(lhs).ge(int(floor as i32));
        s
    }

    /// Returns a slack `x` with `x >= Σ vars − ceil`, clamped to `[0, cap]`.
    pub fn excess(&mut self, vars: &[VarId], ceil: i64, cap: i64) -> VarId {
        let x = self.slack(cap);
        self.at_least_overflow(x, vars, ceil);
        x
    }
}
