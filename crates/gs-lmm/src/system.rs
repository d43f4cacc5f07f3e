//! The resource-sharing system: arenas, lifecycle, and concurrency staging.
//!
//! The saturation algorithm itself lives in [`crate::solve`].

use std::collections::VecDeque;

use gs_core::{ActionId, ConstraintId, ResourceId, StagingPolicy, VariableId};
use tracing::trace;

use crate::constraint::{Constraint, ElemRef, SharingPolicy};
use crate::variable::{Element, Variable};
use crate::{LmmError, LmmResult};

/// A max-min fair linear system.
///
/// Constraints and variables live in slot arenas indexed by their typed
/// ids.  Freed slots are recycled, so an id is only meaningful while the
/// object it names is alive.
pub struct System {
    pub(crate) precision:         f64,
    pub(crate) selective_update:  bool,
    staging_policy:               StagingPolicy,
    default_concurrency_limit:    i32,

    pub(crate) constraints:       Vec<Constraint>,
    free_constraints:             Vec<ConstraintId>,
    pub(crate) variables:         Vec<Variable>,
    free_variables:               Vec<VariableId>,

    /// Constraints holding at least one element (full solve scope).
    pub(crate) active_constraints:   Vec<ConstraintId>,
    /// Constraints touched since the last solve (selective solve scope).
    pub(crate) modified_constraints: Vec<ConstraintId>,
    pub(crate) saturated_variables:  VecDeque<VariableId>,
    visited_counter:                 u64,

    pub(crate) modified:      bool,
    pub(crate) track_changes: bool,
    pub(crate) tracked:       Vec<VariableId>,
}

impl System {
    /// Create an empty system with solver tolerance `precision`.
    pub fn new(precision: f64, selective_update: bool) -> Self {
        Self {
            precision,
            selective_update,
            staging_policy:            StagingPolicy::FirstRegistered,
            default_concurrency_limit: -1,
            constraints:               Vec::new(),
            free_constraints:          Vec::new(),
            variables:                 Vec::new(),
            free_variables:            Vec::new(),
            active_constraints:        Vec::new(),
            modified_constraints:      Vec::new(),
            saturated_variables:       VecDeque::new(),
            visited_counter:           1,
            modified:                  false,
            track_changes:             false,
            tracked:                   Vec::new(),
        }
    }

    /// Concurrency limit given to every constraint created afterwards.
    pub fn with_concurrency_limit(mut self, limit: i32) -> Self {
        self.default_concurrency_limit = limit;
        self
    }

    pub fn with_staging_policy(mut self, policy: StagingPolicy) -> Self {
        self.staging_policy = policy;
        self
    }

    /// Record the variables whose value each solve recomputes, for
    /// [`System::take_tracked`].
    pub fn track_changes(&mut self, on: bool) {
        self.track_changes = on;
    }

    #[inline]
    pub fn precision(&self) -> f64 {
        self.precision
    }

    #[inline]
    pub fn is_selective(&self) -> bool {
        self.selective_update
    }

    /// Something changed since the last solve.
    #[inline]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len() - self.free_constraints.len()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len() - self.free_variables.len()
    }

    /// Variables recomputed by the solves since the previous call.
    pub fn take_tracked(&mut self) -> Vec<VariableId> {
        let tracked = std::mem::take(&mut self.tracked);
        for &v in &tracked {
            if let Some(var) = self.variables.get_mut(v.index()) {
                var.tracked = false;
            }
        }
        tracked
    }

    // ── Constraints ───────────────────────────────────────────────────────

    /// Create a constraint of capacity `bound` owned by `owner`.
    pub fn constraint_new(&mut self, owner: ResourceId, bound: f64) -> LmmResult<ConstraintId> {
        if !(bound > 0.0 && bound.is_finite()) {
            return Err(LmmError::Config(format!(
                "constraint bound for {owner} must be positive and finite, got {bound}"
            )));
        }
        let limit = self.default_concurrency_limit;
        let id = match self.free_constraints.pop() {
            Some(id) => {
                self.constraints[id.index()] = Constraint::new(id, owner, bound, limit);
                id
            }
            None => {
                let id = ConstraintId::try_from(self.constraints.len())
                    .map_err(|_| LmmError::Config("too many constraints".into()))?;
                self.constraints.push(Constraint::new(id, owner, bound, limit));
                id
            }
        };
        trace!(%id, %owner, bound, "constraint created");
        Ok(id)
    }

    /// Release an unused constraint.
    pub fn constraint_free(&mut self, id: ConstraintId) -> LmmResult<()> {
        let cnst = self.constraint(id)?;
        if !cnst.elements.is_empty() {
            return Err(LmmError::ConstraintInUse { constraint: id, elements: cnst.elements.len() });
        }
        self.make_constraint_inactive(id);
        self.constraints[id.index()].live = false;
        self.free_constraints.push(id);
        Ok(())
    }

    pub fn constraint(&self, id: ConstraintId) -> LmmResult<&Constraint> {
        match self.constraints.get(id.index()) {
            Some(c) if c.live => Ok(c),
            _ => Err(LmmError::UnknownConstraint(id)),
        }
    }

    pub fn set_sharing_policy(&mut self, id: ConstraintId, policy: SharingPolicy) -> LmmResult<()> {
        self.constraint(id)?;
        self.constraints[id.index()].policy = policy;
        self.modified = true;
        self.update_modified_set(id);
        Ok(())
    }

    /// Change how many enabled variables may touch `id` at once.
    ///
    /// `-1` lifts the limit.  Zero, or a limit below the slots already in
    /// use, is rejected.  Raising the limit enables staged variables.
    pub fn set_concurrency_limit(&mut self, id: ConstraintId, limit: i32) -> LmmResult<()> {
        let cnst = self.constraint(id)?;
        if limit == 0 || limit < -1 {
            return Err(LmmError::Config(format!(
                "concurrency limit of {id} must be -1 or at least 1, got {limit}"
            )));
        }
        if limit > 0 && limit < cnst.concurrency_current {
            return Err(LmmError::Config(format!(
                "concurrency limit {limit} of {id} is below the {} slot(s) in use",
                cnst.concurrency_current
            )));
        }
        self.constraints[id.index()].concurrency_limit = limit;
        self.enable_staged_on(id);
        Ok(())
    }

    /// Change the capacity of `id`.  Zero is allowed (resource turned off).
    pub fn update_constraint_bound(&mut self, id: ConstraintId, bound: f64) -> LmmResult<()> {
        self.constraint(id)?;
        if !(bound >= 0.0 && bound.is_finite()) {
            return Err(LmmError::Config(format!("constraint bound of {id} must be >= 0, got {bound}")));
        }
        self.modified = true;
        self.update_modified_set(id);
        self.constraints[id.index()].bound = bound;
        Ok(())
    }

    /// Capacity consumed by the current solution: the sum (or, for fatpipe
    /// constraints, the maximum) of `coefficient × value` over enabled
    /// elements.
    pub fn constraint_usage(&self, id: ConstraintId) -> LmmResult<f64> {
        let cnst = self.constraint(id)?;
        let mut usage = 0.0f64;
        for r in &cnst.elements {
            let var = &self.variables[r.var.index()];
            if var.weight <= 0.0 {
                continue;
            }
            let coef = var.elements[r.slot as usize].consumption_weight;
            if coef <= 0.0 {
                continue;
            }
            match cnst.policy {
                SharingPolicy::Shared  => usage += coef * var.value,
                SharingPolicy::Fatpipe => usage = usage.max(coef * var.value),
            }
        }
        Ok(usage)
    }

    /// Distinct variables holding an element on `id`, in registration order.
    pub fn variables_of(&self, id: ConstraintId) -> LmmResult<Vec<VariableId>> {
        let cnst = self.constraint(id)?;
        let mut out: Vec<VariableId> = Vec::with_capacity(cnst.elements.len());
        for r in &cnst.elements {
            if !out.contains(&r.var) {
                out.push(r.var);
            }
        }
        Ok(out)
    }

    // ── Variables ─────────────────────────────────────────────────────────

    /// Create a variable owned by `owner`.  `bound < 0` means unbounded.
    pub fn variable_new(&mut self, owner: ActionId, weight: f64, bound: f64) -> LmmResult<VariableId> {
        if !(weight >= 0.0 && weight.is_finite()) {
            return Err(LmmError::Config(format!("variable weight must be >= 0, got {weight}")));
        }
        check_variable_bound(bound)?;
        let id = match self.free_variables.pop() {
            Some(id) => {
                self.variables[id.index()] = Variable::new(id, owner, weight, bound);
                id
            }
            None => {
                let id = VariableId::try_from(self.variables.len())
                    .map_err(|_| LmmError::Config("too many variables".into()))?;
                self.variables.push(Variable::new(id, owner, weight, bound));
                id
            }
        };
        self.modified = true;
        Ok(id)
    }

    /// Remove a variable and all its elements.  Staged variables waiting on
    /// the freed slots are enabled.
    pub fn variable_free(&mut self, id: VariableId) -> LmmResult<()> {
        self.variable(id)?;
        self.modified = true;
        if let Some(first) = self.variables[id.index()].elements.first().map(|e| e.constraint) {
            self.update_modified_set(first);
        }
        let enabled = self.variables[id.index()].weight > 0.0;
        let elements = std::mem::take(&mut self.variables[id.index()].elements);

        let mut touched: Vec<ConstraintId> = Vec::with_capacity(elements.len());
        for (slot, e) in elements.iter().enumerate() {
            let r = ElemRef { var: id, slot: slot as u32 };
            let cnst = &mut self.constraints[e.constraint.index()];
            if enabled {
                cnst.decrease_concurrency(e.concurrency());
            }
            cnst.elements.retain(|&x| x != r);
            cnst.remove_active(r);
            if !touched.contains(&e.constraint) {
                touched.push(e.constraint);
            }
        }
        for c in touched {
            if self.constraints[c.index()].elements.is_empty() {
                self.make_constraint_inactive(c);
            } else {
                self.on_disabled_var(c);
            }
        }

        let var = &mut self.variables[id.index()];
        var.live = false;
        var.value = 0.0;
        var.weight = 0.0;
        var.staged_weight = 0.0;
        self.saturated_variables.retain(|&v| v != id);
        self.free_variables.push(id);
        Ok(())
    }

    pub fn variable(&self, id: VariableId) -> LmmResult<&Variable> {
        match self.variables.get(id.index()) {
            Some(v) if v.live => Ok(v),
            _ => Err(LmmError::UnknownVariable(id)),
        }
    }

    /// Solved value of `id`, or `0.0` for a freed variable.
    #[inline]
    pub fn value(&self, id: VariableId) -> f64 {
        self.variable(id).map_or(0.0, |v| v.value)
    }

    /// Add a new element `(cnst, coef)` to `var`.
    ///
    /// If the variable is enabled and `cnst` lacks the concurrency slots it
    /// needs, the variable is disabled and its weight staged.
    pub fn expand(&mut self, cnst: ConstraintId, var: VariableId, coef: f64) -> LmmResult<()> {
        self.constraint(cnst)?;
        self.variable(var)?;
        check_coefficient(coef)?;
        self.modified = true;

        // Slots this variable already holds on `cnst`.
        let current_share: i32 = {
            let v = &self.variables[var.index()];
            if v.concurrency_share > 1 && v.weight > 0.0 {
                v.elements
                    .iter()
                    .filter(|e| e.constraint == cnst)
                    .map(Element::concurrency)
                    .sum()
            } else {
                0
            }
        };
        let element = Element { constraint: cnst, consumption_weight: coef };
        let v = &self.variables[var.index()];
        // Light elements (cross-traffic) never need a slot.
        let needed = if element.concurrency() > 0 { v.concurrency_share - current_share } else { 0 };
        if v.weight > 0.0 && needed > self.constraints[cnst.index()].concurrency_slack() {
            self.stage_variable(var);
        }

        let v = &mut self.variables[var.index()];
        let slot = v.elements.len() as u32;
        v.elements.push(element);
        let enabled = v.weight > 0.0;
        let first = v.elements[0].constraint;
        let spans_several = v.elements.len() > 1;

        let c = &mut self.constraints[cnst.index()];
        c.elements.push(ElemRef { var, slot });
        if enabled {
            c.increase_concurrency(element.concurrency());
        }

        if !self.selective_update {
            self.make_constraint_active(cnst);
        } else if coef > 0.0 || enabled {
            self.make_constraint_active(cnst);
            self.update_modified_set(cnst);
            if spans_several {
                self.update_modified_set(first);
            }
        }
        Ok(())
    }

    /// Like [`System::expand`], but merge into an existing element on
    /// `cnst`: shared constraints add the coefficients, fatpipe constraints
    /// keep the larger one.
    pub fn expand_add(&mut self, cnst: ConstraintId, var: VariableId, coef: f64) -> LmmResult<()> {
        self.constraint(cnst)?;
        self.variable(var)?;
        check_coefficient(coef)?;
        self.modified = true;
        self.make_constraint_active(cnst);
        self.update_modified_set(cnst);

        let Some(slot) = self.variables[var.index()]
            .elements
            .iter()
            .position(|e| e.constraint == cnst)
        else {
            return self.expand(cnst, var, coef);
        };

        let policy = self.constraints[cnst.index()].policy;
        let v = &self.variables[var.index()];
        let old = v.elements[slot];
        let merged = match policy {
            SharingPolicy::Shared  => old.consumption_weight + coef,
            SharingPolicy::Fatpipe => old.consumption_weight.max(coef),
        };
        let new = Element { constraint: cnst, consumption_weight: merged };

        if v.weight > 0.0 {
            let extra = new.concurrency() - old.concurrency();
            if extra > self.constraints[cnst.index()].concurrency_slack() {
                self.stage_variable(var);
            } else {
                self.constraints[cnst.index()].increase_concurrency(extra);
            }
        }
        self.variables[var.index()].elements[slot] = new;
        Ok(())
    }

    /// Change a variable's weight.
    ///
    /// `0` disables it (its value drops to zero, its elements stay).  A
    /// positive weight on a disabled variable enables it, or stages it when
    /// a constraint has no free slot.
    pub fn update_variable_weight(&mut self, id: VariableId, weight: f64) -> LmmResult<()> {
        let (current, staged) = {
            let v = self.variable(id)?;
            (v.weight, v.staged_weight)
        };
        if !(weight >= 0.0 && weight.is_finite()) {
            return Err(LmmError::Config(format!("variable weight must be >= 0, got {weight}")));
        }
        if weight == current && (weight > 0.0 || staged <= 0.0) {
            return Ok(());
        }
        let enabling = weight > 0.0 && current <= 0.0;
        let disabling = weight <= 0.0 && current > 0.0;
        self.modified = true;
        if let Some(first) = self.variables[id.index()].elements.first().map(|e| e.constraint) {
            self.update_modified_set(first);
        }

        if enabling {
            self.variables[id.index()].staged_weight = weight;
            let v = &self.variables[id.index()];
            if self.min_concurrency_slack(id) < v.concurrency_share {
                trace!(var = %id, weight, "variable staged: no concurrency slot");
                return Ok(());
            }
            self.enable_var(id);
        } else if disabling {
            self.disable_var(id);
            let cnsts: Vec<ConstraintId> =
                self.variables[id.index()].elements.iter().map(|e| e.constraint).collect();
            for c in cnsts {
                self.on_disabled_var(c);
            }
        } else if weight <= 0.0 {
            // Disabling a variable that was only staged.
            self.variables[id.index()].staged_weight = 0.0;
        } else {
            self.variables[id.index()].weight = weight;
        }
        Ok(())
    }

    /// Change a variable's upper bound.  Negative means unbounded.
    pub fn update_variable_bound(&mut self, id: VariableId, bound: f64) -> LmmResult<()> {
        self.variable(id)?;
        check_variable_bound(bound)?;
        self.modified = true;
        if let Some(first) = self.variables[id.index()].elements.first().map(|e| e.constraint) {
            self.update_modified_set(first);
        }
        self.variables[id.index()].bound = if bound < 0.0 { -1.0 } else { bound };
        Ok(())
    }

    /// How many concurrency slots this variable takes on each constraint.
    pub fn set_concurrency_share(&mut self, id: VariableId, share: i32) -> LmmResult<()> {
        self.variable(id)?;
        if share < 1 {
            return Err(LmmError::Config(format!("concurrency share must be >= 1, got {share}")));
        }
        self.variables[id.index()].concurrency_share = share;
        Ok(())
    }

    // ── Invariants ────────────────────────────────────────────────────────

    /// Check the current solution against every capacity and bound.
    ///
    /// Intended for tests and debug assertions; cost is linear in the number
    /// of elements.
    pub fn check_invariants(&self) -> LmmResult<()> {
        let eps = self.precision;
        for cnst in self.constraints.iter().filter(|c| c.live) {
            let usage = self.constraint_usage(cnst.id)?;
            if usage > cnst.bound + cnst.bound * eps + eps {
                return Err(LmmError::Invariant(format!(
                    "{} ({:?}) uses {usage} of bound {}",
                    cnst.id, cnst.policy, cnst.bound
                )));
            }
            if cnst.concurrency_limit >= 0 && cnst.concurrency_current > cnst.concurrency_limit {
                return Err(LmmError::Invariant(format!(
                    "{} holds {} slots over a limit of {}",
                    cnst.id, cnst.concurrency_current, cnst.concurrency_limit
                )));
            }
        }
        for var in self.variables.iter().filter(|v| v.live) {
            if var.weight <= 0.0 && var.value != 0.0 {
                return Err(LmmError::Invariant(format!("disabled {} has value {}", var.id, var.value)));
            }
            if var.bound > 0.0 && var.value > var.bound + var.bound * eps + eps {
                return Err(LmmError::Invariant(format!(
                    "{} has value {} above its bound {}",
                    var.id, var.value, var.bound
                )));
            }
        }
        Ok(())
    }

    // ── Concurrency staging ───────────────────────────────────────────────

    fn min_concurrency_slack(&self, id: VariableId) -> i32 {
        let mut min = i32::MAX;
        for e in self.variables[id.index()].elements.iter().filter(|e| e.concurrency() > 0) {
            let slack = self.constraints[e.constraint.index()].concurrency_slack();
            if slack < min {
                min = slack;
                if slack == 0 {
                    break;
                }
            }
        }
        min
    }

    fn can_enable(&self, id: VariableId) -> bool {
        let v = &self.variables[id.index()];
        v.staged_weight > 0.0 && self.min_concurrency_slack(id) >= v.concurrency_share
    }

    /// Disable an enabled variable and keep its weight for later.
    fn stage_variable(&mut self, id: VariableId) {
        let weight = self.variables[id.index()].weight;
        self.disable_var(id);
        let cnsts: Vec<ConstraintId> =
            self.variables[id.index()].elements.iter().map(|e| e.constraint).collect();
        for c in cnsts {
            self.on_disabled_var(c);
        }
        self.variables[id.index()].staged_weight = weight;
        trace!(var = %id, weight, "variable staged: concurrency limit reached");
    }

    fn enable_var(&mut self, id: VariableId) {
        self.modified = true;
        let v = &mut self.variables[id.index()];
        v.weight = v.staged_weight;
        v.staged_weight = 0.0;
        let elements = v.elements.clone();
        for e in &elements {
            self.constraints[e.constraint.index()].increase_concurrency(e.concurrency());
        }
        // A newly enabled variable links all its constraints together.
        for e in &elements {
            self.update_modified_set(e.constraint);
        }
    }

    fn disable_var(&mut self, id: VariableId) {
        self.modified = true;
        if let Some(first) = self.variables[id.index()].elements.first().map(|e| e.constraint) {
            self.update_modified_set(first);
        }
        let elements = self.variables[id.index()].elements.clone();
        for (slot, e) in elements.iter().enumerate() {
            let cnst = &mut self.constraints[e.constraint.index()];
            cnst.remove_active(ElemRef { var: id, slot: slot as u32 });
            cnst.decrease_concurrency(e.concurrency());
        }
        let v = &mut self.variables[id.index()];
        v.weight = 0.0;
        v.staged_weight = 0.0;
        v.value = 0.0;
    }

    /// A slot may have freed up on `cnst`: enable staged variables in
    /// staging-policy order until the constraint is full again.
    pub(crate) fn on_disabled_var(&mut self, cnst: ConstraintId) {
        if self.constraints[cnst.index()].concurrency_limit < 0 {
            return;
        }
        self.enable_staged_on(cnst);
    }

    fn enable_staged_on(&mut self, cnst: ConstraintId) {
        let limit = self.constraints[cnst.index()].concurrency_limit;
        let mut candidates: Vec<VariableId> = Vec::new();
        for r in &self.constraints[cnst.index()].elements {
            let v = &self.variables[r.var.index()];
            if v.is_staged() && !candidates.contains(&r.var) {
                candidates.push(r.var);
            }
        }
        if self.staging_policy == StagingPolicy::LastRegistered {
            candidates.reverse();
        }
        for var in candidates {
            if limit >= 0 && self.constraints[cnst.index()].concurrency_current >= limit {
                break;
            }
            if self.can_enable(var) {
                trace!(var = %var, constraint = %cnst, "staged variable enabled");
                self.enable_var(var);
            }
        }
    }

    // ── Active / modified constraint sets ─────────────────────────────────

    fn make_constraint_active(&mut self, id: ConstraintId) {
        let c = &mut self.constraints[id.index()];
        if !c.in_active_set {
            c.in_active_set = true;
            self.active_constraints.push(id);
        }
    }

    fn make_constraint_inactive(&mut self, id: ConstraintId) {
        let c = &mut self.constraints[id.index()];
        if c.in_active_set {
            c.in_active_set = false;
            self.active_constraints.retain(|&x| x != id);
        }
        if c.in_modified {
            c.in_modified = false;
            self.modified_constraints.retain(|&x| x != id);
        }
    }

    /// Mark `id` and everything reachable from it through enabled variables
    /// for the next selective solve.
    pub(crate) fn update_modified_set(&mut self, id: ConstraintId) {
        if !self.selective_update || self.constraints[id.index()].in_modified {
            return;
        }
        self.constraints[id.index()].in_modified = true;
        self.modified_constraints.push(id);

        let mut stack = vec![id];
        while let Some(cn) = stack.pop() {
            for k in 0..self.constraints[cn.index()].elements.len() {
                let r = self.constraints[cn.index()].elements[k];
                let var = &self.variables[r.var.index()];
                if var.weight <= 0.0 || var.visited == self.visited_counter {
                    continue;
                }
                let reach: Vec<ConstraintId> = var
                    .elements
                    .iter()
                    .map(|e| e.constraint)
                    .filter(|&c| c != cn)
                    .collect();
                self.variables[r.var.index()].visited = self.visited_counter;
                for c in reach {
                    let cnst = &mut self.constraints[c.index()];
                    if !cnst.in_modified {
                        cnst.in_modified = true;
                        self.modified_constraints.push(c);
                        stack.push(c);
                    }
                }
            }
        }
    }

    pub(crate) fn remove_all_modified_set(&mut self) {
        self.visited_counter += 1;
        for &c in &self.modified_constraints {
            self.constraints[c.index()].in_modified = false;
        }
        self.modified_constraints.clear();
    }
}

fn check_variable_bound(bound: f64) -> LmmResult<()> {
    if bound.is_nan() || bound == 0.0 || bound.is_infinite() && bound > 0.0 {
        return Err(LmmError::Config(format!(
            "variable bound must be positive or negative (unbounded), got {bound}"
        )));
    }
    Ok(())
}

fn check_coefficient(coef: f64) -> LmmResult<()> {
    if !(coef >= 0.0 && coef.is_finite()) {
        return Err(LmmError::Config(format!("consumption weight must be >= 0, got {coef}")));
    }
    Ok(())
}
