//! Max-min saturation.
//!
//! # Algorithm
//!
//! ```text
//! reset value of every enabled variable in scope
//! for each constraint in scope:
//!     remaining = bound
//!     usage     = Σ coef / weight        (max for fatpipe)
//!     light    += (constraint, remaining / usage)   if usage > 0
//! loop while light is non-empty:
//!     min_usage = smallest remaining / usage        (the most constrained)
//!     saturate every variable active on those constraints:
//!         value = min_usage / weight, unless a variable bound is tighter,
//!         in which case only the tightest bounded variables are pinned
//!     subtract the pinned consumption from every constraint they touch,
//!     dropping constraints whose remaining or usage reaches zero
//! ```
//!
//! Scope is every active constraint (full solve) or the modified set and
//! its closure through enabled variables (selective solve).

use std::collections::VecDeque;

use gs_core::{ConstraintId, VariableId, double_equals, double_positive, double_update};
use tracing::trace;

use crate::System;
use crate::constraint::{Constraint, ElemRef, SharingPolicy};
use crate::variable::Variable;

/// A constraint that is not saturated yet.
#[derive(Copy, Clone, Debug)]
struct Light {
    cnst:                 ConstraintId,
    remaining_over_usage: f64,
}

impl System {
    /// Recompute the value of every enabled variable in scope.
    ///
    /// Does nothing when no constraint, variable, or weight changed since
    /// the previous call, so solving twice in a row is idempotent.
    pub fn solve(&mut self) {
        if !self.modified {
            return;
        }
        let scope: Vec<ConstraintId> = if self.selective_update {
            self.modified_constraints.clone()
        } else {
            self.active_constraints.clone()
        };
        self.solve_scope(&scope);
        self.modified = false;
        if self.selective_update {
            self.remove_all_modified_set();
        }
    }

    fn solve_scope(&mut self, scope: &[ConstraintId]) {
        let precision = self.precision;
        let System { constraints, variables, saturated_variables, track_changes, tracked, .. } = self;

        for &c in scope {
            for r in &constraints[c.index()].elements {
                let var = &mut variables[r.var.index()];
                if var.weight > 0.0 {
                    var.value = 0.0;
                }
            }
        }

        // ── Initial usage of every constraint in scope ────────────────────
        let mut light: Vec<Light> = Vec::with_capacity(scope.len());
        let mut saturated: Vec<usize> = Vec::new();
        let mut min_usage = -1.0f64;
        let mut min_bound = -1.0f64;

        for &c in scope {
            let cnst = &mut constraints[c.index()];
            cnst.light = None;
            cnst.active.clear();
            cnst.remaining = cnst.bound;
            cnst.usage = 0.0;
            if !double_positive(cnst.remaining, cnst.bound * precision) {
                continue;
            }
            for k in 0..cnst.elements.len() {
                let r = cnst.elements[k];
                let var = &mut variables[r.var.index()];
                if var.weight <= 0.0 {
                    continue;
                }
                let coef = var.elements[r.slot as usize].consumption_weight;
                if coef <= 0.0 {
                    continue;
                }
                match cnst.policy {
                    SharingPolicy::Shared  => cnst.usage += coef / var.weight,
                    SharingPolicy::Fatpipe => cnst.usage = cnst.usage.max(coef / var.weight),
                }
                cnst.active.push(r);
                if *track_changes && !var.tracked {
                    var.tracked = true;
                    tracked.push(r.var);
                }
            }
            if cnst.usage > 0.0 {
                let rou = cnst.remaining / cnst.usage;
                cnst.light = Some(light.len());
                light.push(Light { cnst: c, remaining_over_usage: rou });
                saturated_constraints_update(rou, light.len() - 1, &mut saturated, &mut min_usage);
            }
        }
        saturated_variable_set_update(&light, &saturated, &constraints[..], &mut variables[..], saturated_variables);

        // ── Saturation loop ───────────────────────────────────────────────
        let mut rounds = 0usize;
        while !light.is_empty() {
            rounds += 1;
            for &v in saturated_variables.iter() {
                let var = &variables[v.index()];
                let pinned = var.bound * var.weight;
                if var.bound > 0.0 && pinned < min_usage {
                    min_bound = if min_bound < 0.0 { pinned } else { min_bound.min(pinned) };
                }
            }

            while let Some(v) = saturated_variables.pop_front() {
                let var = &mut variables[v.index()];
                var.saturated = false;
                if min_bound < 0.0 {
                    var.value = min_usage / var.weight;
                } else if double_equals(min_bound, var.bound * var.weight, precision) {
                    var.value = var.bound;
                } else {
                    // Not the tightest bound: it comes back in a later pass.
                    continue;
                }
                let (value, weight) = (var.value, var.weight);

                for slot in 0..variables[v.index()].elements.len() {
                    let e = variables[v.index()].elements[slot];
                    let r = ElemRef { var: v, slot: slot as u32 };
                    let c = e.constraint;
                    let exhausted = {
                        let cnst = &mut constraints[c.index()];
                        match cnst.policy {
                            SharingPolicy::Shared => {
                                double_update(&mut cnst.remaining, e.consumption_weight * value, cnst.bound * precision);
                                double_update(&mut cnst.usage, e.consumption_weight / weight, precision);
                            }
                            SharingPolicy::Fatpipe => {
                                cnst.usage = fatpipe_residual_usage(cnst, r, &variables[..]);
                            }
                        }
                        cnst.remove_active(r);
                        !double_positive(cnst.usage, precision)
                            || !double_positive(cnst.remaining, cnst.bound * precision)
                    };
                    if exhausted {
                        remove_light(&mut light, &mut constraints[..], c);
                    } else if let Some(i) = constraints[c.index()].light {
                        let cnst = &constraints[c.index()];
                        light[i].remaining_over_usage = cnst.remaining / cnst.usage;
                    }
                }
            }

            // ── Next most-constrained set ─────────────────────────────────
            min_usage = -1.0;
            min_bound = -1.0;
            saturated.clear();
            drop_idle_lights(&mut light, &mut constraints[..]);
            for pos in 0..light.len() {
                saturated_constraints_update(light[pos].remaining_over_usage, pos, &mut saturated, &mut min_usage);
            }
            saturated_variable_set_update(&light, &saturated, &constraints[..], &mut variables[..], saturated_variables);
        }
        trace!(constraints = scope.len(), rounds, "max-min system solved");
    }
}

/// Track the constraint(s) with the smallest `remaining / usage`.
fn saturated_constraints_update(usage: f64, pos: usize, saturated: &mut Vec<usize>, min_usage: &mut f64) {
    if *min_usage < 0.0 || *min_usage > usage {
        *min_usage = usage;
        saturated.clear();
        saturated.push(pos);
    } else if *min_usage == usage {
        saturated.push(pos);
    }
}

/// Queue every variable still active on a saturated constraint.
fn saturated_variable_set_update(
    light:       &[Light],
    saturated:   &[usize],
    constraints: &[Constraint],
    variables:   &mut [Variable],
    queue:       &mut VecDeque<VariableId>,
) {
    for &pos in saturated {
        for r in &constraints[light[pos].cnst.index()].active {
            let var = &mut variables[r.var.index()];
            if var.elements[r.slot as usize].consumption_weight > 0.0 && !var.saturated {
                var.saturated = true;
                queue.push_back(r.var);
            }
        }
    }
}

/// Usage of a fatpipe constraint once `fixed` stops competing: the largest
/// contribution among variables not yet given a value.
fn fatpipe_residual_usage(cnst: &Constraint, fixed: ElemRef, variables: &[Variable]) -> f64 {
    let mut usage = 0.0f64;
    for r in &cnst.elements {
        if *r == fixed {
            continue;
        }
        let var = &variables[r.var.index()];
        if var.weight <= 0.0 || var.value > 0.0 {
            continue;
        }
        let coef = var.elements[r.slot as usize].consumption_weight;
        if coef > 0.0 {
            usage = usage.max(coef / var.weight);
        }
    }
    usage
}

fn remove_light(light: &mut Vec<Light>, constraints: &mut [Constraint], c: ConstraintId) {
    let Some(i) = constraints[c.index()].light.take() else {
        return;
    };
    light.swap_remove(i);
    if let Some(moved) = light.get(i) {
        constraints[moved.cnst.index()].light = Some(i);
    }
}

/// Drop constraints that still look unsaturated only through rounding but
/// have no active element left to saturate.
fn drop_idle_lights(light: &mut Vec<Light>, constraints: &mut [Constraint]) {
    let mut i = 0;
    while i < light.len() {
        let c = light[i].cnst;
        if constraints[c.index()].active.is_empty() {
            trace!(constraint = %c, "dropping idle constraint from saturation");
            remove_light(light, constraints, c);
        } else {
            i += 1;
        }
    }
}
