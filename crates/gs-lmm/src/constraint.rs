//! Constraints: bounded shared capacities.

use gs_core::{ConstraintId, ResourceId, VariableId};

/// How contributions to a constraint combine.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SharingPolicy {
    /// Usage is the sum of contributions (a shared link, a CPU).
    #[default]
    Shared,
    /// Usage is the largest single contribution (fatpipe, duplex halves).
    Fatpipe,
}

/// Reference from a constraint to one element of a variable.
///
/// A variable may hold several elements on the same constraint (a route that
/// crosses a link twice), so the slot inside the variable is kept too.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct ElemRef {
    pub var:  VariableId,
    pub slot: u32,
}

/// A bounded capacity owned by exactly one resource.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub(crate) id:     ConstraintId,
    pub(crate) owner:  ResourceId,
    pub(crate) live:   bool,
    pub(crate) bound:  f64,
    pub(crate) policy: SharingPolicy,

    // ── Concurrency accounting ────────────────────────────────────────────
    pub(crate) concurrency_limit:   i32,
    pub(crate) concurrency_current: i32,
    pub(crate) concurrency_maximum: i32,

    // ── Solve scratch ─────────────────────────────────────────────────────
    pub(crate) usage:     f64,
    pub(crate) remaining: f64,
    /// Position in the solve's light table while the constraint is not yet
    /// saturated.
    pub(crate) light:     Option<usize>,

    /// Every element on this constraint, in registration order.  Enabled vs
    /// disabled is read from the variable's weight.
    pub(crate) elements: Vec<ElemRef>,
    /// Elements still competing in the current solve.
    pub(crate) active:   Vec<ElemRef>,

    pub(crate) in_active_set: bool,
    pub(crate) in_modified:   bool,
}

impl Constraint {
    pub(crate) fn new(id: ConstraintId, owner: ResourceId, bound: f64, limit: i32) -> Self {
        Self {
            id,
            owner,
            live:                true,
            bound,
            policy:              SharingPolicy::Shared,
            concurrency_limit:   limit,
            concurrency_current: 0,
            concurrency_maximum: 0,
            usage:               0.0,
            remaining:           0.0,
            light:               None,
            elements:            Vec::new(),
            active:              Vec::new(),
            in_active_set:       false,
            in_modified:         false,
        }
    }

    #[inline]
    pub fn id(&self) -> ConstraintId {
        self.id
    }

    /// The resource this capacity belongs to.
    #[inline]
    pub fn owner(&self) -> ResourceId {
        self.owner
    }

    #[inline]
    pub fn bound(&self) -> f64 {
        self.bound
    }

    #[inline]
    pub fn sharing_policy(&self) -> SharingPolicy {
        self.policy
    }

    /// `-1` means unlimited.
    #[inline]
    pub fn concurrency_limit(&self) -> i32 {
        self.concurrency_limit
    }

    #[inline]
    pub fn concurrency_current(&self) -> i32 {
        self.concurrency_current
    }

    /// Highest concurrency observed since creation or the last reset.
    #[inline]
    pub fn concurrency_maximum(&self) -> i32 {
        self.concurrency_maximum
    }

    pub fn reset_concurrency_maximum(&mut self) {
        self.concurrency_maximum = self.concurrency_current;
    }

    /// Number of elements (enabled or not) registered on this constraint.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Free concurrency slots; `i32::MAX` when unlimited.
    #[inline]
    pub fn concurrency_slack(&self) -> i32 {
        if self.concurrency_limit < 0 {
            i32::MAX
        } else {
            self.concurrency_limit - self.concurrency_current
        }
    }

    pub(crate) fn increase_concurrency(&mut self, amount: i32) {
        self.concurrency_current += amount;
        if self.concurrency_current > self.concurrency_maximum {
            self.concurrency_maximum = self.concurrency_current;
        }
        debug_assert!(
            self.concurrency_limit < 0 || self.concurrency_current <= self.concurrency_limit,
            "concurrency of {} exceeds its limit",
            self.id
        );
    }

    pub(crate) fn decrease_concurrency(&mut self, amount: i32) {
        self.concurrency_current -= amount;
        debug_assert!(self.concurrency_current >= 0);
    }

    pub(crate) fn remove_active(&mut self, r: ElemRef) {
        if let Some(pos) = self.active.iter().position(|&a| a == r) {
            self.active.swap_remove(pos);
        }
    }
}
