//! Variables: demands competing for one or more constraints.

use gs_core::{ActionId, ConstraintId, VariableId};

/// One (constraint, coefficient) participation of a variable.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Element {
    pub constraint:         ConstraintId,
    /// How much of the constraint one unit of the variable's value consumes.
    pub consumption_weight: f64,
}

impl Element {
    /// Slots this element takes on its constraint.  Elements lighter than
    /// one unit (cross-traffic) do not count.
    #[inline]
    pub fn concurrency(&self) -> i32 {
        if self.consumption_weight >= 1.0 { 1 } else { 0 }
    }
}

/// A demand owned by exactly one action.
///
/// `weight` is a sharing penalty: on a saturated constraint, values are
/// proportional to `1 / weight`.  A weight of zero disables the variable
/// without dropping its elements.
#[derive(Clone, Debug)]
pub struct Variable {
    pub(crate) id:    VariableId,
    pub(crate) owner: ActionId,
    pub(crate) live:  bool,

    pub(crate) weight:            f64,
    /// Weight waiting for a concurrency slot.  Non-zero only while disabled.
    pub(crate) staged_weight:     f64,
    /// Upper bound on `value`; negative means unbounded.
    pub(crate) bound:             f64,
    pub(crate) value:             f64,
    pub(crate) concurrency_share: i32,

    pub(crate) elements: Vec<Element>,

    // ── Solve bookkeeping ─────────────────────────────────────────────────
    pub(crate) visited:   u64,
    pub(crate) saturated: bool,
    pub(crate) tracked:   bool,
}

impl Variable {
    pub(crate) fn new(id: VariableId, owner: ActionId, weight: f64, bound: f64) -> Self {
        Self {
            id,
            owner,
            live:              true,
            weight,
            staged_weight:     0.0,
            bound:             if bound < 0.0 { -1.0 } else { bound },
            value:             0.0,
            concurrency_share: 1,
            elements:          Vec::new(),
            visited:           0,
            saturated:         false,
            tracked:           false,
        }
    }

    #[inline]
    pub fn id(&self) -> VariableId {
        self.id
    }

    #[inline]
    pub fn owner(&self) -> ActionId {
        self.owner
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[inline]
    pub fn staged_weight(&self) -> f64 {
        self.staged_weight
    }

    /// `None` when unbounded.
    #[inline]
    pub fn bound(&self) -> Option<f64> {
        (self.bound > 0.0).then_some(self.bound)
    }

    /// Solved rate.  Always zero while disabled.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[inline]
    pub fn concurrency_share(&self) -> i32 {
        self.concurrency_share
    }

    #[inline]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.weight > 0.0
    }

    /// Disabled only because a constraint had no free concurrency slot.
    #[inline]
    pub fn is_staged(&self) -> bool {
        self.weight <= 0.0 && self.staged_weight > 0.0
    }
}
