//! `ResourceTable` — run-time state of every platform resource.
//!
//! Indexed by `ResourceId`.  The platform's resources come first, in
//! platform order; the engine-created loopback link is appended last.

use gs_core::{ConstraintId, ModelId, ResourceId};
use gs_platform::ResourceSpec;

/// What the loop may change about a resource after the platform is sealed.
#[derive(Copy, Clone, Debug)]
pub struct ResourceState {
    pub spec:       ResourceSpec,
    pub model:      ModelId,
    pub constraint: ConstraintId,
    /// Availability scale applied to the peak capacity.
    pub scale:      f64,
    pub on:         bool,
}

impl ResourceState {
    /// Constraint bound implied by the current state.
    #[inline]
    pub fn capacity(&self) -> f64 {
        if self.on { self.spec.peak() * self.scale } else { 0.0 }
    }

    /// Rate cap of a single action on this resource: one core for CPUs,
    /// the full bandwidth for links.  Disks depend on the operation.
    #[inline]
    pub fn per_action_bound(&self) -> f64 {
        match self.spec {
            ResourceSpec::Cpu { speed, .. } => speed * self.scale,
            _ => self.spec.peak() * self.scale,
        }
    }
}

#[derive(Default)]
pub struct ResourceTable {
    states:   Vec<ResourceState>,
    loopback: ResourceId,
}

impl ResourceTable {
    pub(crate) fn new(states: Vec<ResourceState>, loopback: ResourceId) -> Self {
        Self { states, loopback }
    }

    pub fn get(&self, id: ResourceId) -> Option<&ResourceState> {
        self.states.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: ResourceId) -> Option<&mut ResourceState> {
        self.states.get_mut(id.index())
    }

    /// The implicit fatpipe link used by same-host communications.
    #[inline]
    pub fn loopback(&self) -> ResourceId {
        self.loopback
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Every resource currently turned off.
    pub fn off(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.on)
            .map(|(i, _)| ResourceId(i as u32))
    }
}
