//! `VetoSet` — activities that tried to start and could not.

use std::collections::BTreeMap;

use gs_core::ActionId;

/// Why a start attempt was refused.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VetoReason {
    /// Some predecessor has not completed.
    Dependencies,
    /// Resources are not fully assigned.
    Unassigned,
}

/// Vetoed activities in creation order, with the reason of the latest veto
/// and the number of refused attempts.
#[derive(Default, Clone, Debug)]
pub struct VetoSet {
    entries: BTreeMap<ActionId, (VetoReason, u32)>,
}

impl VetoSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a refused start.  Returns `true` if `id` was not vetoed yet.
    pub fn veto(&mut self, id: ActionId, reason: VetoReason) -> bool {
        let entry = self.entries.entry(id).or_insert((reason, 0));
        entry.0 = reason;
        entry.1 += 1;
        entry.1 == 1
    }

    /// Clear `id`.  Returns whether it was vetoed.
    pub fn remove(&mut self, id: ActionId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn reason(&self, id: ActionId) -> Option<VetoReason> {
        self.entries.get(&id).map(|&(r, _)| r)
    }

    /// Number of refused start attempts of `id`.
    pub fn attempts(&self, id: ActionId) -> u32 {
        self.entries.get(&id).map_or(0, |&(_, n)| n)
    }

    pub fn iter(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.entries.keys().copied()
    }

    /// Vetoed activities whose latest veto was for `reason`.
    pub fn with_reason(&self, reason: VetoReason) -> impl Iterator<Item = ActionId> + '_ {
        self.entries.iter().filter(move |(_, (r, _))| *r == reason).map(|(&id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
