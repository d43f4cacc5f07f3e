//! `ActionHeap` — predicted event dates for the lazy update.
//!
//! Each action has at most one live entry: the earliest of its latency end,
//! its completion, and its max-duration expiry.  Re-inserting an action
//! supersedes its previous entry; superseded entries stay in the binary heap
//! and are skipped when they surface (the same stale-entry idiom as the
//! shortest-path router).

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use gs_core::{ActionId, SimTime};

/// Why an action has a heap entry.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeapKind {
    /// End of the latency phase.
    Latency,
    /// `max_duration` elapses.
    MaxDuration,
    /// Predicted completion.
    Normal,
}

/// Min-heap of `(date, action)` with O(log n) insert, update and pop.
///
/// Ties on the date are broken by action id, so simultaneous events come out
/// in creation order.
#[derive(Default)]
pub struct ActionHeap {
    heap: BinaryHeap<Reverse<(SimTime, ActionId, u64)>>,
    /// Live entry of each action: (date, kind, version).
    live: BTreeMap<ActionId, (SimTime, HeapKind, u64)>,
    next_version: u64,
}

impl ActionHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` at `date`, replacing any previous entry.
    pub fn insert(&mut self, action: ActionId, date: SimTime, kind: HeapKind) {
        let version = self.next_version;
        self.next_version += 1;
        self.live.insert(action, (date, kind, version));
        self.heap.push(Reverse((date, action, version)));
    }

    pub fn remove(&mut self, action: ActionId) {
        self.live.remove(&action);
    }

    pub fn contains(&self, action: ActionId) -> bool {
        self.live.contains_key(&action)
    }

    /// Date and kind of the live entry of `action`.
    pub fn entry(&self, action: ActionId) -> Option<(SimTime, HeapKind)> {
        self.live.get(&action).map(|&(date, kind, _)| (date, kind))
    }

    /// Earliest live date.
    pub fn top_date(&mut self) -> Option<SimTime> {
        self.discard_stale();
        self.heap.peek().map(|Reverse((date, ..))| *date)
    }

    /// Pop the earliest live entry if it is due at or before `now`.
    pub fn pop_due(&mut self, now: SimTime) -> Option<(ActionId, HeapKind)> {
        self.discard_stale();
        let &Reverse((date, action, _)) = self.heap.peek()?;
        if date > now {
            return None;
        }
        self.heap.pop();
        let (_, kind, _) = self.live.remove(&action)?;
        Some((action, kind))
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    // Skip stale heap entries.
    fn discard_stale(&mut self) {
        while let Some(&Reverse((_, action, version))) = self.heap.peek() {
            match self.live.get(&action) {
                Some(&(_, _, v)) if v == version => return,
                _ => {
                    self.heap.pop();
                }
            }
        }
    }
}
