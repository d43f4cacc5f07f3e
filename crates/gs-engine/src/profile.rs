//! Scheduled resource changes (availability traces, failures, repairs).

use std::collections::BTreeMap;

use gs_core::{ResourceId, SimTime};

#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProfileChange {
    TurnOff,
    TurnOn,
    /// Scale the peak capacity (`1.0` = nominal).
    Availability(f64),
}

/// Pending changes keyed by `(date, insertion order)`.
#[derive(Default)]
pub struct ProfileQueue {
    inner: BTreeMap<(SimTime, u64), (ResourceId, ProfileChange)>,
    seq:   u64,
}

impl ProfileQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, date: SimTime, resource: ResourceId, change: ProfileChange) {
        self.inner.insert((date, self.seq), (resource, change));
        self.seq += 1;
    }

    /// Remove and return the changes due at or before `now`, in schedule
    /// order.
    pub fn drain_due(&mut self, now: SimTime) -> Vec<(ResourceId, ProfileChange)> {
        let mut due = Vec::new();
        while let Some(entry) = self.inner.first_entry() {
            if entry.key().0 > now {
                break;
            }
            due.push(entry.remove());
        }
        due
    }

    pub fn next_date(&self) -> Option<SimTime> {
        self.inner.keys().next().map(|&(date, _)| date)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
