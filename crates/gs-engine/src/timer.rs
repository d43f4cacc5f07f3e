//! `TimerQueue` — actor wake-up deadlines.
//!
//! Timers are the only source of loop events that are not predicted by a
//! resource model.  `BTreeMap<SimTime, Vec<TimerId>>` gives O(log D) insert
//! and pop where D is the number of distinct pending dates; timers sharing a
//! date fire in creation order.
//!
//! Cancelled timers are dropped from the date bucket immediately so that
//! [`TimerQueue::next_date`] never reports a date with nothing behind it.

use std::collections::BTreeMap;

use gs_core::{SimTime, TimerId};

#[derive(Default)]
pub struct TimerQueue {
    inner: BTreeMap<SimTime, Vec<TimerId>>,
    dates: BTreeMap<TimerId, SimTime>,
    next:  u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a new timer at `date`.
    pub fn push(&mut self, date: SimTime) -> TimerId {
        let id = TimerId(self.next);
        self.next += 1;
        self.inner.entry(date).or_default().push(id);
        self.dates.insert(id, date);
        id
    }

    /// Remove a pending timer.  Returns `false` if it already fired or was
    /// never issued.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let Some(date) = self.dates.remove(&id) else {
            return false;
        };
        if let Some(bucket) = self.inner.get_mut(&date) {
            bucket.retain(|&t| t != id);
            if bucket.is_empty() {
                self.inner.remove(&date);
            }
        }
        true
    }

    /// Remove and return every timer due at or before `now`, earliest first.
    pub fn drain_due(&mut self, now: SimTime) -> Vec<TimerId> {
        let mut fired = Vec::new();
        while let Some(entry) = self.inner.first_entry() {
            if *entry.key() > now {
                break;
            }
            for id in entry.remove() {
                self.dates.remove(&id);
                fired.push(id);
            }
        }
        fired
    }

    /// Date of `id` if it is still pending.
    pub fn date(&self, id: TimerId) -> Option<SimTime> {
        self.dates.get(&id).copied()
    }

    /// Earliest pending date.
    pub fn next_date(&self) -> Option<SimTime> {
        self.inner.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
