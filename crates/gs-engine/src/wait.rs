//! Waits: one-shot futures on the end of an action.
//!
//! An actor that issues an action blocks on a [`WaitId`] and is woken
//! exactly once, when the wait resolves.  A wait with a deadline resolves
//! to `Failed(Timeout)` if the deadline comes first; the action itself keeps
//! running.
//!
//! A resolved wait keeps its outcome until the caller drops it with
//! [`WaitTable::remove`] or [`WaitTable::forget_resolved`]; the table
//! never forgets on its own.

use std::collections::{BTreeMap, BTreeSet};

use gs_core::{ActionId, Failure, SimTime, WaitId};

/// How a wait resolved.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WaitOutcome {
    Done,
    Failed(Failure),
}

impl WaitOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, WaitOutcome::Done)
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            WaitOutcome::Done => None,
            WaitOutcome::Failed(f) => Some(f),
        }
    }
}

impl From<Option<Failure>> for WaitOutcome {
    fn from(failure: Option<Failure>) -> Self {
        failure.map_or(WaitOutcome::Done, WaitOutcome::Failed)
    }
}

#[derive(Clone, Debug)]
struct Wait {
    action:   ActionId,
    created:  SimTime,
    deadline: Option<SimTime>,
    outcome:  Option<WaitOutcome>,
}

/// Every wait issued by one engine.
#[derive(Default)]
pub struct WaitTable {
    waits:     BTreeMap<WaitId, Wait>,
    pending:   BTreeMap<ActionId, Vec<WaitId>>,
    deadlines: BTreeSet<(SimTime, WaitId)>,
    next:      u64,
}

impl WaitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting on `action`, optionally until `deadline`.
    pub fn add(&mut self, action: ActionId, now: SimTime, deadline: Option<SimTime>) -> WaitId {
        let id = WaitId(self.next);
        self.next += 1;
        self.waits.insert(id, Wait { action, created: now, deadline, outcome: None });
        self.pending.entry(action).or_default().push(id);
        if let Some(date) = deadline {
            self.deadlines.insert((date, id));
        }
        id
    }

    /// Resolve a fresh wait at once, for an action that already ended.
    pub fn add_resolved(&mut self, action: ActionId, now: SimTime, outcome: WaitOutcome) -> WaitId {
        let id = WaitId(self.next);
        self.next += 1;
        self.waits.insert(id, Wait { action, created: now, deadline: None, outcome: Some(outcome) });
        id
    }

    /// Resolve every pending wait on `action`.  Returns them in issue order.
    pub fn resolve_action(&mut self, action: ActionId, outcome: &WaitOutcome) -> Vec<WaitId> {
        let ids = self.pending.remove(&action).unwrap_or_default();
        for id in &ids {
            if let Some(wait) = self.waits.get_mut(id) {
                if let Some(date) = wait.deadline {
                    self.deadlines.remove(&(date, *id));
                }
                wait.outcome = Some(outcome.clone());
            }
        }
        ids
    }

    /// Time out every pending wait whose deadline is at or before `now`.
    pub fn expire_due(&mut self, now: SimTime) -> Vec<(WaitId, WaitOutcome)> {
        let mut expired = Vec::new();
        while let Some(&(date, id)) = self.deadlines.first() {
            if date > now {
                break;
            }
            self.deadlines.pop_first();
            let Some(wait) = self.waits.get_mut(&id) else { continue };
            let outcome = WaitOutcome::Failed(Failure::Timeout { after: date.since(wait.created) });
            wait.outcome = Some(outcome.clone());
            if let Some(ids) = self.pending.get_mut(&wait.action) {
                ids.retain(|&w| w != id);
                if ids.is_empty() {
                    self.pending.remove(&wait.action);
                }
            }
            expired.push((id, outcome));
        }
        expired
    }

    /// `None` while the wait is pending.
    pub fn outcome(&self, id: WaitId) -> Option<&WaitOutcome> {
        self.waits.get(&id).and_then(|w| w.outcome.as_ref())
    }

    pub fn action(&self, id: WaitId) -> Option<ActionId> {
        self.waits.get(&id).map(|w| w.action)
    }

    pub fn contains(&self, id: WaitId) -> bool {
        self.waits.contains_key(&id)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<SimTime> {
        self.deadlines.first().map(|&(date, _)| date)
    }

    /// Number of waits not yet resolved.
    pub fn pending_count(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Number of waits held, resolved or not.
    pub fn len(&self) -> usize {
        self.waits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waits.is_empty()
    }

    /// Drop every resolved wait.  Returns how many went.
    pub fn forget_resolved(&mut self) -> usize {
        let before = self.waits.len();
        self.waits.retain(|_, w| w.outcome.is_none());
        before - self.waits.len()
    }

    /// Forget a wait, resolved or not.
    pub fn remove(&mut self, id: WaitId) -> Option<WaitOutcome> {
        let wait = self.waits.remove(&id)?;
        if let Some(date) = wait.deadline {
            self.deadlines.remove(&(date, id));
        }
        if let Some(ids) = self.pending.get_mut(&wait.action) {
            ids.retain(|&w| w != id);
            if ids.is_empty() {
                self.pending.remove(&wait.action);
            }
        }
        wait.outcome
    }
}
