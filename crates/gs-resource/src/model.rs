//! `Model` — one sharing system and the actions that run in it.
//!
//! # Update algorithms
//!
//! | Mode   | `next_occurring_event`                                  | `update_actions_state`                         |
//! |--------|---------------------------------------------------------|------------------------------------------------|
//! | `Full` | solve, then scan every started action                   | integrate every started action, check ends     |
//! | `Lazy` | selective solve, refresh re-solved / touched actions,   | pop heap entries due at `now`                  |
//! |        | return the heap top                                     |                                                |
//!
//! Both modes integrate with [`Action::integrate`]: the rate in force since
//! the action's `mark` times the elapsed time.  The lazy mode only calls it
//! when the rate is about to change, so one action costs O(log n) per event
//! instead of O(1) per round.

use std::collections::{BTreeMap, BTreeSet};

use gs_core::{ActionId, Failure, MaxDurationOutcome, ModelId, SimTime, UpdateAlgorithm};
use gs_lmm::System;
use tracing::{debug, trace};

use crate::action::{Action, ActionEvent, ActionKind, ActionState};
use crate::heap::{ActionHeap, HeapKind};
use crate::{ResourceError, ResourceResult};

/// A resource model: CPUs, links, disks, or CPUs and links together.
pub struct Model {
    pub(crate) id:     ModelId,
    pub(crate) name:   &'static str,
    pub(crate) system: System,
    pub(crate) update: UpdateAlgorithm,

    pub(crate) actions: BTreeMap<ActionId, Action>,
    /// Ready, Running or Suspended actions, in creation order.
    pub(crate) started: BTreeSet<ActionId>,
    /// Actions whose heap entry must be recomputed at the next event query.
    pub(crate) dirty:   BTreeSet<ActionId>,
    pub(crate) heap:    ActionHeap,

    /// Tolerance on remaining work (`maxmin_precision × timing_precision`).
    remains_precision:    f64,
    timing_precision:     f64,
    max_duration_outcome: MaxDurationOutcome,
}

impl Model {
    pub(crate) fn new(
        id:                   ModelId,
        name:                 &'static str,
        system:               System,
        update:               UpdateAlgorithm,
        maxmin_precision:     f64,
        timing_precision:     f64,
        max_duration_outcome: MaxDurationOutcome,
    ) -> Self {
        let mut system = system;
        system.track_changes(update == UpdateAlgorithm::Lazy);
        Self {
            id,
            name,
            system,
            update,
            actions: BTreeMap::new(),
            started: BTreeSet::new(),
            dirty: BTreeSet::new(),
            heap: ActionHeap::new(),
            remains_precision: maxmin_precision * timing_precision,
            timing_precision,
            max_duration_outcome,
        }
    }

    #[inline]
    pub fn id(&self) -> ModelId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(&id)
    }

    /// Number of started, non-terminal actions.
    pub fn started_count(&self) -> usize {
        self.started.len()
    }

    /// Started, non-terminal actions in creation order.
    pub fn started(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.started.iter().copied()
    }

    /// Current solved rate of `id`.
    pub fn rate(&self, id: ActionId) -> f64 {
        self.actions
            .get(&id)
            .and_then(|a| a.variable)
            .map_or(0.0, |v| self.system.value(v))
    }

    #[inline]
    pub(crate) fn remains_precision(&self) -> f64 {
        self.remains_precision
    }

    pub(crate) fn action_mut(&mut self, id: ActionId) -> ResourceResult<&mut Action> {
        self.actions.get_mut(&id).ok_or(ResourceError::UnknownAction(id))
    }

    // ── Event prediction ──────────────────────────────────────────────────

    /// Solve and return the earliest date at which some action of this
    /// model changes state.
    pub fn next_occurring_event(&mut self, now: SimTime) -> ResourceResult<Option<SimTime>> {
        self.system.solve();
        match self.update {
            UpdateAlgorithm::Full => Ok(self.next_occurring_event_full(now)),
            UpdateAlgorithm::Lazy => self.next_occurring_event_lazy(now),
        }
    }

    fn next_occurring_event_full(&mut self, now: SimTime) -> Option<SimTime> {
        let mut min: Option<SimTime> = None;
        for id in &self.started {
            let Some(action) = self.actions.get_mut(id) else { continue };
            action.integrate(now, self.remains_precision);
            action.last_value = action.variable.map_or(0.0, |v| self.system.value(v));
            if let Some((date, _)) = predicted_event(action, now) {
                min = Some(min.map_or(date, |m: SimTime| m.min(date)));
            }
        }
        min
    }

    fn next_occurring_event_lazy(&mut self, now: SimTime) -> ResourceResult<Option<SimTime>> {
        let mut touched = std::mem::take(&mut self.dirty);
        for var in self.system.take_tracked() {
            if let Ok(v) = self.system.variable(var) {
                touched.insert(v.owner());
            }
        }
        for id in touched {
            self.refresh(id, now)?;
        }
        Ok(self.heap.top_date())
    }

    /// Integrate `id` up to `now`, adopt its freshly solved rate, and
    /// reschedule its heap entry.
    fn refresh(&mut self, id: ActionId, now: SimTime) -> ResourceResult<()> {
        let Some(action) = self.actions.get_mut(&id) else {
            return Ok(());
        };
        if !action.state.is_active() {
            self.heap.remove(id);
            return Ok(());
        }
        action.integrate(now, self.remains_precision);
        action.last_value = action.variable.map_or(0.0, |v| self.system.value(v));
        match predicted_event(action, now) {
            Some((date, kind)) => {
                trace!(model = self.name, action = %id, %date, ?kind, "heap entry refreshed");
                self.heap.insert(id, date, kind);
            }
            None => self.heap.remove(id),
        }
        Ok(())
    }

    // ── State update ──────────────────────────────────────────────────────

    /// Advance every action of this model to `now` and record the ones that
    /// reached a terminal state.
    pub fn update_actions_state(&mut self, now: SimTime, events: &mut Vec<ActionEvent>) -> ResourceResult<()> {
        match self.update {
            UpdateAlgorithm::Full => self.update_actions_state_full(now, events),
            UpdateAlgorithm::Lazy => self.update_actions_state_lazy(now, events),
        }
    }

    fn update_actions_state_full(&mut self, now: SimTime, events: &mut Vec<ActionEvent>) -> ResourceResult<()> {
        let (precision, timing) = (self.remains_precision, self.timing_precision);
        let ids: Vec<ActionId> = self.started.iter().copied().collect();
        for id in ids {
            self.action_mut(id)?.integrate(now, precision);
            let action = &self.actions[&id];
            match action.state {
                ActionState::Ready if action.latency <= timing => self.end_latency(id, now, events)?,
                ActionState::Running if is_complete(action, timing) => {
                    self.complete(id, now, events)?;
                    continue;
                }
                _ => {}
            }
            let action = &self.actions[&id];
            if action.state.is_active()
                && action.state != ActionState::Suspended
                && action.max_duration_left().is_some_and(|left| left <= timing)
            {
                self.expire(id, now, events)?;
            }
        }
        Ok(())
    }

    fn update_actions_state_lazy(&mut self, now: SimTime, events: &mut Vec<ActionEvent>) -> ResourceResult<()> {
        let precision = self.remains_precision;
        while let Some((id, kind)) = self.heap.pop_due(now) {
            self.action_mut(id)?.integrate(now, precision);
            trace!(model = self.name, action = %id, ?kind, %now, "heap entry due");
            match kind {
                HeapKind::Latency     => self.end_latency(id, now, events)?,
                HeapKind::MaxDuration => self.expire(id, now, events)?,
                HeapKind::Normal      => self.complete(id, now, events)?,
            }
        }
        Ok(())
    }

    /// The latency phase is over: enable the variable, or complete at once
    /// when there is nothing left to transfer.
    fn end_latency(&mut self, id: ActionId, now: SimTime, events: &mut Vec<ActionEvent>) -> ResourceResult<()> {
        let action = self.action_mut(id)?;
        action.latency = 0.0;
        if action.variable.is_none() || action.remaining <= 0.0 {
            return self.complete(id, now, events);
        }
        action.state = ActionState::Running;
        let weight = running_weight(action);
        if let Some(var) = action.variable {
            self.system.update_variable_weight(var, weight)?;
        }
        self.dirty.insert(id);
        trace!(model = self.name, action = %id, %now, "latency paid");
        Ok(())
    }

    /// `max_duration` elapsed.
    fn expire(&mut self, id: ActionId, now: SimTime, events: &mut Vec<ActionEvent>) -> ResourceResult<()> {
        let action = &self.actions[&id];
        let sleeping = action.kind() == ActionKind::Sleep;
        let max_duration = action.max_duration.unwrap_or(0.0);
        if sleeping || self.max_duration_outcome == MaxDurationOutcome::Done {
            self.terminate(id, now, ActionState::Done, None, events)
        } else {
            self.terminate(id, now, ActionState::Failed, Some(Failure::MaxDuration { max_duration }), events)
        }
    }

    fn complete(&mut self, id: ActionId, now: SimTime, events: &mut Vec<ActionEvent>) -> ResourceResult<()> {
        self.action_mut(id)?.remaining = 0.0;
        self.terminate(id, now, ActionState::Done, None, events)
    }

    /// Move `id` to a terminal state, release its variable, and report it.
    pub(crate) fn terminate(
        &mut self,
        id:      ActionId,
        now:     SimTime,
        state:   ActionState,
        failure: Option<Failure>,
        events:  &mut Vec<ActionEvent>,
    ) -> ResourceResult<()> {
        let precision = self.remains_precision;
        let action = self.action_mut(id)?;
        action.integrate(now, precision);
        action.state = state;
        action.finish = Some(now);
        action.failure = failure.clone();
        action.last_value = 0.0;
        let var = action.variable.take();
        if let Some(var) = var {
            self.system.variable_free(var)?;
        }
        self.heap.remove(id);
        self.started.remove(&id);
        self.dirty.remove(&id);
        debug!(model = self.name, action = %id, ?state, %now, "action terminated");
        events.push(ActionEvent { action: id, date: now, failure });
        Ok(())
    }

    /// Drop a terminal or never-started action.
    pub(crate) fn remove(&mut self, id: ActionId) -> ResourceResult<Action> {
        let action = self.actions.get(&id).ok_or(ResourceError::UnknownAction(id))?;
        if action.state.is_active() {
            return Err(ResourceError::InvalidState { action: id, state: action.state, op: "remove" });
        }
        self.heap.remove(id);
        self.actions.remove(&id).ok_or(ResourceError::UnknownAction(id))
    }
}

/// Solver weight of a running action.  Sleeps never compete.
pub(crate) fn running_weight(action: &Action) -> f64 {
    if action.kind() == ActionKind::Sleep { 0.0 } else { action.sharing_penalty }
}

fn is_complete(action: &Action, timing: f64) -> bool {
    if action.kind() == ActionKind::Sleep || action.variable.is_none() {
        return false;
    }
    action.remaining <= 0.0 || (action.last_value > 0.0 && action.remaining <= action.last_value * timing)
}

/// Next state change of `action` given the rate it holds since `now`.
///
/// Completion wins over a max-duration expiry at the same date.
fn predicted_event(action: &Action, now: SimTime) -> Option<(SimTime, HeapKind)> {
    let mut next = match action.state {
        ActionState::Ready => Some((now + action.latency, HeapKind::Latency)),
        ActionState::Running if action.kind() != ActionKind::Sleep && action.last_value > 0.0 => {
            Some((now + action.remaining / action.last_value, HeapKind::Normal))
        }
        ActionState::Running => None,
        _ => return None,
    };
    if let Some(left) = action.max_duration_left() {
        let date = now + left;
        if next.is_none_or(|(d, _)| date < d) {
            next = Some((date, HeapKind::MaxDuration));
        }
    }
    next
}
