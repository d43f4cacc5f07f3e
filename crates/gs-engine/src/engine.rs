//! The `Engine` struct and its round loop.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use gs_activity::{DependencyGraph, VetoReason, VetoSet};
use gs_core::{
    ActionId, EngineConfig, Failure, NetPointId, ResourceId, SimClock, SimTime, TimerId, WaitId,
};
use gs_platform::{Platform, Router, ShortestPathRouter};
use gs_resource::{ActionEvent, ActionReport, ActionState, IoOp, ModelSet, ResourceError, Target};
use tracing::{debug, trace, warn};

use crate::profile::{ProfileChange, ProfileQueue};
use crate::timer::TimerQueue;
use crate::wait::{WaitOutcome, WaitTable};
use crate::{EngineError, EngineObserver, EngineResult};

// ── Round and run results ─────────────────────────────────────────────────────

/// What one call to [`Engine::step`] did.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoundReport {
    /// Date the clock was advanced to.
    pub date:     SimTime,
    pub round:    u64,
    /// Actions that reached a terminal state, in delivery order.
    pub finished: Vec<ActionId>,
    pub timers:   Vec<TimerId>,
    pub waits:    Vec<WaitId>,
}

/// Why [`Engine::run`] returned.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunOutcome {
    /// Nothing is left to do.
    Completed,
    /// The requested date was reached.
    DeadlineReached,
    /// `stop_on_veto` is set and these dependency-solved activities wait for
    /// a resource assignment.
    NeedsAssignment(Vec<ActionId>),
    /// Nothing can happen anymore but these actions never ended: vetoed
    /// activities, successors of failed activities, actions whose start
    /// failed, suspended actions.
    Stalled(Vec<ActionId>),
}

/// Result of a start request.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StartOutcome {
    Started,
    Vetoed(VetoReason),
}

/// Something observers must hear about, recorded when it happens and
/// delivered at the next flush.
enum Notice {
    Started(ActionReport),
    Finished(ActionReport),
    Vetoed(ActionReport, VetoReason),
    DependencyError { action: ActionId, predecessor: ActionId },
    WaitResolved(WaitId, WaitOutcome),
    Timer(TimerId),
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// The orchestrating loop.
///
/// `Engine<R>` owns every piece of simulation state and drives rounds:
///
/// 1. **Solve**: every resource model solves its system and predicts its
///    next event date.
/// 2. **Advance**: the clock jumps to the earliest of those dates, the next
///    timer, the next wait deadline, the next resource profile change and
///    the caller's limit.
/// 3. **Update**: models integrate progress up to the new date and report
///    terminal transitions in action creation order.
/// 4. **Cascade**: completions consume dependency edges and start the
///    successors that became eligible, until nothing else changes at this
///    date (zero-amount chains finish within the round).
/// 5. **Profiles, timers, deadlines**: scheduled resource changes are
///    applied, timers fire, and waits whose deadline passed time out.  A
///    completion at the deadline date wins over the timeout.
///
/// Create via [`EngineBuilder`][crate::EngineBuilder].
pub struct Engine<R: Router = ShortestPathRouter> {
    config: EngineConfig,
    clock:  SimClock,
    models: ModelSet<R>,

    graph:  DependencyGraph,
    vetoed: VetoSet,
    /// Successors that can never start on their own → the predecessors that
    /// ended without completing.
    blocked: BTreeMap<ActionId, BTreeSet<ActionId>>,
    /// `Init` actions with a start request that has not gone through yet.
    requested: BTreeSet<ActionId>,

    timers:   TimerQueue,
    waits:    WaitTable,
    profiles: ProfileQueue,

    /// Terminal transitions whose consequences are not applied yet.
    events:  VecDeque<ActionEvent>,
    notices: Vec<(SimTime, Notice)>,
    next_action: u64,
}

impl<R: Router> Engine<R> {
    pub(crate) fn new(config: EngineConfig, models: ModelSet<R>) -> Self {
        Self {
            config,
            clock: SimClock::new(),
            models,
            graph: DependencyGraph::new(),
            vetoed: VetoSet::new(),
            blocked: BTreeMap::new(),
            requested: BTreeSet::new(),
            timers: TimerQueue::new(),
            waits: WaitTable::new(),
            profiles: ProfileQueue::new(),
            events: VecDeque::new(),
            notices: Vec::new(),
            next_action: 0,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Rounds run so far.
    #[inline]
    pub fn rounds(&self) -> u64 {
        self.clock.rounds()
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn platform(&self) -> &Platform {
        self.models.platform()
    }

    /// Read-only view of the resource models.
    #[inline]
    pub fn models(&self) -> &ModelSet<R> {
        &self.models
    }

    #[inline]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    #[inline]
    pub fn vetoed(&self) -> &VetoSet {
        &self.vetoed
    }

    pub fn state(&self, id: ActionId) -> Option<ActionState> {
        self.models.state(id)
    }

    /// Snapshot of `id` at the current date.
    pub fn report(&self, id: ActionId) -> Option<ActionReport> {
        self.models.report(id, self.now())
    }

    /// `id` is waiting for these failed or cancelled predecessors.
    pub fn blocked_by(&self, id: ActionId) -> impl Iterator<Item = ActionId> + '_ {
        self.blocked.get(&id).into_iter().flatten().copied()
    }

    // ── Creating actions ──────────────────────────────────────────────────

    /// Create an action in `Init` state.  It competes for nothing until
    /// [`start`](Self::start).
    pub fn create(&mut self, target: Target, amount: f64) -> EngineResult<ActionId> {
        let id = ActionId(self.next_action);
        self.models.create(id, target, amount, self.now())?;
        self.graph.insert(id)?;
        self.next_action += 1;
        Ok(id)
    }

    /// `flops` of computation on one core of `host`.
    pub fn execute(&mut self, host: NetPointId, flops: f64) -> EngineResult<ActionId> {
        self.create(Target::exec(host), flops)
    }

    pub fn sleep(&mut self, host: NetPointId, duration: f64) -> EngineResult<ActionId> {
        self.create(Target::sleep(host), duration)
    }

    /// Transfer `bytes` from `src` to `dst`.
    pub fn communicate(&mut self, src: NetPointId, dst: NetPointId, bytes: f64) -> EngineResult<ActionId> {
        self.create(Target::comm(src, dst), bytes)
    }

    pub fn read(&mut self, disk: ResourceId, bytes: f64) -> EngineResult<ActionId> {
        self.create(Target::io(disk, IoOp::Read), bytes)
    }

    pub fn write(&mut self, disk: ResourceId, bytes: f64) -> EngineResult<ActionId> {
        self.create(Target::io(disk, IoOp::Write), bytes)
    }

    /// One action spanning several hosts: `flops[i]` on `hosts[i]` and
    /// `bytes[i * n + j]` from `hosts[i]` to `hosts[j]` (empty for none).
    pub fn execute_parallel(
        &mut self,
        hosts: Vec<NetPointId>,
        flops: Vec<f64>,
        bytes: Vec<f64>,
        rate:  Option<f64>,
    ) -> EngineResult<ActionId> {
        self.create(Target::Parallel { hosts, flops, bytes, rate }, 1.0)
    }

    // ── Starting and dependencies ─────────────────────────────────────────

    /// Start `id` now, or veto it if a predecessor has not completed or its
    /// resources are not assigned.  A vetoed activity starts by itself once
    /// both conditions hold.
    pub fn start(&mut self, id: ActionId) -> EngineResult<StartOutcome> {
        let outcome = self.try_start(id)?;
        self.settle()?;
        Ok(outcome)
    }

    /// Fill in the resource assignment of an `Init` action.  If a start was
    /// already requested and the dependencies are solved, it starts right
    /// away.
    pub fn assign(&mut self, id: ActionId, target: Target) -> EngineResult<()> {
        self.models.assign(id, target)?;
        if self.requested.contains(&id) && self.graph.dependencies_solved(id)? {
            self.try_start(id)?;
        }
        self.settle()
    }

    /// Make `to` wait for `from`.
    pub fn add_successor(&mut self, from: ActionId, to: ActionId) -> EngineResult<()> {
        match self.models.state(from) {
            Some(state) if state.is_terminal() => {
                return Err(EngineError::InvalidArgument(format!(
                    "{from} already ended ({state:?}); {to} would wait for it forever"
                )));
            }
            _ => {}
        }
        self.graph.add_successor(from, to)?;
        Ok(())
    }

    pub fn remove_successor(&mut self, from: ActionId, to: ActionId) -> EngineResult<()> {
        self.graph.remove_successor(from, to)?;
        self.unblock(from, to)?;
        self.settle()
    }

    /// Drop every outgoing edge of `from`.  Returns the former successors.
    pub fn remove_all_successors(&mut self, from: ActionId) -> EngineResult<Vec<ActionId>> {
        let successors = self.graph.remove_all_successors(from)?;
        for &to in &successors {
            self.unblock(from, to)?;
        }
        self.settle()?;
        Ok(successors)
    }

    // ── Action control ────────────────────────────────────────────────────

    /// Cancel a started action.  Returns `false` and changes nothing for an
    /// action still in `Init` or already ended.
    pub fn cancel(&mut self, id: ActionId) -> EngineResult<bool> {
        let mut events = Vec::new();
        let cancelled = self.models.cancel(id, self.now(), &mut events)?;
        self.events.extend(events);
        self.settle()?;
        Ok(cancelled)
    }

    pub fn suspend(&mut self, id: ActionId) -> EngineResult<()> {
        Ok(self.models.suspend(id, self.now())?)
    }

    pub fn resume(&mut self, id: ActionId) -> EngineResult<()> {
        Ok(self.models.resume(id, self.now())?)
    }

    pub fn set_priority(&mut self, id: ActionId, priority: f64) -> EngineResult<()> {
        Ok(self.models.set_priority(id, priority)?)
    }

    pub fn set_bound(&mut self, id: ActionId, bound: Option<f64>) -> EngineResult<()> {
        Ok(self.models.set_bound(id, bound)?)
    }

    pub fn set_max_duration(&mut self, id: ActionId, max_duration: Option<f64>) -> EngineResult<()> {
        Ok(self.models.set_max_duration(id, max_duration, self.now())?)
    }

    /// Forget `id`.  It is detached from its neighbours first, then cancelled
    /// if it is running; pending waits on it resolve to `Cancelled`.
    /// Vetoed successors left without predecessors get another chance to
    /// start.
    pub fn destroy(&mut self, id: ActionId) -> EngineResult<()> {
        let state = self.models.state(id).ok_or(EngineError::UnknownAction(id))?;
        let freed = self.graph.remove(id)?;
        self.vetoed.remove(id);
        self.blocked.remove(&id);
        self.requested.remove(&id);

        let now = self.now();
        if state.is_active() {
            let mut events = Vec::new();
            self.models.cancel(id, now, &mut events)?;
            self.events.extend(events);
            self.settle()?;
        } else if state == ActionState::Init {
            self.resolve_waits(id, now, WaitOutcome::Failed(Failure::Cancelled));
        }
        self.models.remove(id)?;

        for succ in freed {
            if let Some(preds) = self.blocked.get_mut(&succ) {
                preds.remove(&id);
                if preds.is_empty() {
                    self.blocked.remove(&succ);
                }
            }
            if self.requested.contains(&succ) {
                self.try_start(succ)?;
            }
        }
        debug!(action = %id, ?state, %now, "action destroyed");
        self.settle()
    }

    // ── Resources ─────────────────────────────────────────────────────────

    /// Turn a resource off now: every action using it fails.
    pub fn turn_off(&mut self, resource: ResourceId) -> EngineResult<()> {
        self.apply_change(resource, ProfileChange::TurnOff)?;
        self.settle()
    }

    /// Turn a resource back on.  Actions that failed stay failed.
    pub fn turn_on(&mut self, resource: ResourceId) -> EngineResult<()> {
        self.apply_change(resource, ProfileChange::TurnOn)
    }

    pub fn set_availability(&mut self, resource: ResourceId, scale: f64) -> EngineResult<()> {
        self.apply_change(resource, ProfileChange::Availability(scale))
    }

    pub fn schedule_turn_off(&mut self, resource: ResourceId, date: SimTime) -> EngineResult<()> {
        self.schedule(resource, date, ProfileChange::TurnOff)
    }

    pub fn schedule_turn_on(&mut self, resource: ResourceId, date: SimTime) -> EngineResult<()> {
        self.schedule(resource, date, ProfileChange::TurnOn)
    }

    pub fn schedule_availability(&mut self, resource: ResourceId, date: SimTime, scale: f64) -> EngineResult<()> {
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(EngineError::InvalidArgument(format!("availability scale must be positive, got {scale}")));
        }
        self.schedule(resource, date, ProfileChange::Availability(scale))
    }

    fn schedule(&mut self, resource: ResourceId, date: SimTime, change: ProfileChange) -> EngineResult<()> {
        self.check_future("profile", date)?;
        if self.models.table().get(resource).is_none() {
            return Err(EngineError::UnknownResource(resource));
        }
        self.profiles.push(date, resource, change);
        Ok(())
    }

    fn apply_change(&mut self, resource: ResourceId, change: ProfileChange) -> EngineResult<()> {
        let now = self.now();
        match change {
            ProfileChange::TurnOff => {
                let mut events = Vec::new();
                self.models.turn_off(resource, now, &mut events)?;
                self.events.extend(events);
            }
            ProfileChange::TurnOn => self.models.turn_on(resource)?,
            ProfileChange::Availability(scale) => self.models.set_availability(resource, scale)?,
        }
        trace!(%resource, ?change, %now, "resource change applied");
        Ok(())
    }

    // ── Timers and waits ──────────────────────────────────────────────────

    /// Wake-up deadline at `date` (not before now).
    pub fn set_timer(&mut self, date: SimTime) -> EngineResult<TimerId> {
        self.check_future("timer", date)?;
        Ok(self.timers.push(date))
    }

    /// Returns `false` if the timer already fired.
    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    /// Block on the end of `action`.  The wait is kept after it resolves;
    /// drop it with [`forget_wait`](Self::forget_wait) once its outcome is
    /// read, or in bulk with
    /// [`forget_resolved_waits`](Self::forget_resolved_waits).
    pub fn wait(&mut self, action: ActionId) -> EngineResult<WaitId> {
        self.add_wait(action, None)
    }

    /// Block on the end of `action` for at most `timeout` seconds.  Only the
    /// wait times out; the action keeps running.
    pub fn wait_for(&mut self, action: ActionId, timeout: f64) -> EngineResult<WaitId> {
        if !(timeout >= 0.0 && timeout.is_finite()) {
            return Err(EngineError::InvalidArgument(format!("timeout must be >= 0 and finite, got {timeout}")));
        }
        self.add_wait(action, Some(self.now() + timeout))
    }

    /// `None` while the wait is pending.
    pub fn wait_outcome(&self, id: WaitId) -> EngineResult<Option<&WaitOutcome>> {
        if !self.waits.contains(id) {
            return Err(EngineError::UnknownWait(id));
        }
        Ok(self.waits.outcome(id))
    }

    /// Drop a wait.  Returns its outcome if it had resolved.
    pub fn forget_wait(&mut self, id: WaitId) -> EngineResult<Option<WaitOutcome>> {
        if !self.waits.contains(id) {
            return Err(EngineError::UnknownWait(id));
        }
        Ok(self.waits.remove(id))
    }

    /// Drop every resolved wait.  Returns how many went.
    pub fn forget_resolved_waits(&mut self) -> usize {
        let dropped = self.waits.forget_resolved();
        trace!(dropped, "resolved waits forgotten");
        dropped
    }

    fn add_wait(&mut self, action: ActionId, deadline: Option<SimTime>) -> EngineResult<WaitId> {
        let report = self.report(action).ok_or(EngineError::UnknownAction(action))?;
        let now = self.now();
        let settled = if report.state.is_terminal() {
            Some(WaitOutcome::from(report.failure))
        } else {
            self.blocked_by(action)
                .next()
                .map(|predecessor| WaitOutcome::Failed(Failure::Dependency { predecessor }))
        };
        Ok(match settled {
            Some(outcome) => {
                let id = self.waits.add_resolved(action, now, outcome.clone());
                self.notices.push((now, Notice::WaitResolved(id, outcome)));
                id
            }
            None => self.waits.add(action, now, deadline),
        })
    }

    fn check_future(&self, what: &'static str, date: SimTime) -> EngineResult<()> {
        let now = self.now();
        if date < now || !date.secs().is_finite() {
            return Err(EngineError::PastDate { what, date, now });
        }
        Ok(())
    }

    // ── Loop ──────────────────────────────────────────────────────────────

    /// Run rounds until nothing is left to do.
    pub fn run<O: EngineObserver>(&mut self, observer: &mut O) -> EngineResult<RunOutcome> {
        self.run_inner(None, observer)
    }

    /// Run rounds until `date`, or until nothing is left to do before it.
    pub fn run_until<O: EngineObserver>(&mut self, date: SimTime, observer: &mut O) -> EngineResult<RunOutcome> {
        self.check_future("run limit", date)?;
        self.run_inner(Some(date), observer)
    }

    fn run_inner<O: EngineObserver>(&mut self, limit: Option<SimTime>, observer: &mut O) -> EngineResult<RunOutcome> {
        let outcome = loop {
            self.settle()?;
            if self.config.stop_on_veto {
                let needs: Vec<ActionId> = self.vetoed.with_reason(VetoReason::Unassigned).collect();
                if !needs.is_empty() {
                    break RunOutcome::NeedsAssignment(needs);
                }
            }
            match self.step(limit, observer)? {
                None => break self.idle_outcome(),
                Some(report) if limit.is_some_and(|l| report.date >= l) => break RunOutcome::DeadlineReached,
                Some(_) => {}
            }
        };
        self.flush(observer);
        debug!(now = %self.now(), rounds = self.rounds(), ?outcome, "run finished");
        observer.on_sim_end(self.now(), &outcome);
        Ok(outcome)
    }

    /// Run one round, advancing the clock at most to `limit`.  Returns
    /// `None` when nothing is left to happen.
    ///
    /// If a released successor fails to start, the round still runs to its
    /// end and the first such error is returned afterwards.
    pub fn step<O: EngineObserver>(&mut self, limit: Option<SimTime>, observer: &mut O) -> EngineResult<Option<RoundReport>> {
        self.settle()?;
        self.flush(observer);

        let now = self.now();
        let next = [
            self.models.next_event(now)?,
            self.timers.next_date(),
            self.waits.next_deadline(),
            self.profiles.next_date(),
            limit,
        ]
        .into_iter()
        .flatten()
        .min();
        let Some(next) = next else {
            return Ok(None);
        };

        observer.on_round_start(now);
        let date = self.clock.advance_to(next);
        trace!(%date, round = self.rounds(), "round");

        let mut events = Vec::new();
        self.models.update(date, &mut events)?;
        self.events.extend(events);
        let mut deferred = self.settle().err();

        for (resource, change) in self.profiles.drain_due(date) {
            self.apply_change(resource, change)?;
            if let Err(err) = self.settle() {
                deferred.get_or_insert(err);
            }
        }
        for timer in self.timers.drain_due(date) {
            self.notices.push((date, Notice::Timer(timer)));
        }
        for (wait, outcome) in self.waits.expire_due(date) {
            self.notices.push((date, Notice::WaitResolved(wait, outcome)));
        }

        let mut report = RoundReport { date, round: self.rounds(), finished: Vec::new(), timers: Vec::new(), waits: Vec::new() };
        for notice in self.flush(observer) {
            match notice {
                Notice::Finished(r) => report.finished.push(r.id),
                Notice::Timer(t) => report.timers.push(t),
                Notice::WaitResolved(w, _) => report.waits.push(w),
                _ => {}
            }
        }
        observer.on_round_end(&report);
        match deferred {
            Some(err) => Err(err),
            None => Ok(Some(report)),
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Start `id` if nothing stops it, veto it otherwise.
    fn try_start(&mut self, id: ActionId) -> EngineResult<StartOutcome> {
        let now = self.now();
        let state = self.models.state(id).ok_or(EngineError::UnknownAction(id))?;
        if state != ActionState::Init {
            return Err(ResourceError::InvalidState { action: id, state, op: "start" }.into());
        }
        self.requested.insert(id);
        let veto = if !self.graph.dependencies_solved(id)? {
            Some(VetoReason::Dependencies)
        } else if !self.models.is_assigned(id) {
            Some(VetoReason::Unassigned)
        } else {
            None
        };
        if let Some(reason) = veto {
            self.vetoed.veto(id, reason);
            debug!(action = %id, ?reason, %now, "start vetoed");
            if let Some(report) = self.models.report(id, now) {
                self.notices.push((now, Notice::Vetoed(report, reason)));
            }
            return Ok(StartOutcome::Vetoed(reason));
        }

        let mut events = Vec::new();
        self.models.start(id, now, &mut events)?;
        self.graph.mark_started(id)?;
        self.vetoed.remove(id);
        self.blocked.remove(&id);
        self.requested.remove(&id);
        if let Some(report) = self.models.report(id, now) {
            self.notices.push((now, Notice::Started(report)));
        }
        self.events.extend(events);
        Ok(StartOutcome::Started)
    }

    /// Apply the consequences of every pending terminal transition, including
    /// the ones they cause, until nothing else changes at this date.
    ///
    /// A successor that fails to start does not hold back the others: the
    /// cascade runs to the end and the first such error is returned.  The
    /// failed successor stays in `Init` and shows up in `Stalled`.
    fn settle(&mut self) -> EngineResult<()> {
        let mut first_error = None;
        while let Some(event) = self.events.pop_front() {
            let ActionEvent { action, date, failure } = event;
            if let Some(report) = self.models.report(action, date) {
                self.notices.push((date, Notice::Finished(report)));
            }
            self.resolve_waits(action, date, WaitOutcome::from(failure.clone()));
            if !self.graph.contains(action) {
                continue;
            }
            match failure {
                None => {
                    for succ in self.graph.complete(action)? {
                        if self.models.state(succ) != Some(ActionState::Init) {
                            continue;
                        }
                        if let Err(err) = self.try_start(succ) {
                            warn!(action = %succ, predecessor = %action, %date, %err, "successor failed to start");
                            first_error.get_or_insert(err);
                        }
                    }
                }
                Some(_) => {
                    for succ in self.graph.blocked_by(action)? {
                        if self.models.state(succ) != Some(ActionState::Init) {
                            continue;
                        }
                        self.blocked.entry(succ).or_default().insert(action);
                        debug!(action = %succ, predecessor = %action, %date, "dependency error");
                        self.notices.push((date, Notice::DependencyError { action: succ, predecessor: action }));
                        let outcome = WaitOutcome::Failed(Failure::Dependency { predecessor: action });
                        self.resolve_waits(succ, date, outcome);
                    }
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn resolve_waits(&mut self, action: ActionId, date: SimTime, outcome: WaitOutcome) {
        for wait in self.waits.resolve_action(action, &outcome) {
            self.notices.push((date, Notice::WaitResolved(wait, outcome.clone())));
        }
    }

    /// The edge `from → to` is gone: forget the failure it carried and start
    /// `to` if a start was requested and nothing else holds it.
    fn unblock(&mut self, from: ActionId, to: ActionId) -> EngineResult<()> {
        if let Some(preds) = self.blocked.get_mut(&to) {
            preds.remove(&from);
            if preds.is_empty() {
                self.blocked.remove(&to);
            }
        }
        if self.requested.contains(&to) && self.graph.dependencies_solved(to)? {
            self.try_start(to)?;
        }
        Ok(())
    }

    fn idle_outcome(&self) -> RunOutcome {
        let stuck: BTreeSet<ActionId> = self
            .vetoed
            .iter()
            .chain(self.blocked.keys().copied())
            .chain(self.requested.iter().copied())
            .chain(self.models.started())
            .collect();
        if stuck.is_empty() {
            RunOutcome::Completed
        } else {
            RunOutcome::Stalled(stuck.into_iter().collect())
        }
    }

    /// Deliver recorded notices to `observer` and hand them back.
    fn flush<O: EngineObserver>(&mut self, observer: &mut O) -> Vec<Notice> {
        let notices = std::mem::take(&mut self.notices);
        notices
            .into_iter()
            .map(|(date, notice)| {
                match &notice {
                    Notice::Started(r) => observer.on_action_started(r, date),
                    Notice::Finished(r) => observer.on_action_finished(r, date),
                    Notice::Vetoed(r, reason) => observer.on_veto(r, *reason, date),
                    Notice::DependencyError { action, predecessor } => {
                        observer.on_dependency_error(*action, *predecessor, date)
                    }
                    Notice::WaitResolved(w, outcome) => observer.on_wait_resolved(*w, outcome, date),
                    Notice::Timer(t) => observer.on_timer(*t, date),
                }
                notice
            })
            .collect()
    }
}
