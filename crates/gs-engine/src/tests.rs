//! Integration tests for gs-engine.

#[cfg(test)]
mod helpers {
    use gs_activity::VetoReason;
    use gs_core::{ActionId, EngineConfig, NetPointId, ResourceId, SimTime, TimerId, WaitId};
    use gs_platform::{LinkSharing, PlatformBuilder};
    use gs_resource::{ActionReport, ActionState};

    use crate::{Engine, EngineBuilder, EngineObserver, RoundReport, RunOutcome, WaitOutcome};

    pub const EPS: f64 = 1e-6;

    pub struct Fixture {
        pub engine: Engine,
        pub h0:     NetPointId,
        pub h1:     NetPointId,
        pub cpu0:   ResourceId,
        pub cpu1:   ResourceId,
        pub link:   ResourceId,
    }

    /// ```text
    ///   h0 (1 f/s, 2 cores) ── l0 (100 B/s, 0.5 s) ── h1 (1 f/s, 1 core)
    /// ```
    pub fn fixture(config: EngineConfig) -> Fixture {
        let mut b = PlatformBuilder::new();
        let h0 = b.add_host("h0", 1.0, 2).unwrap();
        let h1 = b.add_host("h1", 1.0, 1).unwrap();
        let link = b.add_link("l0", 100.0, 0.5, LinkSharing::Shared).unwrap();
        b.connect(link, h0, h1).unwrap();
        let platform = b.build().unwrap();
        let cpu0 = platform.cpu_of(h0).unwrap();
        let cpu1 = platform.cpu_of(h1).unwrap();
        let engine = EngineBuilder::new(platform).config(config).build().unwrap();
        Fixture { engine, h0, h1, cpu0, cpu1, link }
    }

    /// The usual fixture plus `island`, a host no link reaches.
    pub fn island_fixture(config: EngineConfig) -> (Fixture, NetPointId) {
        let mut b = PlatformBuilder::new();
        let h0 = b.add_host("h0", 1.0, 2).unwrap();
        let h1 = b.add_host("h1", 1.0, 1).unwrap();
        let island = b.add_host("island", 1.0, 1).unwrap();
        let link = b.add_link("l0", 100.0, 0.5, LinkSharing::Shared).unwrap();
        b.connect(link, h0, h1).unwrap();
        let platform = b.build().unwrap();
        let cpu0 = platform.cpu_of(h0).unwrap();
        let cpu1 = platform.cpu_of(h1).unwrap();
        let engine = EngineBuilder::new(platform).config(config).build().unwrap();
        (Fixture { engine, h0, h1, cpu0, cpu1, link }, island)
    }

    pub fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS * expected.abs().max(1.0),
            "expected {expected}, got {actual}"
        );
    }

    pub fn finish_of(engine: &Engine, id: ActionId) -> f64 {
        let report = engine.report(id).unwrap();
        assert_eq!(report.state, ActionState::Done, "{id} did not complete");
        report.finish.unwrap().secs()
    }

    /// Everything an observer can see, in delivery order.
    #[derive(Clone, Debug, PartialEq)]
    pub enum Seen {
        Started(ActionId, SimTime),
        Finished(ActionId, ActionState, SimTime),
        Vetoed(ActionId, VetoReason),
        DependencyError(ActionId, ActionId),
        Wait(WaitId, WaitOutcome),
        Timer(TimerId, SimTime),
        End(RunOutcome),
    }

    #[derive(Default)]
    pub struct Recorder {
        pub seen:   Vec<Seen>,
        pub rounds: Vec<RoundReport>,
    }

    impl EngineObserver for Recorder {
        fn on_round_end(&mut self, report: &RoundReport) {
            self.rounds.push(report.clone());
        }
        fn on_action_started(&mut self, report: &ActionReport, now: SimTime) {
            self.seen.push(Seen::Started(report.id, now));
        }
        fn on_action_finished(&mut self, report: &ActionReport, now: SimTime) {
            self.seen.push(Seen::Finished(report.id, report.state, now));
        }
        fn on_veto(&mut self, report: &ActionReport, reason: VetoReason, _now: SimTime) {
            self.seen.push(Seen::Vetoed(report.id, reason));
        }
        fn on_dependency_error(&mut self, action: ActionId, predecessor: ActionId, _now: SimTime) {
            self.seen.push(Seen::DependencyError(action, predecessor));
        }
        fn on_wait_resolved(&mut self, wait: WaitId, outcome: &WaitOutcome, _now: SimTime) {
            self.seen.push(Seen::Wait(wait, outcome.clone()));
        }
        fn on_timer(&mut self, timer: TimerId, now: SimTime) {
            self.seen.push(Seen::Timer(timer, now));
        }
        fn on_sim_end(&mut self, _now: SimTime, outcome: &RunOutcome) {
            self.seen.push(Seen::End(outcome.clone()));
        }
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use gs_core::{EngineConfig, ErrorCategory, SimTime};
    use gs_platform::PlatformBuilder;

    use super::helpers::fixture;
    use crate::{EngineBuilder, NoopObserver, RunOutcome};

    #[test]
    fn builds_at_date_zero() {
        let f = fixture(EngineConfig::default());
        assert_eq!(f.engine.now(), SimTime::ZERO);
        assert_eq!(f.engine.rounds(), 0);
        assert_eq!(f.engine.platform().netpoint_count(), 2);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let platform = PlatformBuilder::new().build().unwrap();
        let config = EngineConfig { maxmin_precision: 0.0, ..Default::default() };
        let err = EngineBuilder::new(platform).config(config).build().err().unwrap();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn empty_engine_completes_immediately() {
        let mut f = fixture(EngineConfig::default());
        assert_eq!(f.engine.run(&mut NoopObserver).unwrap(), RunOutcome::Completed);
        assert_eq!(f.engine.now(), SimTime::ZERO);
    }
}

// ── Basic execution ───────────────────────────────────────────────────────────

#[cfg(test)]
mod execution {
    use gs_core::{EngineConfig, SimTime, UpdateAlgorithm};
    use gs_resource::ActionState;
    use test_case::test_case;

    use super::helpers::{assert_close, finish_of, fixture, Recorder, Seen};
    use crate::{NoopObserver, RunOutcome, StartOutcome};

    #[test_case(UpdateAlgorithm::Full ; "full")]
    #[test_case(UpdateAlgorithm::Lazy ; "lazy")]
    fn mixed_workload(update: UpdateAlgorithm) {
        let mut f = fixture(EngineConfig { update_algorithm: update, ..Default::default() });
        let e = f.engine.execute(f.h1, 2.0).unwrap();
        let c = f.engine.communicate(f.h0, f.h1, 100.0).unwrap();
        let s = f.engine.sleep(f.h0, 0.25).unwrap();
        for id in [e, c, s] {
            assert_eq!(f.engine.start(id).unwrap(), StartOutcome::Started);
        }
        assert_eq!(f.engine.run(&mut NoopObserver).unwrap(), RunOutcome::Completed);
        assert_close(finish_of(&f.engine, s), 0.25);
        // 0.5 s latency, then 100 B at 100 B/s.
        assert_close(finish_of(&f.engine, c), 1.5);
        assert_close(finish_of(&f.engine, e), 2.0);
        assert_close(f.engine.now().secs(), 2.0);
    }

    #[test]
    fn rounds_report_completions_in_order() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h0, 1.0).unwrap();
        let b = f.engine.execute(f.h0, 1.0).unwrap();
        let c = f.engine.execute(f.h0, 3.0).unwrap();
        for id in [a, b, c] {
            f.engine.start(id).unwrap();
        }
        let mut rec = Recorder::default();
        f.engine.run(&mut rec).unwrap();

        // Two cores shared by three execs: 2/3 f/s each until t = 1.5, then
        // the 2 f left of `c` on a core of its own.
        assert_eq!(rec.rounds.len(), 2);
        assert_eq!(rec.rounds[0].finished, vec![a, b]);
        assert_close(rec.rounds[0].date.secs(), 1.5);
        assert_eq!(rec.rounds[1].finished, vec![c]);
        assert_close(rec.rounds[1].date.secs(), 3.5);
        assert!(matches!(rec.seen[0], Seen::Started(id, _) if id == a));
        assert_eq!(rec.seen.last(), Some(&Seen::End(RunOutcome::Completed)));
    }

    #[test]
    fn run_until_stops_at_the_limit() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 4.0).unwrap();
        f.engine.start(a).unwrap();
        let outcome = f.engine.run_until(SimTime::new(1.0), &mut NoopObserver).unwrap();
        assert_eq!(outcome, RunOutcome::DeadlineReached);
        assert_eq!(f.engine.now(), SimTime::new(1.0));
        let report = f.engine.report(a).unwrap();
        assert_eq!(report.state, ActionState::Running);
        assert_close(report.remaining, 3.0);

        assert_eq!(f.engine.run(&mut NoopObserver).unwrap(), RunOutcome::Completed);
        assert_close(finish_of(&f.engine, a), 4.0);
    }

    #[test]
    fn run_until_in_the_past_is_rejected() {
        let mut f = fixture(EngineConfig::default());
        f.engine.run_until(SimTime::new(2.0), &mut NoopObserver).unwrap();
        assert!(f.engine.run_until(SimTime::new(1.0), &mut NoopObserver).is_err());
    }

    #[test]
    fn step_returns_none_when_idle() {
        let mut f = fixture(EngineConfig::default());
        assert!(f.engine.step(None, &mut NoopObserver).unwrap().is_none());
        let a = f.engine.execute(f.h0, 1.0).unwrap();
        f.engine.start(a).unwrap();
        let report = f.engine.step(None, &mut NoopObserver).unwrap().unwrap();
        assert_eq!(report.finished, vec![a]);
        assert_eq!(report.round, 1);
        assert!(f.engine.step(None, &mut NoopObserver).unwrap().is_none());
    }

    #[test]
    fn suspended_action_stalls_the_run() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 2.0).unwrap();
        f.engine.start(a).unwrap();
        f.engine.run_until(SimTime::new(1.0), &mut NoopObserver).unwrap();
        f.engine.suspend(a).unwrap();
        assert_eq!(f.engine.run(&mut NoopObserver).unwrap(), RunOutcome::Stalled(vec![a]));

        f.engine.resume(a).unwrap();
        assert_eq!(f.engine.run(&mut NoopObserver).unwrap(), RunOutcome::Completed);
        assert_close(finish_of(&f.engine, a), 2.0);
    }
}

// ── Dependencies ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod dependencies {
    use gs_activity::VetoReason;
    use gs_core::{EngineConfig, ErrorCategory, Failure, SimTime};
    use gs_platform::PlatformError;
    use gs_resource::{ActionState, ResourceError, Target};

    use super::helpers::{assert_close, finish_of, fixture, island_fixture, Recorder, Seen};
    use crate::{EngineError, NoopObserver, RunOutcome, StartOutcome, WaitOutcome};

    #[test]
    fn child_waits_for_both_parents() {
        let mut f = fixture(EngineConfig::default());
        let p1 = f.engine.execute(f.h0, 1.0).unwrap();
        let p2 = f.engine.execute(f.h0, 2.0).unwrap();
        let child = f.engine.execute(f.h0, 1.0).unwrap();
        f.engine.add_successor(p1, child).unwrap();
        f.engine.add_successor(p2, child).unwrap();

        f.engine.start(p1).unwrap();
        f.engine.start(p2).unwrap();
        assert_eq!(f.engine.start(child).unwrap(), StartOutcome::Vetoed(VetoReason::Dependencies));
        assert_eq!(f.engine.vetoed().reason(child), Some(VetoReason::Dependencies));

        let mut rec = Recorder::default();
        assert_eq!(f.engine.run(&mut rec).unwrap(), RunOutcome::Completed);
        assert_close(finish_of(&f.engine, p1), 1.0);
        assert_close(finish_of(&f.engine, p2), 2.0);
        assert_close(f.engine.report(child).unwrap().start.unwrap().secs(), 2.0);
        assert_close(finish_of(&f.engine, child), 3.0);
        assert!(f.engine.vetoed().is_empty());
        assert!(rec.seen.contains(&Seen::Vetoed(child, VetoReason::Dependencies)));
    }

    #[test]
    fn zero_amount_chain_resolves_without_advancing_time() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h0, 0.0).unwrap();
        let b = f.engine.execute(f.h0, 0.0).unwrap();
        let c = f.engine.execute(f.h0, 1.0).unwrap();
        f.engine.add_successor(a, b).unwrap();
        f.engine.add_successor(b, c).unwrap();
        f.engine.start(c).unwrap();
        f.engine.start(b).unwrap();
        f.engine.start(a).unwrap();

        assert_eq!(f.engine.state(a), Some(ActionState::Done));
        assert_eq!(f.engine.state(b), Some(ActionState::Done));
        assert_eq!(f.engine.state(c), Some(ActionState::Running));
        assert_eq!(f.engine.now(), SimTime::ZERO);

        f.engine.run(&mut NoopObserver).unwrap();
        assert_close(finish_of(&f.engine, c), 1.0);
    }

    #[test]
    fn successors_start_once_released() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h0, 1.0).unwrap();
        let b = f.engine.execute(f.h0, 1.0).unwrap();
        f.engine.add_successor(a, b).unwrap();
        f.engine.start(a).unwrap();
        f.engine.run(&mut NoopObserver).unwrap();
        assert_close(finish_of(&f.engine, b), 2.0);
    }

    #[test]
    fn failed_parent_blocks_its_child() {
        let mut f = fixture(EngineConfig::default());
        let parent = f.engine.execute(f.h1, 2.0).unwrap();
        let child = f.engine.execute(f.h0, 1.0).unwrap();
        let other = f.engine.execute(f.h0, 3.0).unwrap();
        f.engine.add_successor(parent, child).unwrap();
        f.engine.start(parent).unwrap();
        f.engine.start(child).unwrap();
        f.engine.start(other).unwrap();
        let wait = f.engine.wait(child).unwrap();
        f.engine.schedule_turn_off(f.cpu1, SimTime::new(1.0)).unwrap();

        let mut rec = Recorder::default();
        let outcome = f.engine.run(&mut rec).unwrap();
        assert_eq!(outcome, RunOutcome::Stalled(vec![child]));

        let report = f.engine.report(parent).unwrap();
        assert_eq!(report.state, ActionState::Failed);
        assert_eq!(report.failure, Some(Failure::ResourceFailure { resource: f.cpu1 }));
        assert_close(report.remaining_ratio(), 0.5);
        // Unrelated work is unaffected.
        assert_close(finish_of(&f.engine, other), 3.0);

        assert_eq!(f.engine.state(child), Some(ActionState::Init));
        assert_eq!(f.engine.blocked_by(child).collect::<Vec<_>>(), vec![parent]);
        assert!(rec.seen.contains(&Seen::DependencyError(child, parent)));
        assert_eq!(
            f.engine.wait_outcome(wait).unwrap(),
            Some(&WaitOutcome::Failed(Failure::Dependency { predecessor: parent }))
        );

        // Turning the host back on does not revive the failed parent.
        f.engine.turn_on(f.cpu1).unwrap();
        assert_eq!(f.engine.state(parent), Some(ActionState::Failed));
    }

    #[test]
    fn removing_the_failed_edge_unblocks_the_child() {
        let mut f = fixture(EngineConfig::default());
        let parent = f.engine.execute(f.h1, 2.0).unwrap();
        let child = f.engine.execute(f.h0, 1.0).unwrap();
        f.engine.add_successor(parent, child).unwrap();
        f.engine.start(parent).unwrap();
        f.engine.start(child).unwrap();
        f.engine.cancel(parent).unwrap();
        assert_eq!(f.engine.blocked_by(child).count(), 1);

        f.engine.remove_successor(parent, child).unwrap();
        assert_eq!(f.engine.state(child), Some(ActionState::Running));
        assert_eq!(f.engine.run(&mut NoopObserver).unwrap(), RunOutcome::Completed);
        assert_close(finish_of(&f.engine, child), 1.0);
    }

    #[test]
    fn remove_all_successors_releases_every_child() {
        let mut f = fixture(EngineConfig::default());
        let parent = f.engine.execute(f.h1, 5.0).unwrap();
        let kids: Vec<_> = (0..2).map(|_| f.engine.execute(f.h0, 1.0).unwrap()).collect();
        for &k in &kids {
            f.engine.add_successor(parent, k).unwrap();
            f.engine.start(k).unwrap();
        }
        let removed = f.engine.remove_all_successors(parent).unwrap();
        assert_eq!(removed, kids);
        for &k in &kids {
            assert_eq!(f.engine.state(k), Some(ActionState::Running));
        }
    }

    #[test]
    fn edges_into_ended_or_started_actions_are_rejected() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h0, 0.0).unwrap();
        let b = f.engine.execute(f.h0, 1.0).unwrap();
        let c = f.engine.execute(f.h0, 1.0).unwrap();
        f.engine.start(a).unwrap();
        assert_eq!(f.engine.add_successor(a, b).unwrap_err().category(), ErrorCategory::InvalidArgument);
        f.engine.start(b).unwrap();
        assert_eq!(f.engine.add_successor(c, b).unwrap_err().category(), ErrorCategory::Dependency);
        assert_eq!(f.engine.add_successor(c, c).unwrap_err().category(), ErrorCategory::InvalidArgument);
    }

    #[test]
    fn assigning_a_vetoed_activity_starts_it() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.create(Target::Exec { host: None }, 1.0).unwrap();
        assert_eq!(f.engine.start(a).unwrap(), StartOutcome::Vetoed(VetoReason::Unassigned));
        assert_eq!(f.engine.vetoed().attempts(a), 1);

        f.engine.assign(a, Target::exec(f.h1)).unwrap();
        assert_eq!(f.engine.state(a), Some(ActionState::Running));
        assert!(!f.engine.vetoed().contains(a));
        f.engine.run(&mut NoopObserver).unwrap();
        assert_close(finish_of(&f.engine, a), 1.0);
    }

    #[test]
    fn stop_on_veto_asks_for_an_assignment() {
        let mut f = fixture(EngineConfig { stop_on_veto: true, ..Default::default() });
        let parent = f.engine.execute(f.h0, 1.0).unwrap();
        let child = f.engine.create(Target::Exec { host: None }, 1.0).unwrap();
        f.engine.add_successor(parent, child).unwrap();
        f.engine.start(parent).unwrap();
        f.engine.start(child).unwrap();

        // The child is released at t = 1 and then vetoed for lack of a host.
        let outcome = f.engine.run(&mut NoopObserver).unwrap();
        assert_eq!(outcome, RunOutcome::NeedsAssignment(vec![child]));
        assert_close(f.engine.now().secs(), 1.0);

        f.engine.assign(child, Target::exec(f.h0)).unwrap();
        assert_eq!(f.engine.run(&mut NoopObserver).unwrap(), RunOutcome::Completed);
        assert_close(finish_of(&f.engine, child), 2.0);
    }

    #[test]
    fn unassigned_activity_without_stop_on_veto_stalls() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.create(Target::Exec { host: None }, 1.0).unwrap();
        f.engine.start(a).unwrap();
        assert_eq!(f.engine.run(&mut NoopObserver).unwrap(), RunOutcome::Stalled(vec![a]));
    }

    #[test]
    fn a_successor_that_cannot_start_does_not_hold_back_its_siblings() {
        let (mut f, island) = island_fixture(EngineConfig::default());
        let parent = f.engine.execute(f.h0, 1.0).unwrap();
        let lost = f.engine.communicate(f.h0, island, 10.0).unwrap();
        let sibling = f.engine.execute(f.h0, 1.0).unwrap();
        f.engine.add_successor(parent, lost).unwrap();
        f.engine.add_successor(parent, sibling).unwrap();
        f.engine.start(parent).unwrap();
        f.engine.start(lost).unwrap();
        f.engine.start(sibling).unwrap();

        let err = f.engine.run(&mut NoopObserver).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(matches!(
            err,
            EngineError::Resource(ResourceError::Platform(PlatformError::NoRoute { to, .. })) if to == island
        ));
        assert_eq!(f.engine.state(sibling), Some(ActionState::Running));
        assert_eq!(f.engine.state(lost), Some(ActionState::Init));
        assert!(!f.engine.graph().is_started(lost).unwrap());

        // The sibling runs to its end; the transfer is reported, not lost.
        let outcome = f.engine.run(&mut NoopObserver).unwrap();
        assert_eq!(outcome, RunOutcome::Stalled(vec![lost]));
        assert_close(finish_of(&f.engine, sibling), 2.0);
    }

    #[test]
    fn an_action_whose_start_failed_can_be_rewired() {
        let (mut f, island) = island_fixture(EngineConfig::default());
        let flow = f.engine.communicate(f.h0, island, 10.0).unwrap();
        assert!(f.engine.start(flow).is_err());
        assert_eq!(f.engine.state(flow), Some(ActionState::Init));

        let before = f.engine.execute(f.h0, 1.0).unwrap();
        f.engine.add_successor(before, flow).unwrap();
        f.engine.assign(flow, Target::comm(f.h0, f.h1)).unwrap();
        assert_eq!(f.engine.state(flow), Some(ActionState::Init));

        f.engine.start(before).unwrap();
        assert_eq!(f.engine.run(&mut NoopObserver).unwrap(), RunOutcome::Completed);
        // Released at 1, then 0.5 s latency and 10 B at 100 B/s.
        assert_close(finish_of(&f.engine, flow), 1.6);
    }

    #[test]
    fn destroy_detaches_and_releases() {
        let mut f = fixture(EngineConfig::default());
        let parent = f.engine.execute(f.h1, 5.0).unwrap();
        let child = f.engine.execute(f.h0, 1.0).unwrap();
        f.engine.add_successor(parent, child).unwrap();
        f.engine.start(parent).unwrap();
        f.engine.start(child).unwrap();
        let wait = f.engine.wait(parent).unwrap();

        f.engine.destroy(parent).unwrap();
        assert_eq!(f.engine.state(parent), None);
        assert_eq!(f.engine.wait_outcome(wait).unwrap(), Some(&WaitOutcome::Failed(Failure::Cancelled)));
        // The edge went away with the parent; nothing blocks the child.
        assert_eq!(f.engine.state(child), Some(ActionState::Running));
        assert!(f.engine.destroy(parent).is_err());
    }
}

// ── Control ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod control {
    use gs_core::{EngineConfig, Failure, SimTime};
    use gs_resource::ActionState;

    use super::helpers::{assert_close, finish_of, fixture};
    use crate::{NoopObserver, WaitOutcome};

    #[test]
    fn cancel_in_init_is_a_no_op() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h0, 1.0).unwrap();
        assert!(!f.engine.cancel(a).unwrap());
        assert_eq!(f.engine.state(a), Some(ActionState::Init));
    }

    #[test]
    fn cancel_running_action() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 2.0).unwrap();
        f.engine.start(a).unwrap();
        let wait = f.engine.wait(a).unwrap();
        f.engine.run_until(SimTime::new(0.5), &mut NoopObserver).unwrap();
        assert!(f.engine.cancel(a).unwrap());
        assert_eq!(f.engine.state(a), Some(ActionState::Cancelled));
        assert_eq!(f.engine.wait_outcome(wait).unwrap(), Some(&WaitOutcome::Failed(Failure::Cancelled)));
        assert!(!f.engine.cancel(a).unwrap());
    }

    #[test]
    fn priority_and_bound_shape_the_share() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 2.0).unwrap();
        let b = f.engine.execute(f.h1, 1.0).unwrap();
        f.engine.start(a).unwrap();
        f.engine.start(b).unwrap();
        f.engine.set_priority(a, 2.0).unwrap();
        f.engine.run(&mut NoopObserver).unwrap();
        // a gets 2/3 f/s, b 1/3 f/s: both end at t = 3.
        assert_close(finish_of(&f.engine, a), 3.0);
        assert_close(finish_of(&f.engine, b), 3.0);

        let c = f.engine.execute(f.h1, 1.0).unwrap();
        f.engine.start(c).unwrap();
        f.engine.set_bound(c, Some(0.25)).unwrap();
        f.engine.run(&mut NoopObserver).unwrap();
        assert_close(finish_of(&f.engine, c), 7.0);
    }

    #[test]
    fn max_duration_cuts_an_action_short() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 10.0).unwrap();
        f.engine.start(a).unwrap();
        f.engine.set_max_duration(a, Some(2.0)).unwrap();
        f.engine.run(&mut NoopObserver).unwrap();
        let report = f.engine.report(a).unwrap();
        assert_close(report.finish.unwrap().secs(), 2.0);
    }

    #[test]
    fn availability_changes_apply_at_their_date() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 2.0).unwrap();
        f.engine.start(a).unwrap();
        f.engine.schedule_availability(f.cpu1, SimTime::new(1.0), 0.5).unwrap();
        f.engine.run(&mut NoopObserver).unwrap();
        // 1 f done by t = 1, the last one at 0.5 f/s.
        assert_close(finish_of(&f.engine, a), 3.0);
    }

    #[test]
    fn completion_at_the_failure_date_wins() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 1.0).unwrap();
        f.engine.start(a).unwrap();
        f.engine.schedule_turn_off(f.cpu1, SimTime::new(1.0)).unwrap();
        f.engine.run(&mut NoopObserver).unwrap();
        assert_close(finish_of(&f.engine, a), 1.0);
    }

    #[test]
    fn link_failure_fails_the_transfer() {
        let mut f = fixture(EngineConfig::default());
        let c = f.engine.communicate(f.h0, f.h1, 100.0).unwrap();
        f.engine.start(c).unwrap();
        f.engine.run_until(SimTime::new(1.0), &mut NoopObserver).unwrap();
        f.engine.turn_off(f.link).unwrap();
        let report = f.engine.report(c).unwrap();
        assert_eq!(report.state, ActionState::Failed);
        assert_close(report.remaining_ratio(), 0.5);
    }

    #[test]
    fn scheduling_checks_dates_and_resources() {
        let mut f = fixture(EngineConfig::default());
        f.engine.run_until(SimTime::new(1.0), &mut NoopObserver).unwrap();
        assert!(f.engine.schedule_turn_off(f.cpu0, SimTime::new(0.5)).is_err());
        assert!(f.engine.schedule_turn_on(gs_core::ResourceId(99), SimTime::new(2.0)).is_err());
        assert!(f.engine.schedule_availability(f.cpu0, SimTime::new(2.0), 0.0).is_err());
    }
}

// ── Timers and waits ──────────────────────────────────────────────────────────

#[cfg(test)]
mod waits {
    use gs_core::{EngineConfig, ErrorCategory, Failure, SimTime};
    use gs_resource::ActionState;

    use super::helpers::{assert_close, fixture, Recorder, Seen};
    use crate::{NoopObserver, RunOutcome, WaitOutcome};

    #[test]
    fn timers_fire_in_date_order() {
        let mut f = fixture(EngineConfig::default());
        let late = f.engine.set_timer(SimTime::new(2.0)).unwrap();
        let early = f.engine.set_timer(SimTime::new(1.0)).unwrap();
        let dropped = f.engine.set_timer(SimTime::new(1.5)).unwrap();
        assert!(f.engine.cancel_timer(dropped));

        let mut rec = Recorder::default();
        assert_eq!(f.engine.run(&mut rec).unwrap(), RunOutcome::Completed);
        let fired: Vec<_> = rec.seen.iter().filter(|s| matches!(s, Seen::Timer(..))).cloned().collect();
        assert_eq!(fired, vec![Seen::Timer(early, SimTime::new(1.0)), Seen::Timer(late, SimTime::new(2.0))]);
        assert!(!f.engine.cancel_timer(early));
    }

    #[test]
    fn timer_in_the_past_is_rejected() {
        let mut f = fixture(EngineConfig::default());
        f.engine.set_timer(SimTime::new(1.0)).unwrap();
        f.engine.run(&mut NoopObserver).unwrap();
        let err = f.engine.set_timer(SimTime::new(0.5)).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidArgument);
    }

    #[test]
    fn wait_resolves_on_completion() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 1.0).unwrap();
        f.engine.start(a).unwrap();
        let wait = f.engine.wait(a).unwrap();
        assert_eq!(f.engine.wait_outcome(wait).unwrap(), None);

        let mut rec = Recorder::default();
        f.engine.run(&mut rec).unwrap();
        assert_eq!(f.engine.wait_outcome(wait).unwrap(), Some(&WaitOutcome::Done));
        assert!(rec.seen.contains(&Seen::Wait(wait, WaitOutcome::Done)));
    }

    #[test]
    fn wait_on_an_ended_action_resolves_at_once() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 0.0).unwrap();
        f.engine.start(a).unwrap();
        let wait = f.engine.wait(a).unwrap();
        assert_eq!(f.engine.wait_outcome(wait).unwrap(), Some(&WaitOutcome::Done));
    }

    #[test]
    fn wait_for_times_out_but_the_action_keeps_running() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 3.0).unwrap();
        f.engine.start(a).unwrap();
        let wait = f.engine.wait_for(a, 1.0).unwrap();

        let report = f.engine.step(None, &mut NoopObserver).unwrap().unwrap();
        assert_eq!(report.date, SimTime::new(1.0));
        assert_eq!(report.waits, vec![wait]);
        match f.engine.wait_outcome(wait).unwrap() {
            Some(WaitOutcome::Failed(Failure::Timeout { after })) => assert_close(*after, 1.0),
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert_eq!(f.engine.state(a), Some(ActionState::Running));
        f.engine.run(&mut NoopObserver).unwrap();
        assert_eq!(f.engine.state(a), Some(ActionState::Done));
    }

    #[test]
    fn completion_at_the_deadline_wins() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 1.0).unwrap();
        f.engine.start(a).unwrap();
        let wait = f.engine.wait_for(a, 1.0).unwrap();
        f.engine.run(&mut NoopObserver).unwrap();
        assert_eq!(f.engine.wait_outcome(wait).unwrap(), Some(&WaitOutcome::Done));
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 1.0).unwrap();
        assert!(f.engine.wait_for(a, -1.0).is_err());
    }

    #[test]
    fn resolved_waits_can_be_dropped_in_bulk() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 1.0).unwrap();
        let b = f.engine.execute(f.h1, 5.0).unwrap();
        f.engine.start(a).unwrap();
        f.engine.start(b).unwrap();
        let done = f.engine.wait(a).unwrap();
        let pending = f.engine.wait(b).unwrap();
        f.engine.run_until(SimTime::new(3.0), &mut NoopObserver).unwrap();

        assert_eq!(f.engine.forget_resolved_waits(), 1);
        assert!(f.engine.wait_outcome(done).is_err());
        assert_eq!(f.engine.wait_outcome(pending).unwrap(), None);
        f.engine.run(&mut NoopObserver).unwrap();
        assert_eq!(f.engine.forget_wait(pending).unwrap(), Some(WaitOutcome::Done));
        assert_eq!(f.engine.forget_resolved_waits(), 0);
    }

    #[test]
    fn forgotten_waits_are_unknown() {
        let mut f = fixture(EngineConfig::default());
        let a = f.engine.execute(f.h1, 1.0).unwrap();
        let wait = f.engine.wait(a).unwrap();
        assert_eq!(f.engine.forget_wait(wait).unwrap(), None);
        assert!(f.engine.wait_outcome(wait).is_err());
    }
}

// ── Queue unit tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod queues {
    use gs_core::{ActionId, ResourceId, SimTime};

    use crate::{ProfileChange, ProfileQueue, TimerQueue, WaitOutcome, WaitTable};

    #[test]
    fn timer_queue_drains_due_dates() {
        let mut q = TimerQueue::new();
        let a = q.push(SimTime::new(2.0));
        let b = q.push(SimTime::new(1.0));
        let c = q.push(SimTime::new(1.0));
        assert_eq!(q.next_date(), Some(SimTime::new(1.0)));
        assert_eq!(q.drain_due(SimTime::new(1.0)), vec![b, c]);
        assert_eq!(q.date(a), Some(SimTime::new(2.0)));
        assert!(q.cancel(a));
        assert!(q.is_empty());
        assert_eq!(q.next_date(), None);
    }

    #[test]
    fn profile_queue_keeps_schedule_order() {
        let mut q = ProfileQueue::new();
        let r = ResourceId(0);
        q.push(SimTime::new(1.0), r, ProfileChange::TurnOff);
        q.push(SimTime::new(1.0), r, ProfileChange::TurnOn);
        q.push(SimTime::new(3.0), r, ProfileChange::Availability(0.5));
        let due = q.drain_due(SimTime::new(2.0));
        assert_eq!(due, vec![(r, ProfileChange::TurnOff), (r, ProfileChange::TurnOn)]);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn wait_table_resolves_each_wait_once() {
        let mut t = WaitTable::new();
        let a = ActionId(0);
        let w1 = t.add(a, SimTime::ZERO, Some(SimTime::new(5.0)));
        let w2 = t.add(a, SimTime::ZERO, None);
        assert_eq!(t.pending_count(), 2);
        assert_eq!(t.resolve_action(a, &WaitOutcome::Done), vec![w1, w2]);
        assert_eq!(t.next_deadline(), None);
        assert!(t.expire_due(SimTime::new(10.0)).is_empty());
        assert_eq!(t.resolve_action(a, &WaitOutcome::Done), vec![]);
        assert_eq!(t.action(w1), Some(a));
        assert_eq!(t.forget_resolved(), 2);
        assert!(t.is_empty());
    }
}
