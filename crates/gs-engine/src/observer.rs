//! Engine observer trait for tracing and data collection.

use gs_activity::VetoReason;
use gs_core::{ActionId, SimTime, TimerId, WaitId};
use gs_resource::ActionReport;

use crate::{RoundReport, RunOutcome, WaitOutcome};

/// Callbacks invoked by [`Engine::step`][crate::Engine::step] and
/// [`Engine::run`][crate::Engine::run].
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.  Hooks receive read-only snapshots and
/// cannot reach the solver.
///
/// Changes made through the engine API between rounds (starting an action,
/// cancelling one, assigning a vetoed activity…) are reported at the start
/// of the next round, stamped with the date they happened.
///
/// # Example — completion log
///
/// ```rust,ignore
/// struct Log;
///
/// impl EngineObserver for Log {
///     fn on_action_finished(&mut self, report: &ActionReport, now: SimTime) {
///         println!("{now}: {} ended {:?}", report.id, report.state);
///     }
/// }
/// ```
pub trait EngineObserver {
    /// Called at the start of each round, before any model is solved.
    fn on_round_start(&mut self, _now: SimTime) {}

    /// Called at the end of each round.
    fn on_round_end(&mut self, _report: &RoundReport) {}

    /// An action entered the solver.
    fn on_action_started(&mut self, _report: &ActionReport, _now: SimTime) {}

    /// An action reached `Done`, `Failed` or `Cancelled`.
    fn on_action_finished(&mut self, _report: &ActionReport, _now: SimTime) {}

    /// An activity tried to start and could not.
    fn on_veto(&mut self, _report: &ActionReport, _reason: VetoReason, _now: SimTime) {}

    /// `action` can never start on its own: `predecessor` ended without
    /// completing.
    fn on_dependency_error(&mut self, _action: ActionId, _predecessor: ActionId, _now: SimTime) {}

    fn on_wait_resolved(&mut self, _wait: WaitId, _outcome: &WaitOutcome, _now: SimTime) {}

    fn on_timer(&mut self, _timer: TimerId, _now: SimTime) {}

    /// Called once when [`Engine::run`][crate::Engine::run] returns.
    fn on_sim_end(&mut self, _now: SimTime, _outcome: &RunOutcome) {}
}

/// An [`EngineObserver`] that does nothing.
pub struct NoopObserver;

impl EngineObserver for NoopObserver {}
