//! Actions: units of simulated work.
//!
//! # Life cycle
//!
//! ```text
//!            start            latency paid
//!   Init ──────────▶ Ready ───────────────▶ Running ──▶ Done
//!                      │  ▲                  │  ▲
//!              suspend │  │ resume   suspend │  │ resume
//!                      ▼  │                  ▼  │
//!                    Suspended ◀─────────────┘  │
//!                                               │
//!   any non-terminal started state ──▶ Failed | Cancelled
//! ```
//!
//! Actions without latency skip `Ready`.  `Init` actions have no variable
//! yet; the variable is created on start and freed on the terminal
//! transition.

use gs_core::{ActionId, Failure, ModelId, NetPointId, ResourceId, SimTime, VariableId, double_update};

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionState {
    /// Created, not started.  Not in any solver.
    Init,
    /// Paying its latency; the variable is disabled.
    Ready,
    /// Competing for resources.
    Running,
    /// Frozen: no progress, no latency, no max-duration countdown.
    Suspended,
    Done,
    Failed,
    Cancelled,
}

impl ActionState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionState::Done | ActionState::Failed | ActionState::Cancelled)
    }

    /// Started and not terminal.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, ActionState::Ready | ActionState::Running | ActionState::Suspended)
    }
}

// ── Target ────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IoOp {
    Read,
    Write,
}

/// What an action runs on.  `None` fields are not assigned yet; an action
/// can only start once every field is set.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Target {
    /// Compute `amount` flops on one core of `host`.
    Exec { host: Option<NetPointId> },
    /// Do nothing on `host` for `amount` seconds.
    Sleep { host: Option<NetPointId> },
    /// Transfer `amount` bytes, optionally capped at `rate` bytes/s.
    Comm { src: Option<NetPointId>, dst: Option<NetPointId>, rate: Option<f64> },
    /// Read or write `amount` bytes.
    Io { disk: Option<ResourceId>, op: IoOp },
    /// Parallel task over `hosts`: `flops[i]` on host `i` and
    /// `bytes[i * n + j]` from host `i` to host `j`.  `bytes` may be empty.
    Parallel { hosts: Vec<NetPointId>, flops: Vec<f64>, bytes: Vec<f64>, rate: Option<f64> },
}

impl Target {
    pub fn exec(host: NetPointId) -> Self {
        Target::Exec { host: Some(host) }
    }

    pub fn sleep(host: NetPointId) -> Self {
        Target::Sleep { host: Some(host) }
    }

    pub fn comm(src: NetPointId, dst: NetPointId) -> Self {
        Target::Comm { src: Some(src), dst: Some(dst), rate: None }
    }

    pub fn io(disk: ResourceId, op: IoOp) -> Self {
        Target::Io { disk: Some(disk), op }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Target::Exec { .. }     => ActionKind::Exec,
            Target::Sleep { .. }    => ActionKind::Sleep,
            Target::Comm { .. }     => ActionKind::Comm,
            Target::Io { .. }       => ActionKind::Io,
            Target::Parallel { .. } => ActionKind::Parallel,
        }
    }

    /// Every resource slot is filled.
    pub fn is_assigned(&self) -> bool {
        match self {
            Target::Exec { host } | Target::Sleep { host } => host.is_some(),
            Target::Comm { src, dst, .. } => src.is_some() && dst.is_some(),
            Target::Io { disk, .. } => disk.is_some(),
            Target::Parallel { hosts, .. } => !hosts.is_empty(),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionKind {
    Exec,
    Sleep,
    Comm,
    Io,
    Parallel,
}

// ── Action ────────────────────────────────────────────────────────────────────

/// One unit of simulated work, owned by the model that runs it.
#[derive(Clone, Debug)]
pub struct Action {
    pub(crate) id:     ActionId,
    pub(crate) model:  ModelId,
    pub(crate) target: Target,
    pub(crate) state:  ActionState,

    pub(crate) cost:      f64,
    pub(crate) remaining: f64,
    /// Solver weight while running: `1 / priority`.
    pub(crate) sharing_penalty: f64,
    pub(crate) user_bound:      Option<f64>,
    /// Rate cap derived from the resources (one core, min link bandwidth…).
    pub(crate) resource_bound:  Option<f64>,

    pub(crate) created: SimTime,
    pub(crate) start:   Option<SimTime>,
    pub(crate) finish:  Option<SimTime>,

    // ── Time accounting ───────────────────────────────────────────────────
    /// Latency still to pay before the variable is enabled.
    pub(crate) latency:      f64,
    pub(crate) max_duration: Option<f64>,
    /// Time spent Ready or Running, for `max_duration`.
    pub(crate) active_time:  f64,
    /// Date up to which `remaining`, `latency` and `active_time` are exact.
    pub(crate) mark:         SimTime,
    /// Rate in force since `mark`.
    pub(crate) last_value:   f64,

    pub(crate) variable:  Option<VariableId>,
    /// Resources whose failure fails this action.
    pub(crate) resources: Vec<ResourceId>,
    pub(crate) failure:   Option<Failure>,
}

impl Action {
    pub(crate) fn new(id: ActionId, model: ModelId, target: Target, amount: f64, now: SimTime) -> Self {
        Self {
            id,
            model,
            target,
            state:           ActionState::Init,
            cost:            amount,
            remaining:       amount,
            sharing_penalty: 1.0,
            user_bound:      None,
            resource_bound:  None,
            created:         now,
            start:           None,
            finish:          None,
            latency:         0.0,
            max_duration:    None,
            active_time:     0.0,
            mark:            now,
            last_value:      0.0,
            variable:        None,
            resources:       Vec::new(),
            failure:         None,
        }
    }

    #[inline]
    pub fn id(&self) -> ActionId {
        self.id
    }

    #[inline]
    pub fn model(&self) -> ModelId {
        self.model
    }

    #[inline]
    pub fn state(&self) -> ActionState {
        self.state
    }

    #[inline]
    pub fn target(&self) -> &Target {
        &self.target
    }

    #[inline]
    pub fn kind(&self) -> ActionKind {
        self.target.kind()
    }

    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Work left as of the last update.
    #[inline]
    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn priority(&self) -> f64 {
        1.0 / self.sharing_penalty
    }

    #[inline]
    pub fn variable(&self) -> Option<VariableId> {
        self.variable
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Effective rate cap: the tighter of the resource and user bounds.
    pub(crate) fn bound(&self) -> Option<f64> {
        match (self.resource_bound, self.user_bound) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Max-duration still to run, if any.
    pub(crate) fn max_duration_left(&self) -> Option<f64> {
        self.max_duration.map(|d| (d - self.active_time).max(0.0))
    }

    /// Bring the time accounting up to `now` at the rate in force since
    /// `mark`.
    pub(crate) fn integrate(&mut self, now: SimTime, precision: f64) {
        let dt = now.since(self.mark);
        if dt <= 0.0 {
            return;
        }
        match self.state {
            ActionState::Ready => {
                double_update(&mut self.latency, dt, precision);
                self.active_time += dt;
            }
            ActionState::Running => {
                double_update(&mut self.remaining, self.last_value * dt, precision);
                self.active_time += dt;
            }
            _ => {}
        }
        self.mark = now;
    }

    /// Snapshot at `now`, projecting progress made since `mark` at the rate
    /// in force.  The action itself is not touched.
    pub(crate) fn report(&self, rate: f64, now: SimTime) -> ActionReport {
        let mut projected = self.clone();
        projected.integrate(now, 0.0);
        projected.snapshot(rate)
    }

    fn snapshot(&self, rate: f64) -> ActionReport {
        ActionReport {
            id:           self.id,
            kind:         self.kind(),
            state:        self.state,
            cost:         self.cost,
            remaining:    match self.kind() {
                ActionKind::Sleep => self.max_duration_left().unwrap_or(0.0),
                _ => self.remaining,
            },
            rate,
            priority:     self.priority(),
            created:      self.created,
            start:        self.start,
            finish:       self.finish,
            max_duration: self.max_duration,
            failure:      self.failure.clone(),
        }
    }
}

// ── Snapshots and events ──────────────────────────────────────────────────────

/// Read-only snapshot of an action, for observers and callers.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionReport {
    pub id:           ActionId,
    pub kind:         ActionKind,
    pub state:        ActionState,
    pub cost:         f64,
    /// Work left.  Sleeps report the time left.
    pub remaining:    f64,
    /// Current solved rate.
    pub rate:         f64,
    pub priority:     f64,
    pub created:      SimTime,
    pub start:        Option<SimTime>,
    pub finish:       Option<SimTime>,
    pub max_duration: Option<f64>,
    pub failure:      Option<Failure>,
}

impl ActionReport {
    /// Fraction of the work left, in `[0, 1]`.  Zero-cost actions report 0.
    pub fn remaining_ratio(&self) -> f64 {
        if self.cost > 0.0 { (self.remaining / self.cost).clamp(0.0, 1.0) } else { 0.0 }
    }
}

/// A terminal transition, reported once.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionEvent {
    pub action:  ActionId,
    pub date:    SimTime,
    /// `None` for `Done`.
    pub failure: Option<Failure>,
}
