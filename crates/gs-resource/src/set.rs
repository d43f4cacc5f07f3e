//! `ModelSet` — every resource model of one simulation, bound to a sealed
//! platform.
//!
//! # Model layout
//!
//! | `ModelLayout` | Model 0           | Model 1   | Model 2 |
//! |---------------|-------------------|-----------|---------|
//! | `Separate`    | cpu               | network   | disk    |
//! | `Shared`      | host (cpu + link) | disk      |         |
//!
//! Each model owns one [`System`]; each resource owns one constraint in the
//! system of its model.  An action lives in exactly one model and its
//! variable only touches constraints of that model.
//!
//! # Binding actions to resources
//!
//! | Kind       | Elements (constraint × coefficient)               | Variable bound                 | Latency        |
//! |------------|---------------------------------------------------|--------------------------------|----------------|
//! | `Exec`     | host CPU × 1                                      | one core (`speed × scale`)     | —              |
//! | `Sleep`    | host CPU × 1, weight 0                            | —                              | —              |
//! | `Comm`     | route links × 1, reverse links × cross-traffic    | min link bw, rate, TCP window  | route latency  |
//! | `Io`       | disk × 1                                          | read or write bandwidth        | —              |
//! | `Parallel` | CPU `i` × `flops[i]`, links `i→j` × `bytes[i][j]` | rate                           | max route lat. |

use gs_core::{
    ActionId, EngineConfig, Failure, ModelId, ModelLayout, NetPointId, ResourceId, SimTime,
};
use gs_lmm::{SharingPolicy, System};
use gs_platform::{LinkSharing, Platform, ResourceSpec, Route, Router, ShortestPathRouter};
use tracing::{debug, trace};

use crate::action::{Action, ActionEvent, ActionKind, ActionReport, ActionState, IoOp, Target};
use crate::model::{Model, running_weight};
use crate::table::{ResourceState, ResourceTable};
use crate::{ResourceError, ResourceResult};

#[cfg(feature = "fx-hash")]
type Map<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(not(feature = "fx-hash"))]
type Map<K, V> = std::collections::HashMap<K, V>;

/// Constraints and rate limits an action needs, resolved at start.
struct Binding {
    elements:  Vec<(ResourceId, f64)>,
    /// Every resource whose failure fails the action.
    resources: Vec<ResourceId>,
    bound:     Option<f64>,
    latency:   f64,
}

/// All resource models of one simulation.
pub struct ModelSet<R: Router = ShortestPathRouter> {
    platform: Platform,
    router:   R,
    config:   EngineConfig,

    models: Vec<Model>,
    table:  ResourceTable,

    cpu_model:  ModelId,
    net_model:  ModelId,
    disk_model: ModelId,

    action_model: Map<ActionId, ModelId>,
    route_cache:  Map<(NetPointId, NetPointId), Route>,
}

impl<R: Router> ModelSet<R> {
    /// Create one model per layout slot and one constraint per resource.
    pub fn new(config: &EngineConfig, platform: Platform, router: R) -> ResourceResult<Self> {
        config.validate()?;
        let selective = config.effective_selective_update();
        let make_model = |id: u16, name: &'static str| {
            let system = System::new(config.maxmin_precision, selective)
                .with_concurrency_limit(config.concurrency_limit)
                .with_staging_policy(config.staging_policy);
            Model::new(
                ModelId(id),
                name,
                system,
                config.update_algorithm,
                config.maxmin_precision,
                config.timing_precision,
                config.max_duration_outcome,
            )
        };
        let (mut models, cpu_model, net_model, disk_model) = match config.layout {
            ModelLayout::Separate => (
                vec![make_model(0, "cpu"), make_model(1, "network"), make_model(2, "disk")],
                ModelId(0),
                ModelId(1),
                ModelId(2),
            ),
            ModelLayout::Shared => (
                vec![make_model(0, "host"), make_model(1, "disk")],
                ModelId(0),
                ModelId(0),
                ModelId(1),
            ),
        };

        let loopback = ResourceSpec::Link {
            bandwidth: config.loopback_bandwidth,
            latency:   config.loopback_latency,
            sharing:   LinkSharing::Fatpipe,
            peer:      None,
        };
        let loopback_id = ResourceId::try_from(platform.resource_count())
            .map_err(|_| ResourceError::Config("too many resources".into()))?;
        let specs = platform.resources().map(|(id, spec)| (id, *spec)).chain(std::iter::once((loopback_id, loopback)));

        let mut states = Vec::with_capacity(platform.resource_count() + 1);
        for (id, spec) in specs {
            let model = match spec {
                ResourceSpec::Cpu { .. }  => cpu_model,
                ResourceSpec::Link { .. } => net_model,
                ResourceSpec::Disk { .. } => disk_model,
            };
            let system = &mut models[model.index()].system;
            let constraint = system.constraint_new(id, spec.peak())?;
            if let ResourceSpec::Link { sharing: LinkSharing::Fatpipe, .. } = spec {
                system.set_sharing_policy(constraint, SharingPolicy::Fatpipe)?;
            }
            states.push(ResourceState { spec, model, constraint, scale: 1.0, on: true });
        }
        debug!(
            layout = ?config.layout,
            models = models.len(),
            resources = states.len(),
            update = ?config.update_algorithm,
            "resource models created"
        );

        Ok(Self {
            platform,
            router,
            config: config.clone(),
            models,
            table: ResourceTable::new(states, loopback_id),
            cpu_model,
            net_model,
            disk_model,
            action_model: Map::default(),
            route_cache: Map::default(),
        })
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    #[inline]
    pub fn router(&self) -> &R {
        &self.router
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.models.get(id.index())
    }

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        let model = self.action_model.get(&id)?;
        self.models[model.index()].action(id)
    }

    pub fn state(&self, id: ActionId) -> Option<ActionState> {
        self.action(id).map(Action::state)
    }

    /// Snapshot of `id` at `now` with its current rate.
    pub fn report(&self, id: ActionId, now: SimTime) -> Option<ActionReport> {
        let model = &self.models[self.action_model.get(&id)?.index()];
        Some(model.action(id)?.report(model.rate(id), now))
    }

    /// Number of actions known (any state).
    pub fn action_count(&self) -> usize {
        self.action_model.len()
    }

    /// Number of actions started and not terminated.
    pub fn started_count(&self) -> usize {
        self.models.iter().map(Model::started_count).sum()
    }

    /// Every started, non-terminal action, model by model.
    pub fn started(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.models.iter().flat_map(Model::started)
    }

    pub fn is_assigned(&self, id: ActionId) -> bool {
        self.action(id).is_some_and(|a| a.target.is_assigned())
    }

    // ── Creation and assignment ───────────────────────────────────────────

    /// Register an action in `Init` state.  It does not compete for anything
    /// until [`start`](Self::start).
    pub fn create(&mut self, id: ActionId, target: Target, amount: f64, now: SimTime) -> ResourceResult<()> {
        if self.action_model.contains_key(&id) {
            return Err(ResourceError::DuplicateAction(id));
        }
        if !(amount >= 0.0 && amount.is_finite()) {
            return Err(ResourceError::Config(format!("action amount must be >= 0 and finite, got {amount}")));
        }
        self.check_target(&target)?;
        let model = self.model_for(&target);
        self.models[model.index()].actions.insert(id, Action::new(id, model, target, amount, now));
        self.action_model.insert(id, model);
        trace!(action = %id, %model, amount, "action created");
        Ok(())
    }

    /// Replace the resource assignment of an action that has not started.
    /// The kind of work cannot change.
    pub fn assign(&mut self, id: ActionId, target: Target) -> ResourceResult<()> {
        self.check_target(&target)?;
        let action = self.action_mut(id)?;
        if action.state != ActionState::Init || action.kind() != target.kind() {
            return Err(ResourceError::InvalidState { action: id, state: action.state, op: "assign" });
        }
        action.target = target;
        Ok(())
    }

    fn check_target(&self, target: &Target) -> ResourceResult<()> {
        match target {
            Target::Comm { rate: Some(rate), .. } | Target::Parallel { rate: Some(rate), .. }
                if !(*rate > 0.0 && rate.is_finite()) =>
            {
                Err(ResourceError::Config(format!("rate must be positive and finite, got {rate}")))
            }
            Target::Parallel { hosts, flops, bytes, .. } => {
                let n = hosts.len();
                if flops.len() != n || !(bytes.is_empty() || bytes.len() == n * n) {
                    return Err(ResourceError::Config(format!(
                        "parallel task over {n} host(s) needs {n} flop amounts and 0 or {} byte amounts, got {} and {}",
                        n * n,
                        flops.len(),
                        bytes.len()
                    )));
                }
                if flops.iter().chain(bytes).any(|v| !(*v >= 0.0 && v.is_finite())) {
                    return Err(ResourceError::Config("parallel task amounts must be >= 0 and finite".into()));
                }
                if self.config.layout == ModelLayout::Separate && bytes.iter().any(|&b| b > 0.0) {
                    return Err(ResourceError::Config(
                        "parallel tasks with communications need the shared model layout".into(),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn model_for(&self, target: &Target) -> ModelId {
        match target.kind() {
            ActionKind::Exec | ActionKind::Sleep | ActionKind::Parallel => self.cpu_model,
            ActionKind::Comm => self.net_model,
            ActionKind::Io => self.disk_model,
        }
    }

    // ── Start ─────────────────────────────────────────────────────────────

    /// Bind an `Init` action to its resources and let it compete.
    ///
    /// A zero-amount action completes at `now` without a variable.  An
    /// action touching a resource that is off fails at `now`.
    pub fn start(&mut self, id: ActionId, now: SimTime, events: &mut Vec<ActionEvent>) -> ResourceResult<()> {
        let action = self.action(id).ok_or(ResourceError::UnknownAction(id))?;
        if action.state != ActionState::Init {
            return Err(ResourceError::InvalidState { action: id, state: action.state, op: "start" });
        }
        if !action.target.is_assigned() {
            return Err(ResourceError::Unassigned(id));
        }
        let (target, model_id, cost) = (action.target.clone(), action.model, action.cost);
        let binding = if cost > 0.0 { Some(self.bind(&target, model_id)?) } else { None };

        let model = &mut self.models[model_id.index()];
        let action = model.action_mut(id)?;
        action.start = Some(now);
        action.mark = now;
        action.state = ActionState::Running;
        model.started.insert(id);

        let Some(binding) = binding else {
            trace!(action = %id, %now, "zero-amount action completes at start");
            return model.terminate(id, now, ActionState::Done, None, events);
        };
        if let Some(&off) = binding.resources.iter().find(|&&r| self.table.get(r).is_some_and(|s| !s.on)) {
            return model.terminate(id, now, ActionState::Failed, Some(Failure::ResourceFailure { resource: off }), events);
        }

        let action = model.action_mut(id)?;
        action.resource_bound = binding.bound;
        action.resources = binding.resources;
        action.latency = binding.latency;
        if action.kind() == ActionKind::Sleep {
            action.max_duration = Some(cost);
        }
        let paying_latency = binding.latency > 0.0;
        if paying_latency {
            action.state = ActionState::Ready;
        }

        if !binding.elements.is_empty() {
            let weight = if paying_latency { 0.0 } else { running_weight(action) };
            let bound = action.bound().unwrap_or(-1.0);
            let var = model.system.variable_new(id, weight, bound)?;
            for &(resource, coef) in &binding.elements {
                let state = self.table.get(resource).ok_or(ResourceError::UnknownResource(resource))?;
                model.system.expand_add(state.constraint, var, coef)?;
            }
            model.action_mut(id)?.variable = Some(var);
        } else if !paying_latency {
            // Nothing to share and no latency: a transfer over an empty route.
            return model.terminate(id, now, ActionState::Done, None, events);
        }
        model.dirty.insert(id);
        debug!(action = %id, model = model.name, %now, latency = binding.latency, "action started");
        Ok(())
    }

    fn bind(&mut self, target: &Target, model: ModelId) -> ResourceResult<Binding> {
        let binding = match target {
            Target::Exec { host: Some(host) } => {
                let cpu = self.platform.cpu_of(*host)?;
                let state = self.resource_state(cpu)?;
                Binding {
                    elements:  vec![(cpu, 1.0)],
                    resources: vec![cpu],
                    bound:     Some(state.per_action_bound()),
                    latency:   0.0,
                }
            }
            Target::Sleep { host: Some(host) } => {
                let cpu = self.platform.cpu_of(*host)?;
                Binding { elements: vec![(cpu, 1.0)], resources: vec![cpu], bound: None, latency: 0.0 }
            }
            Target::Comm { src: Some(src), dst: Some(dst), rate } => self.bind_comm(*src, *dst, *rate)?,
            Target::Io { disk: Some(disk), op } => {
                let state = self.resource_state(*disk)?;
                let bound = io_bound(&state, *op)
                    .ok_or_else(|| ResourceError::Config(format!("resource {disk} is not a disk")))?;
                Binding {
                    elements:  vec![(*disk, 1.0)],
                    resources: vec![*disk],
                    bound:     Some(bound),
                    latency:   0.0,
                }
            }
            Target::Parallel { hosts, flops, bytes, rate } => self.bind_parallel(hosts, flops, bytes, *rate)?,
            _ => return Err(ResourceError::Config("action started without a complete assignment".into())),
        };
        for &(resource, _) in &binding.elements {
            if self.resource_state(resource)?.model != model {
                return Err(ResourceError::Config(format!(
                    "resource {resource} belongs to another model than the action"
                )));
            }
        }
        Ok(binding)
    }

    fn bind_comm(&mut self, src: NetPointId, dst: NetPointId, rate: Option<f64>) -> ResourceResult<Binding> {
        let route = self.route(src, dst)?;
        // Link bandwidth is left to the link constraints so that it follows
        // availability changes.
        let mut bound = rate;
        let mut elements: Vec<(ResourceId, f64)> = route.links.iter().map(|&link| (link, 1.0)).collect();
        if self.config.tcp_gamma > 0.0 && route.latency > 0.0 {
            let window = self.config.tcp_gamma / (2.0 * route.latency);
            bound = Some(bound.map_or(window, |b| b.min(window)));
        }
        let mut resources = route.links.clone();
        if self.config.crosstraffic && src != dst {
            let back = self.route(dst, src)?;
            for link in back.links {
                elements.push((link, self.config.crosstraffic_ratio));
                if !resources.contains(&link) {
                    resources.push(link);
                }
            }
        }
        Ok(Binding { elements, resources, bound, latency: route.latency })
    }

    fn bind_parallel(&mut self, hosts: &[NetPointId], flops: &[f64], bytes: &[f64], rate: Option<f64>) -> ResourceResult<Binding> {
        let n = hosts.len();
        let mut elements = Vec::new();
        let mut resources = Vec::with_capacity(n);
        let mut latency = 0.0f64;
        for (i, &host) in hosts.iter().enumerate() {
            let cpu = self.platform.cpu_of(host)?;
            if flops[i] > 0.0 {
                elements.push((cpu, flops[i]));
            }
            if !resources.contains(&cpu) {
                resources.push(cpu);
            }
        }
        for i in 0..n {
            for j in 0..n {
                let amount = bytes.get(i * n + j).copied().unwrap_or(0.0);
                if amount <= 0.0 {
                    continue;
                }
                let route = self.route(hosts[i], hosts[j])?;
                latency = latency.max(route.latency);
                for link in route.links {
                    elements.push((link, amount));
                    if !resources.contains(&link) {
                        resources.push(link);
                    }
                }
            }
        }
        Ok(Binding { elements, resources, bound: rate, latency })
    }

    /// Route between two hosts; the loopback link for same-host transfers.
    fn route(&mut self, src: NetPointId, dst: NetPointId) -> ResourceResult<Route> {
        if src == dst && self.platform.explicit_route(src, dst).is_none() {
            let loopback = self.table.loopback();
            return Ok(Route { links: vec![loopback], latency: self.config.loopback_latency });
        }
        if let Some(route) = self.route_cache.get(&(src, dst)) {
            return Ok(route.clone());
        }
        let route = self.platform.route(&self.router, src, dst)?;
        self.route_cache.insert((src, dst), route.clone());
        Ok(route)
    }

    // ── Action control ────────────────────────────────────────────────────

    /// Cancel a started action.  Returns `false` (and changes nothing) for
    /// an action that never started or already ended.
    pub fn cancel(&mut self, id: ActionId, now: SimTime, events: &mut Vec<ActionEvent>) -> ResourceResult<bool> {
        let model = self.model_of(id)?;
        let state = model.action_mut(id)?.state;
        if !state.is_active() {
            trace!(action = %id, ?state, "cancel ignored");
            return Ok(false);
        }
        model.terminate(id, now, ActionState::Cancelled, Some(Failure::Cancelled), events)?;
        Ok(true)
    }

    /// Freeze a started action: no progress, no latency, no max-duration
    /// countdown.  Suspending a suspended action does nothing.
    pub fn suspend(&mut self, id: ActionId, now: SimTime) -> ResourceResult<()> {
        let model = self.model_of(id)?;
        match model.action_mut(id)?.state {
            ActionState::Ready | ActionState::Running => {}
            ActionState::Suspended => return Ok(()),
            state => return Err(ResourceError::InvalidState { action: id, state, op: "suspend" }),
        }
        let precision = model.remains_precision();
        let action = model.action_mut(id)?;
        action.integrate(now, precision);
        action.state = ActionState::Suspended;
        action.last_value = 0.0;
        let var = action.variable;
        if let Some(var) = var {
            model.system.update_variable_weight(var, 0.0)?;
        }
        model.heap.remove(id);
        model.dirty.remove(&id);
        trace!(action = %id, %now, "action suspended");
        Ok(())
    }

    /// Undo [`suspend`](Self::suspend).  Resuming a running action does
    /// nothing.
    pub fn resume(&mut self, id: ActionId, now: SimTime) -> ResourceResult<()> {
        let model = self.model_of(id)?;
        let action = model.action_mut(id)?;
        match action.state {
            ActionState::Suspended => {}
            ActionState::Ready | ActionState::Running => return Ok(()),
            state => return Err(ResourceError::InvalidState { action: id, state, op: "resume" }),
        }
        action.mark = now;
        action.state = if action.latency > 0.0 { ActionState::Ready } else { ActionState::Running };
        let weight = if action.state == ActionState::Running { running_weight(action) } else { 0.0 };
        let var = action.variable;
        if let Some(var) = var {
            model.system.update_variable_weight(var, weight)?;
        }
        model.dirty.insert(id);
        trace!(action = %id, %now, "action resumed");
        Ok(())
    }

    /// Set the sharing priority: the solver weight becomes `1 / priority`.
    pub fn set_priority(&mut self, id: ActionId, priority: f64) -> ResourceResult<()> {
        if !(priority > 0.0 && priority.is_finite()) {
            return Err(ResourceError::Config(format!("priority must be positive and finite, got {priority}")));
        }
        let model = self.model_of(id)?;
        let action = model.action_mut(id)?;
        action.sharing_penalty = 1.0 / priority;
        let running = action.state == ActionState::Running;
        let (var, weight) = (action.variable, running_weight(action));
        if let (true, Some(var)) = (running, var) {
            model.system.update_variable_weight(var, weight)?;
        }
        model.dirty.insert(id);
        Ok(())
    }

    /// Cap the action's rate.  `None` removes the cap.
    pub fn set_bound(&mut self, id: ActionId, bound: Option<f64>) -> ResourceResult<()> {
        if let Some(b) = bound
            && !(b > 0.0 && b.is_finite())
        {
            return Err(ResourceError::Config(format!("action bound must be positive and finite, got {b}")));
        }
        let model = self.model_of(id)?;
        let action = model.action_mut(id)?;
        action.user_bound = bound;
        let (var, effective) = (action.variable, action.bound().unwrap_or(-1.0));
        if let Some(var) = var {
            model.system.update_variable_bound(var, effective)?;
        }
        model.dirty.insert(id);
        Ok(())
    }

    /// Limit the time the action may spend Ready or Running.  `None` lifts
    /// the limit.
    pub fn set_max_duration(&mut self, id: ActionId, max_duration: Option<f64>, now: SimTime) -> ResourceResult<()> {
        if let Some(d) = max_duration
            && !(d >= 0.0 && d.is_finite())
        {
            return Err(ResourceError::Config(format!("max duration must be >= 0 and finite, got {d}")));
        }
        let model = self.model_of(id)?;
        let precision = model.remains_precision();
        let action = model.action_mut(id)?;
        if action.state.is_terminal() {
            return Err(ResourceError::InvalidState { action: id, state: action.state, op: "set_max_duration" });
        }
        action.integrate(now, precision);
        action.max_duration = max_duration;
        model.dirty.insert(id);
        Ok(())
    }

    /// Drop a terminal or never-started action.
    pub fn remove(&mut self, id: ActionId) -> ResourceResult<Action> {
        let action = self.model_of(id)?.remove(id)?;
        self.action_model.remove(&id);
        Ok(action)
    }

    // ── Resource control ──────────────────────────────────────────────────

    /// Turn a resource off: its capacity drops to zero and every action
    /// using it fails at `now`.  Returns the failed actions.
    pub fn turn_off(&mut self, resource: ResourceId, now: SimTime, events: &mut Vec<ActionEvent>) -> ResourceResult<Vec<ActionId>> {
        let state = self.resource_state(resource)?;
        if !state.on {
            return Ok(Vec::new());
        }
        let (model_id, constraint) = (state.model, state.constraint);
        if let Some(s) = self.table.get_mut(resource) {
            s.on = false;
        }
        self.models[model_id.index()].system.update_constraint_bound(constraint, 0.0)?;

        let mut failed = Vec::new();
        for model in &mut self.models {
            let victims: Vec<ActionId> = model
                .started
                .iter()
                .copied()
                .filter(|id| model.actions.get(id).is_some_and(|a| a.resources.contains(&resource)))
                .collect();
            for id in victims {
                model.terminate(id, now, ActionState::Failed, Some(Failure::ResourceFailure { resource }), events)?;
                failed.push(id);
            }
        }
        debug!(%resource, %now, failed = failed.len(), "resource turned off");
        Ok(failed)
    }

    /// Turn a resource back on.  Actions that failed stay failed.
    pub fn turn_on(&mut self, resource: ResourceId) -> ResourceResult<()> {
        let state = self.resource_state(resource)?;
        if state.on {
            return Ok(());
        }
        let (model_id, constraint) = (state.model, state.constraint);
        let s = self.table.get_mut(resource).ok_or(ResourceError::UnknownResource(resource))?;
        s.on = true;
        let capacity = s.capacity();
        self.models[model_id.index()].system.update_constraint_bound(constraint, capacity)?;
        debug!(%resource, capacity, "resource turned on");
        Ok(())
    }

    /// Scale a resource's capacity (`1.0` is the platform peak).  Running
    /// executions on a CPU get their one-core bound rescaled too, and so do
    /// reads and writes on a disk.
    pub fn set_availability(&mut self, resource: ResourceId, scale: f64) -> ResourceResult<()> {
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(ResourceError::Config(format!("availability scale must be positive and finite, got {scale}")));
        }
        let s = self.table.get_mut(resource).ok_or(ResourceError::UnknownResource(resource))?;
        s.scale = scale;
        let state = *s;
        let model = &mut self.models[state.model.index()];
        if state.on {
            model.system.update_constraint_bound(state.constraint, state.capacity())?;
        }
        let rebound: Vec<(ActionId, f64)> = model
            .started
            .iter()
            .filter_map(|id| {
                let action = model.actions.get(id)?;
                match (&action.target, state.spec) {
                    (Target::Exec { .. }, ResourceSpec::Cpu { .. }) if action.resources == [resource] => {
                        Some((*id, state.per_action_bound()))
                    }
                    (Target::Io { disk: Some(disk), op }, ResourceSpec::Disk { .. }) if *disk == resource => {
                        io_bound(&state, *op).map(|bound| (*id, bound))
                    }
                    _ => None,
                }
            })
            .collect();
        for (id, resource_bound) in rebound {
            let action = model.action_mut(id)?;
            action.resource_bound = Some(resource_bound);
            let (var, bound) = (action.variable, action.bound().unwrap_or(-1.0));
            if let Some(var) = var {
                model.system.update_variable_bound(var, bound)?;
            }
            model.dirty.insert(id);
        }
        trace!(%resource, scale, "availability changed");
        Ok(())
    }

    // ── Loop hooks ────────────────────────────────────────────────────────

    /// Solve every model and return the earliest predicted event date.
    ///
    /// With the `parallel` feature the models are solved on Rayon's thread
    /// pool; the minimum is taken in model order either way.
    pub fn next_event(&mut self, now: SimTime) -> ResourceResult<Option<SimTime>> {
        #[cfg(not(feature = "parallel"))]
        let dates: Vec<ResourceResult<Option<SimTime>>> =
            self.models.iter_mut().map(|m| m.next_occurring_event(now)).collect();

        #[cfg(feature = "parallel")]
        let dates: Vec<ResourceResult<Option<SimTime>>> = {
            use rayon::prelude::*;
            self.models.par_iter_mut().map(|m| m.next_occurring_event(now)).collect()
        };

        let mut min: Option<SimTime> = None;
        for date in dates {
            if let Some(d) = date? {
                min = Some(min.map_or(d, |m: SimTime| m.min(d)));
            }
        }
        Ok(min)
    }

    /// Advance every model to `now`.  Terminal transitions are appended to
    /// `events` in action creation order.
    pub fn update(&mut self, now: SimTime, events: &mut Vec<ActionEvent>) -> ResourceResult<()> {
        let first = events.len();
        for model in &mut self.models {
            model.update_actions_state(now, events)?;
        }
        events[first..].sort_by_key(|e| e.action);
        Ok(())
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn model_of(&mut self, id: ActionId) -> ResourceResult<&mut Model> {
        let model = *self.action_model.get(&id).ok_or(ResourceError::UnknownAction(id))?;
        Ok(&mut self.models[model.index()])
    }

    fn action_mut(&mut self, id: ActionId) -> ResourceResult<&mut Action> {
        self.model_of(id)?.action_mut(id)
    }

    fn resource_state(&self, id: ResourceId) -> ResourceResult<ResourceState> {
        self.table.get(id).copied().ok_or(ResourceError::UnknownResource(id))
    }
}

/// Per-action rate cap of a read or write; `None` if `state` is not a disk.
fn io_bound(state: &ResourceState, op: IoOp) -> Option<f64> {
    let ResourceSpec::Disk { read_bw, write_bw, .. } = state.spec else {
        return None;
    };
    let bw = match op {
        IoOp::Read  => read_bw,
        IoOp::Write => write_bw,
    };
    Some(bw * state.scale)
}
