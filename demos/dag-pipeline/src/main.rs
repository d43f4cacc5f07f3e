//! dag-pipeline — a small map/reduce task graph.
//!
//! ```text
//!   ingest (disk read on w0) → split (w0) → map ×4 (placed late) → reduce (w0) → publish (w0 → w1)
//! ```
//!
//! The map tasks are created without a host.  With `stop_on_veto` the run
//! hands them back for placement as soon as `split` completes; each goes to
//! the least loaded worker.  Worker `w2` fails halfway through its map: the
//! reduce task is reported as blocked, a replacement map is wired in on a
//! surviving worker and the run resumes.
//!
//! Log level through `RUST_LOG`.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gs_activity::VetoReason;
use gs_core::{ActionId, EngineConfig, NetPointId, ResourceId, SimTime};
use gs_engine::{Engine, EngineBuilder, EngineObserver, RunOutcome};
use gs_platform::{LinkSharing, Platform, PlatformBuilder};
use gs_resource::{ActionReport, ActionState, Target};

// ── Constants ─────────────────────────────────────────────────────────────────

const WORKERS:      usize = 3;
const CORE_SPEED:   f64   = 1e9;
const CORES:        u32   = 2;
const MAP_TASKS:    usize = 4;
const MAP_FLOPS:    f64   = 2e9;
const INPUT_BYTES:  f64   = 2e8;
const OUTPUT_BYTES: f64   = 5e7;
/// `w2` goes down at this date, halfway through its map task.
const FAILURE_AT:   f64   = 4.0;

// ── Platform ──────────────────────────────────────────────────────────────────

struct Cluster {
    platform: Platform,
    workers:  Vec<NetPointId>,
    disks:    Vec<ResourceId>,
}

/// Star of workers around one switch, one disk per worker.
fn cluster() -> Result<Cluster> {
    let mut b = PlatformBuilder::new();
    let switch = b.add_router("switch")?;
    let mut workers = Vec::with_capacity(WORKERS);
    let mut disks = Vec::with_capacity(WORKERS);
    for i in 0..WORKERS {
        let host = b.add_host(&format!("w{i}"), CORE_SPEED, CORES)?;
        let link = b.add_link(&format!("w{i}-eth"), 1.25e8, 5e-5, LinkSharing::SplitDuplex)?;
        b.connect(link, host, switch)?;
        disks.push(b.add_disk(host, &format!("w{i}-ssd"), 1e8, 5e7)?);
        workers.push(host);
    }
    Ok(Cluster { platform: b.build()?, workers, disks })
}

// ── Observer ──────────────────────────────────────────────────────────────────

/// Names the tasks in the log and keeps one Gantt row per finished task.
#[derive(Default)]
struct Gantt {
    names: BTreeMap<ActionId, String>,
    rows:  Vec<(ActionId, ActionState, f64, f64)>,
}

impl Gantt {
    fn name(&self, id: ActionId) -> &str {
        self.names.get(&id).map_or("?", String::as_str)
    }
}

impl EngineObserver for Gantt {
    fn on_action_started(&mut self, report: &ActionReport, now: SimTime) {
        info!(task = self.name(report.id), %now, "started");
    }

    fn on_action_finished(&mut self, report: &ActionReport, now: SimTime) {
        let start = report.start.map_or(now.secs(), SimTime::secs);
        self.rows.push((report.id, report.state, start, now.secs()));
        match &report.failure {
            None => info!(task = self.name(report.id), %now, "done"),
            Some(failure) => warn!(task = self.name(report.id), %now, %failure, left = report.remaining_ratio(), "failed"),
        }
    }

    fn on_veto(&mut self, report: &ActionReport, reason: VetoReason, now: SimTime) {
        info!(task = self.name(report.id), ?reason, %now, "vetoed");
    }

    fn on_dependency_error(&mut self, action: ActionId, predecessor: ActionId, now: SimTime) {
        warn!(task = self.name(action), predecessor = self.name(predecessor), %now, "blocked by a failed predecessor");
    }
}

// ── Placement ─────────────────────────────────────────────────────────────────

/// Put every task waiting for a host on the worker with the fewest tasks so
/// far.  Turned-off workers are skipped.
fn place(
    engine:  &mut Engine,
    tasks:   &[ActionId],
    workers: &[NetPointId],
    load:    &mut BTreeMap<NetPointId, usize>,
) -> Result<()> {
    for &task in tasks {
        let host = workers
            .iter()
            .copied()
            .filter(|&w| is_up(engine, w))
            .min_by_key(|w| load.get(w).copied().unwrap_or(0))
            .context("no worker left")?;
        *load.entry(host).or_default() += 1;
        info!(%task, host = %engine.platform().netpoint(host)?.name, "placed");
        engine.assign(task, Target::exec(host))?;
    }
    Ok(())
}

fn is_up(engine: &Engine, host: NetPointId) -> bool {
    engine
        .platform()
        .cpu_of(host)
        .ok()
        .and_then(|cpu| engine.models().table().get(cpu))
        .is_some_and(|state| state.on)
}

/// Replace every failed predecessor of a blocked task by a fresh copy on a
/// live worker.
fn recover(engine: &mut Engine, gantt: &mut Gantt, blocked: &[ActionId], workers: &[NetPointId]) -> Result<usize> {
    let mut replaced = 0;
    for &task in blocked {
        let failed: Vec<ActionId> = engine.blocked_by(task).collect();
        for pred in failed {
            let cost = engine.report(pred).context("failed task vanished")?.cost;
            let host = workers
                .iter()
                .copied()
                .find(|&w| is_up(engine, w))
                .context("no worker left")?;
            let copy = engine.execute(host, cost)?;
            let name = format!("{} (retry)", gantt.name(pred));
            gantt.names.insert(copy, name);
            // Wire the copy in before dropping the failed edge, or the task
            // would start without it.
            engine.add_successor(copy, task)?;
            engine.remove_successor(pred, task)?;
            engine.start(copy)?;
            replaced += 1;
        }
    }
    Ok(replaced)
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Cluster { platform, workers, disks } = cluster()?;
    let config = EngineConfig { stop_on_veto: true, ..Default::default() };
    let mut engine = EngineBuilder::new(platform).config(config).build()?;
    let mut gantt = Gantt::default();

    // ── Build the graph ───────────────────────────────────────────────────
    let ingest = engine.read(disks[0], INPUT_BYTES)?;
    let split = engine.execute(workers[0], 1e9)?;
    let maps: Vec<ActionId> = (0..MAP_TASKS)
        .map(|_| engine.create(Target::Exec { host: None }, MAP_FLOPS))
        .collect::<Result<_, _>>()?;
    let reduce = engine.execute(workers[0], 5e8)?;
    let publish = engine.communicate(workers[0], workers[1], OUTPUT_BYTES)?;

    gantt.names.insert(ingest, "ingest".into());
    gantt.names.insert(split, "split".into());
    for (i, &m) in maps.iter().enumerate() {
        gantt.names.insert(m, format!("map{i}"));
    }
    gantt.names.insert(reduce, "reduce".into());
    gantt.names.insert(publish, "publish".into());

    engine.add_successor(ingest, split)?;
    for &m in &maps {
        engine.add_successor(split, m)?;
        engine.add_successor(m, reduce)?;
    }
    engine.add_successor(reduce, publish)?;

    for task in [ingest, split, reduce, publish].into_iter().chain(maps.iter().copied()) {
        engine.start(task)?;
    }
    let cpu2 = engine.platform().cpu_of(workers[2])?;
    engine.schedule_turn_off(cpu2, SimTime::new(FAILURE_AT))?;
    let done = engine.wait(publish)?;

    // ── Run, placing and recovering as needed ─────────────────────────────
    let mut load = BTreeMap::new();
    loop {
        match engine.run(&mut gantt)? {
            RunOutcome::Completed => break,
            RunOutcome::NeedsAssignment(tasks) => place(&mut engine, &tasks, &workers, &mut load)?,
            RunOutcome::Stalled(stuck) => {
                if recover(&mut engine, &mut gantt, &stuck, &workers)? == 0 {
                    bail!("pipeline stalled on {stuck:?}");
                }
            }
            RunOutcome::DeadlineReached => bail!("run stopped at a deadline it was never given"),
        }
    }

    let outcome = engine.wait_outcome(done)?.context("publish never ended")?;
    println!();
    println!("{:<14} {:<10} {:>8} {:>8}", "task", "state", "start", "end");
    for &(id, state, start, end) in &gantt.rows {
        println!("{:<14} {:<10} {:>8.3} {:>8.3}", gantt.name(id), format!("{state:?}"), start, end);
    }
    println!();
    println!("publish:   {outcome:?}");
    println!("makespan:  {}", engine.now());
    println!("rounds:    {}", engine.rounds());
    Ok(())
}
