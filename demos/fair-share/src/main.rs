//! fair-share — random flows over a dumbbell network.
//!
//! ```text
//!   L0 ─┐                         ┌─ R0
//!   L1 ─┼─ left ══ backbone ══ right ─┼─ R1
//!   ..  ┘                         └─ ..
//! ```
//!
//! Every flow crosses its access link, the shared backbone and the
//! destination's access link.  Some flows start at date zero, the others wake
//! up on a timer.  At the end the per-flow throughputs are printed with their
//! Jain fairness index.
//!
//! Usage: `fair-share [config.json]`, log level through `RUST_LOG`.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use gs_core::{ActionId, EngineConfig, NetPointId, SimTime, TimerId};
use gs_engine::{EngineBuilder, EngineObserver, RoundReport, RunOutcome};
use gs_platform::{LinkSharing, Platform, PlatformBuilder};
use gs_resource::{ActionReport, ActionState};

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DemoConfig {
    seed:               u64,
    hosts_per_side:     usize,
    flows:              usize,
    /// Bytes per flow are drawn uniformly from this range.
    min_bytes:          f64,
    max_bytes:          f64,
    /// Share of flows that wait for a timer before starting.
    late_fraction:      f64,
    late_window:        f64,
    access_bandwidth:   f64,
    access_latency:     f64,
    backbone_bandwidth: f64,
    backbone_latency:   f64,
    engine:             EngineConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed:               42,
            hosts_per_side:     4,
            flows:              16,
            min_bytes:          1e6,
            max_bytes:          1e7,
            late_fraction:      0.25,
            late_window:        0.5,
            access_bandwidth:   1.25e7,
            access_latency:     1e-4,
            backbone_bandwidth: 2.5e7,
            backbone_latency:   5e-3,
            engine:             EngineConfig::default(),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<DemoConfig> {
    let Some(path) = path else {
        return Ok(DemoConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: DemoConfig = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    if config.hosts_per_side == 0 || config.flows == 0 {
        bail!("hosts_per_side and flows must be at least 1");
    }
    if !(config.min_bytes > 0.0 && config.min_bytes <= config.max_bytes) {
        bail!("need 0 < min_bytes <= max_bytes");
    }
    Ok(config)
}

// ── Platform ──────────────────────────────────────────────────────────────────

struct Dumbbell {
    platform: Platform,
    left:     Vec<NetPointId>,
    right:    Vec<NetPointId>,
}

fn dumbbell(config: &DemoConfig) -> Result<Dumbbell> {
    let mut b = PlatformBuilder::new();
    let left_router = b.add_router("left")?;
    let right_router = b.add_router("right")?;
    let backbone = b.add_link("backbone", config.backbone_bandwidth, config.backbone_latency, LinkSharing::Shared)?;
    b.connect(backbone, left_router, right_router)?;

    let mut side = |prefix: &str, router: NetPointId| -> Result<Vec<NetPointId>> {
        (0..config.hosts_per_side)
            .map(|i| -> Result<NetPointId> {
                let host = b.add_host(&format!("{prefix}{i}"), 1e9, 1)?;
                let link = b.add_link(
                    &format!("{prefix}{i}-access"),
                    config.access_bandwidth,
                    config.access_latency,
                    LinkSharing::SplitDuplex,
                )?;
                b.connect(link, host, router)?;
                Ok(host)
            })
            .collect()
    };
    let left = side("L", left_router)?;
    let right = side("R", right_router)?;
    Ok(Dumbbell { platform: b.build()?, left, right })
}

// ── Flows ─────────────────────────────────────────────────────────────────────

struct Flow {
    src:   NetPointId,
    dst:   NetPointId,
    bytes: f64,
    /// Date the flow is started; zero for flows started up front.
    start: f64,
}

fn draw_flows(config: &DemoConfig, net: &Dumbbell) -> Vec<Flow> {
    let mut rng = SmallRng::seed_from_u64(config.seed);
    (0..config.flows)
        .map(|_| {
            let src = net.left[rng.gen_range(0..net.left.len())];
            let dst = net.right[rng.gen_range(0..net.right.len())];
            let bytes = rng.gen_range(config.min_bytes..=config.max_bytes);
            let start = if rng.gen_bool(config.late_fraction.clamp(0.0, 1.0)) {
                rng.gen_range(0.0..=config.late_window)
            } else {
                0.0
            };
            Flow { src, dst, bytes, start }
        })
        .collect()
}

// ── Observer ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FlowLog {
    rounds:   u64,
    finished: usize,
    failed:   usize,
}

impl EngineObserver for FlowLog {
    fn on_action_started(&mut self, report: &ActionReport, now: SimTime) {
        debug!(flow = %report.id, bytes = report.cost, %now, "flow started");
    }

    fn on_action_finished(&mut self, report: &ActionReport, now: SimTime) {
        match report.state {
            ActionState::Done => self.finished += 1,
            _ => self.failed += 1,
        }
        info!(flow = %report.id, state = ?report.state, %now, "flow ended");
    }

    fn on_round_end(&mut self, report: &RoundReport) {
        self.rounds += 1;
        debug!(date = %report.date, finished = report.finished.len(), "round");
    }
}

/// Jain's index: 1 when every flow gets the same throughput, 1/n at worst.
fn jain_index(values: &[f64]) -> f64 {
    let sum: f64 = values.iter().sum();
    let squares: f64 = values.iter().map(|v| v * v).sum();
    if squares == 0.0 { 0.0 } else { sum * sum / (values.len() as f64 * squares) }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args().nth(1);
    let config = load_config(path.as_deref().map(Path::new))?;
    debug!(engine = %serde_json::to_string(&config.engine)?, "engine configuration");

    let net = dumbbell(&config)?;
    let flows = draw_flows(&config, &net);
    let mut engine = EngineBuilder::new(net.platform).config(config.engine.clone()).build()?;

    let mut ids: Vec<ActionId> = Vec::with_capacity(flows.len());
    let mut wakeups: BTreeMap<TimerId, ActionId> = BTreeMap::new();
    for flow in &flows {
        let id = engine.communicate(flow.src, flow.dst, flow.bytes)?;
        if flow.start > 0.0 {
            wakeups.insert(engine.set_timer(SimTime::new(flow.start))?, id);
        } else {
            engine.start(id)?;
        }
        ids.push(id);
    }
    info!(flows = ids.len(), late = wakeups.len(), "flows created");

    let wall = Instant::now();
    let mut log = FlowLog::default();
    while let Some(report) = engine.step(None, &mut log)? {
        for timer in &report.timers {
            if let Some(&id) = wakeups.get(timer) {
                engine.start(id)?;
            }
        }
    }
    let outcome = engine.run(&mut log)?;
    if outcome != RunOutcome::Completed {
        bail!("simulation did not complete: {outcome:?}");
    }

    println!("{:>10}  {:>4} → {:<4}  {:>12}  {:>9}  {:>9}  {:>12}", "flow", "src", "dst", "bytes", "start", "end", "B/s");
    let mut throughputs = Vec::with_capacity(ids.len());
    for (flow, &id) in flows.iter().zip(&ids) {
        let report = engine.report(id).context("flow vanished")?;
        let (Some(start), Some(end)) = (report.start, report.finish) else {
            bail!("{id} never ran");
        };
        let rate = flow.bytes / end.since(start);
        throughputs.push(rate);
        println!(
            "{:>10}  {:>4} → {:<4}  {:>12.0}  {:>9.4}  {:>9.4}  {:>12.0}",
            id.0,
            engine.platform().netpoint(flow.src)?.name,
            engine.platform().netpoint(flow.dst)?.name,
            flow.bytes,
            start.secs(),
            end.secs(),
            rate
        );
    }

    println!();
    println!("simulated: {}", engine.now());
    println!("rounds:    {}", log.rounds);
    println!("done:      {} / failed: {}", log.finished, log.failed);
    println!("fairness:  {:.4} (Jain)", jain_index(&throughputs));
    println!("wall:      {:.1?}", wall.elapsed());
    Ok(())
}
