//! Routing trait and default shortest-path implementation.
//!
//! # Pluggability
//!
//! The engine resolves routes through [`Platform::route`], which consults
//! explicit routes first and only then a [`Router`].  Applications can swap
//! in their own implementation (hierarchical zones, static tables) without
//! touching the kernel.
//!
//! # Cost units
//!
//! [`ShortestPathRouter`] minimises total latency, counted in whole
//! nanoseconds so costs are exact integers, with the hop count as a
//! secondary key.  Among equal costs the first-connected hop wins.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use gs_core::{NetPointId, ResourceId};

use crate::platform::Platform;
use crate::{PlatformError, PlatformResult};

// ── Route ─────────────────────────────────────────────────────────────────────

/// Links to cross, in order, and their total latency in seconds.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    pub links:   Vec<ResourceId>,
    pub latency: f64,
}

impl Route {
    /// `true` if the route crosses no link (same source and destination).
    pub fn is_trivial(&self) -> bool {
        self.links.is_empty()
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable routing engine.
///
/// Implementations must be `Send + Sync` so a platform and its router can be
/// shared with worker threads.
pub trait Router: Send + Sync {
    /// Compute a route from `from` to `to` (distinct net points).
    ///
    /// Returns [`PlatformError::NoRoute`] when the net points are not
    /// connected.
    fn route(&self, platform: &Platform, from: NetPointId, to: NetPointId) -> PlatformResult<Route>;
}

// ── ShortestPathRouter ────────────────────────────────────────────────────────

/// Dijkstra over the CSR hop graph, minimising (latency, hops).
pub struct ShortestPathRouter;

impl Router for ShortestPathRouter {
    fn route(&self, platform: &Platform, from: NetPointId, to: NetPointId) -> PlatformResult<Route> {
        dijkstra(platform, from, to)
    }
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

/// (latency in ns, hop count).  Compared lexicographically.
type Cost = (u64, u32);

const NO_HOP: u32 = u32::MAX;

#[inline]
fn hop_cost(platform: &Platform, hop: usize) -> Cost {
    let link = platform.hop_link[hop];
    let latency = platform.resource(link).map_or(0.0, |r| r.latency());
    ((latency * 1e9).round() as u64, 1)
}

fn dijkstra(platform: &Platform, from: NetPointId, to: NetPointId) -> PlatformResult<Route> {
    platform.netpoint(from)?;
    platform.netpoint(to)?;
    if from == to {
        return Ok(Route::default());
    }

    let n = platform.netpoint_count();
    let mut dist = vec![(u64::MAX, u32::MAX); n];
    // prev_hop[v] = hop that reached v; NO_HOP for unreached nodes.
    let mut prev_hop = vec![NO_HOP; n];
    dist[from.index()] = (0, 0);

    // Min-heap: (cost, node).  Secondary key NetPointId keeps ties deterministic.
    let mut heap: BinaryHeap<Reverse<(Cost, NetPointId)>> = BinaryHeap::new();
    heap.push(Reverse(((0, 0), from)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if node == to {
            return Ok(reconstruct(platform, &prev_hop, to));
        }

        // Skip stale heap entries.
        if cost > dist[node.index()] {
            continue;
        }

        for hop in platform.out_hops(node) {
            let neighbor = platform.hop_to[hop];
            let (lat, hops) = hop_cost(platform, hop);
            let new_cost = (cost.0.saturating_add(lat), cost.1.saturating_add(hops));
            if new_cost < dist[neighbor.index()] {
                dist[neighbor.index()] = new_cost;
                prev_hop[neighbor.index()] = hop as u32;
                heap.push(Reverse((new_cost, neighbor)));
            }
        }
    }

    Err(PlatformError::NoRoute { from, to })
}

fn reconstruct(platform: &Platform, prev_hop: &[u32], to: NetPointId) -> Route {
    let mut links = Vec::new();
    let mut latency = 0.0;
    let mut cur = to;
    loop {
        let hop = prev_hop[cur.index()];
        if hop == NO_HOP {
            break;
        }
        let link = platform.hop_link[hop as usize];
        links.push(link);
        latency += platform.resource(link).map_or(0.0, |r| r.latency());
        cur = platform.hop_from[hop as usize];
    }
    links.reverse();
    Route { links, latency }
}
