//! Sealed platform description and builder.
//!
//! # Data layout
//!
//! Hosts and routers are *net points*; CPUs, links and disks are
//! *resources*.  Both are dense id spaces (`NetPointId`, `ResourceId`) in
//! creation order.  Every host owns exactly one CPU resource.
//!
//! Links connect net points.  The connectivity graph uses **Compressed
//! Sparse Row (CSR)** format: the outgoing hops of net point `n` occupy
//!
//! ```text
//! hop_link[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! with `hop_from`/`hop_to` giving the endpoints of each hop.  A shared or
//! fatpipe link yields one hop in each direction through the same resource;
//! a split-duplex link yields its `_UP` half one way and `_DOWN` the other.
//!
//! Explicit routes registered with [`PlatformBuilder::add_route`] are kept
//! aside and take precedence over any [`Router`](crate::Router).

use std::collections::BTreeMap;

use gs_core::{NetPointId, ResourceId};
use tracing::debug;

use crate::router::{Route, Router};
use crate::{PlatformError, PlatformResult};

// ── Descriptions ──────────────────────────────────────────────────────────────

/// How concurrent flows share one link.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkSharing {
    /// Flows split the bandwidth.
    #[default]
    Shared,
    /// Every flow may use the full bandwidth.
    Fatpipe,
    /// Two independent shared halves, `<name>_UP` and `<name>_DOWN`, one per
    /// direction.
    SplitDuplex,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NetPointKind {
    Host { cpu: ResourceId },
    Router,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetPoint {
    pub name: String,
    pub kind: NetPointKind,
}

/// The capacity-bearing part of one resource.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceSpec {
    /// `speed` is per core, in flops per second.
    Cpu { host: NetPointId, speed: f64, cores: u32 },
    /// `sharing` is never `SplitDuplex` here: each half is its own link,
    /// and `peer` names the other half.
    Link { bandwidth: f64, latency: f64, sharing: LinkSharing, peer: Option<ResourceId> },
    Disk { host: NetPointId, read_bw: f64, write_bw: f64 },
}

impl ResourceSpec {
    /// Capacity of the resource at full availability.
    pub fn peak(&self) -> f64 {
        match *self {
            ResourceSpec::Cpu { speed, cores, .. }       => speed * cores as f64,
            ResourceSpec::Link { bandwidth, .. }         => bandwidth,
            ResourceSpec::Disk { read_bw, write_bw, .. } => read_bw.max(write_bw),
        }
    }

    pub fn latency(&self) -> f64 {
        match *self {
            ResourceSpec::Link { latency, .. } => latency,
            _ => 0.0,
        }
    }
}

// ── Platform ──────────────────────────────────────────────────────────────────

/// An immutable, sealed hardware description.
///
/// Do not construct directly; use [`PlatformBuilder`].
pub struct Platform {
    netpoints:      Vec<NetPoint>,
    resources:      Vec<ResourceSpec>,
    resource_names: Vec<String>,
    names:          BTreeMap<String, Named>,

    // ── CSR hop adjacency ─────────────────────────────────────────────────
    /// Outgoing hops of net point `n` are `node_out_start[n] .. node_out_start[n+1]`.
    /// Length = `netpoint_count + 1`.
    pub node_out_start: Vec<u32>,
    pub hop_from:       Vec<NetPointId>,
    pub hop_to:         Vec<NetPointId>,
    /// Link crossed by each hop.
    pub hop_link:       Vec<ResourceId>,

    routes: BTreeMap<(NetPointId, NetPointId), Vec<ResourceId>>,
}

#[derive(Copy, Clone, Debug)]
enum Named {
    NetPoint(NetPointId),
    Resource(ResourceId),
}

impl Platform {
    /// A platform with no hosts.  Every routing request fails.
    pub fn empty() -> Self {
        // An empty builder cannot fail validation.
        PlatformBuilder::new().seal()
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn netpoint_count(&self) -> usize {
        self.netpoints.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn hop_count(&self) -> usize {
        self.hop_link.len()
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    pub fn netpoint(&self, id: NetPointId) -> PlatformResult<&NetPoint> {
        self.netpoints.get(id.index()).ok_or(PlatformError::UnknownNetPoint(id))
    }

    pub fn resource(&self, id: ResourceId) -> PlatformResult<&ResourceSpec> {
        self.resources.get(id.index()).ok_or(PlatformError::UnknownResource(id))
    }

    pub fn resource_name(&self, id: ResourceId) -> PlatformResult<&str> {
        self.resource_names
            .get(id.index())
            .map(String::as_str)
            .ok_or(PlatformError::UnknownResource(id))
    }

    /// Every resource in id order.
    pub fn resources(&self) -> impl Iterator<Item = (ResourceId, &ResourceSpec)> + '_ {
        self.resources.iter().enumerate().map(|(i, r)| (ResourceId(i as u32), r))
    }

    /// Every host in id order.
    pub fn hosts(&self) -> impl Iterator<Item = NetPointId> + '_ {
        self.netpoints
            .iter()
            .enumerate()
            .filter(|(_, p)| matches!(p.kind, NetPointKind::Host { .. }))
            .map(|(i, _)| NetPointId(i as u32))
    }

    /// Net point (host or router) called `name`.
    pub fn netpoint_by_name(&self, name: &str) -> Option<NetPointId> {
        match self.names.get(name) {
            Some(Named::NetPoint(id)) => Some(*id),
            _ => None,
        }
    }

    /// CPU, link or disk called `name`.
    pub fn resource_by_name(&self, name: &str) -> Option<ResourceId> {
        match self.names.get(name) {
            Some(Named::Resource(id)) => Some(*id),
            _ => None,
        }
    }

    /// The CPU resource of `host`.
    pub fn cpu_of(&self, host: NetPointId) -> PlatformResult<ResourceId> {
        match self.netpoint(host)?.kind {
            NetPointKind::Host { cpu } => Ok(cpu),
            NetPointKind::Router => Err(PlatformError::NotAHost(host)),
        }
    }

    /// Disks attached to `host`, in creation order.
    pub fn disks_of(&self, host: NetPointId) -> Vec<ResourceId> {
        self.resources()
            .filter(|(_, r)| matches!(r, ResourceSpec::Disk { host: h, .. } if *h == host))
            .map(|(id, _)| id)
            .collect()
    }

    /// The host a CPU or disk belongs to; `None` for links.
    pub fn host_of(&self, id: ResourceId) -> PlatformResult<Option<NetPointId>> {
        Ok(match *self.resource(id)? {
            ResourceSpec::Cpu { host, .. } | ResourceSpec::Disk { host, .. } => Some(host),
            ResourceSpec::Link { .. } => None,
        })
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Indices of the hops leaving `node`.  A contiguous range.
    #[inline]
    pub fn out_hops(&self, node: NetPointId) -> impl Iterator<Item = usize> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        start..end
    }

    /// Explicit route registered for `(src, dst)`, if any.
    pub fn explicit_route(&self, src: NetPointId, dst: NetPointId) -> Option<&[ResourceId]> {
        self.routes.get(&(src, dst)).map(Vec::as_slice)
    }

    /// Resolve the links from `src` to `dst`: the explicit route when one
    /// was registered, otherwise whatever `router` computes.  Same source
    /// and destination gives an empty route.
    pub fn route<R: Router + ?Sized>(&self, router: &R, src: NetPointId, dst: NetPointId) -> PlatformResult<Route> {
        self.netpoint(src)?;
        self.netpoint(dst)?;
        if let Some(links) = self.explicit_route(src, dst) {
            let latency = links.iter().map(|&l| self.resources[l.index()].latency()).sum();
            return Ok(Route { links: links.to_vec(), latency });
        }
        if src == dst {
            return Ok(Route::default());
        }
        router.route(self, src, dst)
    }

    /// Sum of the latencies along `links`.
    pub fn latency_of(&self, links: &[ResourceId]) -> PlatformResult<f64> {
        let mut total = 0.0;
        for &l in links {
            total += self.resource(l)?.latency();
        }
        Ok(total)
    }
}

// ── PlatformBuilder ───────────────────────────────────────────────────────────

/// Describe a platform incrementally, then [`build`](Self::build) it.
///
/// # Example
///
/// ```
/// use gs_platform::{LinkSharing, PlatformBuilder, ShortestPathRouter};
///
/// let mut b = PlatformBuilder::new();
/// let alice = b.add_host("alice", 1e9, 1).unwrap();
/// let bob   = b.add_host("bob", 1e9, 1).unwrap();
/// let wire  = b.add_link("wire", 1.25e8, 1e-4, LinkSharing::Shared).unwrap();
/// b.connect(wire, alice, bob).unwrap();
/// let platform = b.build().unwrap();
///
/// let route = platform.route(&ShortestPathRouter, alice, bob).unwrap();
/// assert_eq!(route.links, vec![wire]);
/// ```
pub struct PlatformBuilder {
    netpoints:      Vec<NetPoint>,
    resources:      Vec<ResourceSpec>,
    resource_names: Vec<String>,
    names:          BTreeMap<String, Named>,
    raw_hops:       Vec<RawHop>,
    routes:         BTreeMap<(NetPointId, NetPointId), Vec<ResourceId>>,
}

struct RawHop {
    from: NetPointId,
    to:   NetPointId,
    link: ResourceId,
}

impl PlatformBuilder {
    pub fn new() -> Self {
        Self {
            netpoints:      Vec::new(),
            resources:      Vec::new(),
            resource_names: Vec::new(),
            names:          BTreeMap::new(),
            raw_hops:       Vec::new(),
            routes:         BTreeMap::new(),
        }
    }

    /// Add a host with `cores` cores of `speed` flops/s each.  Its CPU
    /// resource is named after the host.
    pub fn add_host(&mut self, name: &str, speed: f64, cores: u32) -> PlatformResult<NetPointId> {
        positive(name, "speed", speed)?;
        if cores == 0 {
            return Err(PlatformError::Config(format!("host {name:?} must have at least one core")));
        }
        self.claim(name)?;
        let id = NetPointId::try_from(self.netpoints.len())
            .map_err(|_| PlatformError::Config("too many net points".into()))?;
        let cpu = self.push_resource(name, ResourceSpec::Cpu { host: id, speed, cores })?;
        self.netpoints.push(NetPoint { name: name.to_owned(), kind: NetPointKind::Host { cpu } });
        self.names.insert(name.to_owned(), Named::NetPoint(id));
        Ok(id)
    }

    /// Add a router: a net point with no computing capacity.
    pub fn add_router(&mut self, name: &str) -> PlatformResult<NetPointId> {
        self.claim(name)?;
        let id = NetPointId::try_from(self.netpoints.len())
            .map_err(|_| PlatformError::Config("too many net points".into()))?;
        self.netpoints.push(NetPoint { name: name.to_owned(), kind: NetPointKind::Router });
        self.names.insert(name.to_owned(), Named::NetPoint(id));
        Ok(id)
    }

    /// Add a link.  For [`LinkSharing::SplitDuplex`] two links are created,
    /// `<name>_UP` and `<name>_DOWN`, and the `_UP` half is returned; the
    /// other half is its `peer`.
    pub fn add_link(&mut self, name: &str, bandwidth: f64, latency: f64, sharing: LinkSharing) -> PlatformResult<ResourceId> {
        positive(name, "bandwidth", bandwidth)?;
        if !(latency >= 0.0 && latency.is_finite()) {
            return Err(PlatformError::Config(format!("link {name:?} latency must be >= 0, got {latency}")));
        }
        if sharing != LinkSharing::SplitDuplex {
            self.claim(name)?;
            return self.push_resource(name, ResourceSpec::Link { bandwidth, latency, sharing, peer: None });
        }

        let (up_name, down_name) = (format!("{name}_UP"), format!("{name}_DOWN"));
        self.claim(&up_name)?;
        self.claim(&down_name)?;
        let half = ResourceSpec::Link { bandwidth, latency, sharing: LinkSharing::Shared, peer: None };
        let up = self.push_resource(&up_name, half)?;
        let down = self.push_resource(&down_name, half)?;
        self.set_peer(up, down);
        self.set_peer(down, up);
        Ok(up)
    }

    /// Attach `link` between `a` and `b`, usable in both directions.
    ///
    /// For a split-duplex link, pass its `_UP` half: it carries `a → b`
    /// traffic and the `_DOWN` half carries `b → a`.
    pub fn connect(&mut self, link: ResourceId, a: NetPointId, b: NetPointId) -> PlatformResult<()> {
        self.check_netpoint(a)?;
        self.check_netpoint(b)?;
        let peer = self.link_peer(link)?;
        self.raw_hops.push(RawHop { from: a, to: b, link });
        self.raw_hops.push(RawHop { from: b, to: a, link: peer.unwrap_or(link) });
        Ok(())
    }

    /// Register an explicit route.  With `symmetrical`, the reverse route is
    /// registered too: the same links in reverse order, with split-duplex
    /// halves swapped for their peers.
    pub fn add_route(&mut self, src: NetPointId, dst: NetPointId, links: &[ResourceId], symmetrical: bool) -> PlatformResult<()> {
        self.check_netpoint(src)?;
        self.check_netpoint(dst)?;
        let mut reverse = Vec::with_capacity(links.len());
        for &l in links.iter().rev() {
            reverse.push(self.link_peer(l)?.unwrap_or(l));
        }
        self.routes.insert((src, dst), links.to_vec());
        if symmetrical {
            self.routes.insert((dst, src), reverse);
        }
        Ok(())
    }

    /// Attach a disk to `host`.
    pub fn add_disk(&mut self, host: NetPointId, name: &str, read_bw: f64, write_bw: f64) -> PlatformResult<ResourceId> {
        self.check_netpoint(host)?;
        if !matches!(self.netpoints[host.index()].kind, NetPointKind::Host { .. }) {
            return Err(PlatformError::NotAHost(host));
        }
        positive(name, "read bandwidth", read_bw)?;
        positive(name, "write bandwidth", write_bw)?;
        self.claim(name)?;
        self.push_resource(name, ResourceSpec::Disk { host, read_bw, write_bw })
    }

    pub fn netpoint_count(&self) -> usize {
        self.netpoints.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Seal the description.
    pub fn build(self) -> PlatformResult<Platform> {
        if self.netpoints.is_empty() && !self.resources.is_empty() {
            return Err(PlatformError::Config("resources declared without any host".into()));
        }
        let platform = self.seal();
        debug!(
            netpoints = platform.netpoint_count(),
            resources = platform.resource_count(),
            hops = platform.hop_count(),
            "platform sealed"
        );
        Ok(platform)
    }

    fn seal(self) -> Platform {
        let node_count = self.netpoints.len();

        // Stable sort keeps connection order among hops of one net point,
        // which routing relies on for deterministic tie-breaking.
        let mut raw = self.raw_hops;
        raw.sort_by_key(|h| h.from.0);

        let hop_from: Vec<NetPointId> = raw.iter().map(|h| h.from).collect();
        let hop_to:   Vec<NetPointId> = raw.iter().map(|h| h.to).collect();
        let hop_link: Vec<ResourceId> = raw.iter().map(|h| h.link).collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for h in &raw {
            node_out_start[h.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, hop_link.len());

        Platform {
            netpoints: self.netpoints,
            resources: self.resources,
            resource_names: self.resource_names,
            names: self.names,
            node_out_start,
            hop_from,
            hop_to,
            hop_link,
            routes: self.routes,
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn claim(&self, name: &str) -> PlatformResult<()> {
        if name.is_empty() {
            return Err(PlatformError::Config("names must not be empty".into()));
        }
        if self.names.contains_key(name) {
            return Err(PlatformError::DuplicateName(name.to_owned()));
        }
        Ok(())
    }

    fn push_resource(&mut self, name: &str, spec: ResourceSpec) -> PlatformResult<ResourceId> {
        let id = ResourceId::try_from(self.resources.len())
            .map_err(|_| PlatformError::Config("too many resources".into()))?;
        self.resources.push(spec);
        self.resource_names.push(name.to_owned());
        // A host's CPU shares the host's name and is reached through it.
        if !matches!(spec, ResourceSpec::Cpu { .. }) {
            self.names.insert(name.to_owned(), Named::Resource(id));
        }
        Ok(id)
    }

    fn set_peer(&mut self, link: ResourceId, other: ResourceId) {
        if let ResourceSpec::Link { peer, .. } = &mut self.resources[link.index()] {
            *peer = Some(other);
        }
    }

    fn link_peer(&self, link: ResourceId) -> PlatformResult<Option<ResourceId>> {
        match self.resources.get(link.index()) {
            Some(ResourceSpec::Link { peer, .. }) => Ok(*peer),
            Some(_) => Err(PlatformError::NotALink(link)),
            None => Err(PlatformError::UnknownResource(link)),
        }
    }

    fn check_netpoint(&self, id: NetPointId) -> PlatformResult<()> {
        if id.index() < self.netpoints.len() {
            Ok(())
        } else {
            Err(PlatformError::UnknownNetPoint(id))
        }
    }
}

impl Default for PlatformBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn positive(owner: &str, what: &str, value: f64) -> PlatformResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(PlatformError::Config(format!("{owner:?}: {what} must be positive and finite, got {value}")))
    }
}
