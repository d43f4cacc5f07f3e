//! Unit tests for gs-platform.
//!
//! All tests use hand-built platforms.

#[cfg(test)]
mod helpers {
    use gs_core::{NetPointId, ResourceId};
    use crate::{LinkSharing, Platform, PlatformBuilder};

    /// Three hosts around two routers.
    ///
    /// ```text
    ///   h0 ─l0─ r0 ─l1─ r1 ─l2─ h1
    ///            \             /
    ///             ───── l3 ────       (l3: r0 ↔ h1 directly, slow)
    ///   h2 ─l4─ r0
    /// ```
    ///
    /// h0 → h1 via r0, r1: 1 + 1 + 1 ms.  Via l3: 1 + 10 ms.
    pub fn star() -> (Platform, [NetPointId; 5], [ResourceId; 5]) {
        let mut b = PlatformBuilder::new();
        let h0 = b.add_host("h0", 1e9, 1).unwrap();
        let h1 = b.add_host("h1", 2e9, 2).unwrap();
        let h2 = b.add_host("h2", 1e9, 4).unwrap();
        let r0 = b.add_router("r0").unwrap();
        let r1 = b.add_router("r1").unwrap();
        let l0 = b.add_link("l0", 1e8, 1e-3, LinkSharing::Shared).unwrap();
        let l1 = b.add_link("l1", 1e8, 1e-3, LinkSharing::Shared).unwrap();
        let l2 = b.add_link("l2", 1e8, 1e-3, LinkSharing::Shared).unwrap();
        let l3 = b.add_link("l3", 1e9, 1e-2, LinkSharing::Fatpipe).unwrap();
        let l4 = b.add_link("l4", 1e8, 5e-4, LinkSharing::Shared).unwrap();
        b.connect(l0, h0, r0).unwrap();
        b.connect(l1, r0, r1).unwrap();
        b.connect(l2, r1, h1).unwrap();
        b.connect(l3, r0, h1).unwrap();
        b.connect(l4, h2, r0).unwrap();
        (b.build().unwrap(), [h0, h1, h2, r0, r1], [l0, l1, l2, l3, l4])
    }
}

// ── Builder & validation ──────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use gs_core::{ErrorCategory, NetPointId, ResourceId};
    use crate::{LinkSharing, NetPointKind, PlatformBuilder, PlatformError, ResourceSpec};

    #[test]
    fn empty_build() {
        let p = PlatformBuilder::new().build().unwrap();
        assert_eq!(p.netpoint_count(), 0);
        assert_eq!(p.resource_count(), 0);
        assert_eq!(p.hop_count(), 0);
    }

    #[test]
    fn host_owns_a_cpu() {
        let mut b = PlatformBuilder::new();
        let h = b.add_host("worker", 3e9, 8).unwrap();
        let p = b.build().unwrap();
        let cpu = p.cpu_of(h).unwrap();
        assert_eq!(p.resource_name(cpu).unwrap(), "worker");
        assert_eq!(p.host_of(cpu).unwrap(), Some(h));
        assert_eq!(p.resource(cpu).unwrap().peak(), 24e9);
        assert!(matches!(p.netpoint(h).unwrap().kind, NetPointKind::Host { .. }));
        assert_eq!(p.netpoint_by_name("worker"), Some(h));
    }

    #[test]
    fn split_duplex_creates_two_halves() {
        let mut b = PlatformBuilder::new();
        let up = b.add_link("bb", 1e9, 1e-4, LinkSharing::SplitDuplex).unwrap();
        b.add_host("h", 1.0, 1).unwrap();
        let p = b.build().unwrap();
        let down = p.resource_by_name("bb_DOWN").unwrap();
        assert_eq!(p.resource_by_name("bb_UP"), Some(up));
        assert_eq!(p.resource_by_name("bb"), None);
        match p.resource(up).unwrap() {
            ResourceSpec::Link { sharing, peer, .. } => {
                assert_eq!(*sharing, LinkSharing::Shared);
                assert_eq!(*peer, Some(down));
            }
            other => panic!("expected a link, got {other:?}"),
        }
    }

    #[test]
    fn disks_attach_to_hosts_only() {
        let mut b = PlatformBuilder::new();
        let h = b.add_host("h", 1.0, 1).unwrap();
        let r = b.add_router("r").unwrap();
        let d = b.add_disk(h, "ssd", 5e8, 2e8).unwrap();
        assert_eq!(b.add_disk(r, "nope", 1.0, 1.0), Err(PlatformError::NotAHost(r)));
        let p = b.build().unwrap();
        assert_eq!(p.disks_of(h), vec![d]);
        assert_eq!(p.resource(d).unwrap().peak(), 5e8);
    }

    #[test]
    fn invalid_descriptions_are_configuration_errors() {
        let mut b = PlatformBuilder::new();
        let err = b.add_host("h", 0.0, 1).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(b.add_host("h", 1.0, 0).is_err());
        assert!(b.add_link("l", -1.0, 0.0, LinkSharing::Shared).is_err());
        assert!(b.add_link("l", 1.0, f64::NAN, LinkSharing::Shared).is_err());
        b.add_host("h", 1.0, 1).unwrap();
        assert_eq!(b.add_router("h"), Err(PlatformError::DuplicateName("h".into())));
        assert!(b.add_host("", 1.0, 1).is_err());
    }

    #[test]
    fn unknown_endpoints_are_rejected() {
        let mut b = PlatformBuilder::new();
        let h = b.add_host("h", 1.0, 1).unwrap();
        let l = b.add_link("l", 1.0, 0.0, LinkSharing::Shared).unwrap();
        assert_eq!(b.connect(l, h, NetPointId(9)), Err(PlatformError::UnknownNetPoint(NetPointId(9))));
        assert_eq!(b.connect(ResourceId(0), h, h), Err(PlatformError::NotALink(ResourceId(0))));
        assert_eq!(b.add_route(h, h, &[ResourceId(7)], false), Err(PlatformError::UnknownResource(ResourceId(7))));
    }

    #[test]
    fn csr_out_hops() {
        let (p, [h0, h1, h2, r0, r1], _) = super::helpers::star();
        assert_eq!(p.out_hops(h0).count(), 1);
        assert_eq!(p.out_hops(h1).count(), 2);
        assert_eq!(p.out_hops(h2).count(), 1);
        assert_eq!(p.out_hops(r0).count(), 4);
        assert_eq!(p.out_hops(r1).count(), 2);
        for hop in p.out_hops(r0) {
            assert_eq!(p.hop_from[hop], r0);
        }
    }
}

// ── Routing ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod routing {
    use gs_core::NetPointId;
    use crate::{LinkSharing, PlatformBuilder, PlatformError, Router, ShortestPathRouter};

    #[test]
    fn picks_lowest_latency() {
        let (p, [h0, h1, ..], [l0, l1, l2, ..]) = super::helpers::star();
        let route = p.route(&ShortestPathRouter, h0, h1).unwrap();
        assert_eq!(route.links, vec![l0, l1, l2]);
        assert!((route.latency - 3e-3).abs() < 1e-12);
    }

    #[test]
    fn reverse_direction_mirrors() {
        let (p, [h0, h1, ..], [l0, l1, l2, ..]) = super::helpers::star();
        let route = p.route(&ShortestPathRouter, h1, h0).unwrap();
        assert_eq!(route.links, vec![l2, l1, l0]);
    }

    #[test]
    fn fewer_hops_break_latency_ties() {
        let mut b = PlatformBuilder::new();
        let a = b.add_host("a", 1.0, 1).unwrap();
        let z = b.add_host("z", 1.0, 1).unwrap();
        let m = b.add_router("m").unwrap();
        let zero1 = b.add_link("x1", 1.0, 0.0, LinkSharing::Shared).unwrap();
        let zero2 = b.add_link("x2", 1.0, 0.0, LinkSharing::Shared).unwrap();
        let direct = b.add_link("d", 1.0, 0.0, LinkSharing::Shared).unwrap();
        b.connect(zero1, a, m).unwrap();
        b.connect(zero2, m, z).unwrap();
        b.connect(direct, a, z).unwrap();
        let p = b.build().unwrap();
        assert_eq!(p.route(&ShortestPathRouter, a, z).unwrap().links, vec![direct]);
    }

    #[test]
    fn same_host_is_trivial() {
        let (p, [h0, ..], _) = super::helpers::star();
        assert!(p.route(&ShortestPathRouter, h0, h0).unwrap().is_trivial());
    }

    #[test]
    fn disconnected_is_no_route() {
        let mut b = PlatformBuilder::new();
        let a = b.add_host("a", 1.0, 1).unwrap();
        let z = b.add_host("z", 1.0, 1).unwrap();
        let p = b.build().unwrap();
        assert_eq!(p.route(&ShortestPathRouter, a, z), Err(PlatformError::NoRoute { from: a, to: z }));
        assert_eq!(
            ShortestPathRouter.route(&p, a, NetPointId(5)),
            Err(PlatformError::UnknownNetPoint(NetPointId(5)))
        );
    }

    #[test]
    fn explicit_route_takes_precedence() {
        let mut b = PlatformBuilder::new();
        let a = b.add_host("a", 1.0, 1).unwrap();
        let z = b.add_host("z", 1.0, 1).unwrap();
        let fast = b.add_link("fast", 1.0, 1e-6, LinkSharing::Shared).unwrap();
        let slow = b.add_link("slow", 1.0, 1.0, LinkSharing::Shared).unwrap();
        b.connect(fast, a, z).unwrap();
        b.add_route(a, z, &[slow], false).unwrap();
        let p = b.build().unwrap();
        let route = p.route(&ShortestPathRouter, a, z).unwrap();
        assert_eq!(route.links, vec![slow]);
        assert_eq!(route.latency, 1.0);
        // Not symmetrical: the reverse falls back to the router.
        assert_eq!(p.route(&ShortestPathRouter, z, a).unwrap().links, vec![fast]);
    }

    #[test]
    fn symmetrical_route_swaps_duplex_halves() {
        let mut b = PlatformBuilder::new();
        let a = b.add_host("a", 1.0, 1).unwrap();
        let z = b.add_host("z", 1.0, 1).unwrap();
        let access = b.add_link("access", 1.0, 0.0, LinkSharing::Shared).unwrap();
        let up = b.add_link("bb", 1.0, 0.0, LinkSharing::SplitDuplex).unwrap();
        b.add_route(a, z, &[access, up], true).unwrap();
        let p = b.build().unwrap();
        let down = p.resource_by_name("bb_DOWN").unwrap();
        assert_eq!(p.explicit_route(z, a).unwrap(), &[down, access]);
    }

    #[test]
    fn split_duplex_connection_uses_one_half_per_direction() {
        let mut b = PlatformBuilder::new();
        let a = b.add_host("a", 1.0, 1).unwrap();
        let z = b.add_host("z", 1.0, 1).unwrap();
        let up = b.add_link("wire", 1.0, 0.0, LinkSharing::SplitDuplex).unwrap();
        b.connect(up, a, z).unwrap();
        let p = b.build().unwrap();
        let down = p.resource_by_name("wire_DOWN").unwrap();
        assert_eq!(p.route(&ShortestPathRouter, a, z).unwrap().links, vec![up]);
        assert_eq!(p.route(&ShortestPathRouter, z, a).unwrap().links, vec![down]);
    }
}
