//! The routing table: longest-prefix-match resolution of a destination
//! IPv4 to a next-hop gateway and egress interface.

use crate::wire::arp::Ipv4Address;

/// A route in the routing table. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub destination: Ipv4Address,
    pub netmask: Ipv4Address,
    /// `[0, 0, 0, 0]` means the destination is directly connected — the
    /// next hop is the packet's own destination address, not a gateway.
    pub gateway: Ipv4Address,
    pub iface: String,
}

impl Route {
    pub fn new(destination: Ipv4Address, netmask: Ipv4Address, gateway: Ipv4Address, iface: impl Into<String>) -> Self {
        Self {
            destination,
            netmask,
            gateway,
            iface: iface.into(),
        }
    }

    fn mask_bits(&self) -> u32 {
        u32::from_be_bytes(self.netmask).count_ones()
    }

    fn matches(&self, query: Ipv4Address) -> bool {
        let masked = mask(query, self.netmask);
        masked == mask(self.destination, self.netmask)
    }
}

fn mask(addr: Ipv4Address, netmask: Ipv4Address) -> Ipv4Address {
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = addr[i] & netmask[i];
    }
    out
}

/// The fixed set of routes the router owns. Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: Vec<Route>,
}

impl RoutingTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Resolves `destination` via longest-prefix match: among routes whose
    /// masked destination matches, the one with the most set mask bits
    /// wins; ties are broken by insertion order (first inserted wins).
    pub fn lookup(&self, destination: Ipv4Address) -> Option<&Route> {
        self.routes
            .iter()
            .enumerate()
            .filter(|(_, r)| r.matches(destination))
            .max_by_key(|(i, r)| (r.mask_bits(), std::cmp::Reverse(*i)))
            .map(|(_, r)| r)
    }

    /// The next-hop IPv4 for a packet already resolved to `route`: the
    /// route's gateway, or the packet's own destination on a directly
    /// connected subnet (gateway `0.0.0.0`).
    pub fn next_hop(route: &Route, destination: Ipv4Address) -> Ipv4Address {
        if route.gateway == [0, 0, 0, 0] {
            destination
        } else {
            route.gateway
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn Lookup_PrefersLongerPrefix() {
        let table = RoutingTable::new(vec![
            Route::new([10, 0, 0, 0], [255, 0, 0, 0], [0, 0, 0, 0], "eth0"),
            Route::new([10, 0, 2, 0], [255, 255, 255, 0], [10, 0, 2, 1], "eth2"),
        ]);
        let route = table.lookup([10, 0, 2, 42]).unwrap();
        assert_eq!(route.iface, "eth2");
    }

    #[test]
    fn Lookup_TieBreaksByInsertionOrder() {
        let table = RoutingTable::new(vec![
            Route::new([10, 0, 0, 0], [255, 255, 255, 0], [0, 0, 0, 0], "first"),
            Route::new([10, 0, 0, 0], [255, 255, 255, 0], [0, 0, 0, 0], "second"),
        ]);
        assert_eq!(table.lookup([10, 0, 0, 5]).unwrap().iface, "first");
    }

    #[test]
    fn Lookup_NoMatch_ReturnsNone() {
        let table = RoutingTable::new(vec![Route::new(
            [10, 0, 0, 0],
            [255, 0, 0, 0],
            [0, 0, 0, 0],
            "eth0",
        )]);
        assert!(table.lookup([192, 168, 1, 1]).is_none());
    }

    #[test]
    fn NextHop_DirectlyConnected_IsDestination() {
        let route = Route::new([10, 0, 0, 0], [255, 0, 0, 0], [0, 0, 0, 0], "eth0");
        assert_eq!(RoutingTable::next_hop(&route, [10, 1, 2, 3]), [10, 1, 2, 3]);
    }

    #[test]
    fn NextHop_ViaGateway_IsGateway() {
        let route = Route::new([10, 0, 2, 0], [255, 255, 255, 0], [10, 0, 2, 1], "eth2");
        assert_eq!(RoutingTable::next_hop(&route, [10, 0, 2, 42]), [10, 0, 2, 1]);
    }
}
