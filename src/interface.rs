//! The interface table: a fixed, read-only-after-init list of the router's
//! named ports.

use crate::wire::arp::Ipv4Address;
use crate::wire::ethernet::MacAddress;

/// A single router port. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub mac: MacAddress,
    pub ipv4: Ipv4Address,
}

impl Interface {
    pub fn new(name: impl Into<String>, mac: MacAddress, ipv4: Ipv4Address) -> Self {
        Self {
            name: name.into(),
            mac,
            ipv4,
        }
    }
}

/// The fixed set of interfaces the router owns. Read-only after
/// construction; lookups are a linear scan, matching the scale (tens, not
/// thousands, of ports) this router is built for.
#[derive(Debug, Clone, Default)]
pub struct InterfaceTable {
    interfaces: Vec<Interface>,
}

impl InterfaceTable {
    pub fn new(interfaces: Vec<Interface>) -> Self {
        Self { interfaces }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter()
    }

    /// Looks up an interface by name.
    pub fn by_name(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Looks up the interface owning `ipv4`. If multiple interfaces were
    /// misconfigured with the same address, the first one wins.
    pub fn by_ipv4(&self, ipv4: Ipv4Address) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.ipv4 == ipv4)
    }

    pub fn is_local(&self, ipv4: Ipv4Address) -> bool {
        self.by_ipv4(ipv4).is_some()
    }
}
