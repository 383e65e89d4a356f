//! Parsing for the two plain-text configuration formats named in
//! `spec.md` §6: the interface list and the routing table. Both are
//! read once at startup into the read-only-after-init `InterfaceTable`
//! / `RoutingTable`; nothing here runs on the packet path.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::ConfigError;
use crate::interface::{Interface, InterfaceTable};
use crate::route::{Route, RoutingTable};
use crate::wire::arp::Ipv4Address;
use crate::wire::ethernet::MacAddress;

/// `name, MAC (colon-separated hex), IPv4 (dotted quad)`, e.g.
/// `eth1, 01:02:03:04:05:06, 10.0.1.1`.
fn interface_line_pattern() -> Regex {
    Regex::new(
        r"^\s*([A-Za-z0-9_-]+)\s*,\s*([0-9A-Fa-f]{2}(?::[0-9A-Fa-f]{2}){5})\s*,\s*(\d{1,3}(?:\.\d{1,3}){3})\s*$",
    )
    .expect("static interface-line pattern is valid")
}

/// `dest_ip, gateway_ip, netmask, iface_name`, e.g.
/// `10.0.2.0, 10.0.2.1, 255.255.255.0, eth2`.
fn route_line_pattern() -> Regex {
    Regex::new(
        r"^\s*(\d{1,3}(?:\.\d{1,3}){3})\s*,\s*(\d{1,3}(?:\.\d{1,3}){3})\s*,\s*(\d{1,3}(?:\.\d{1,3}){3})\s*,\s*([A-Za-z0-9_-]+)\s*$",
    )
    .expect("static route-line pattern is valid")
}

fn parse_mac(text: &str) -> Result<MacAddress, ConfigError> {
    let mut mac = [0u8; 6];
    for (i, octet) in text.split(':').enumerate() {
        mac[i] = u8::from_str_radix(octet, 16).map_err(|_| ConfigError::InvalidMac(text.to_string()))?;
    }
    Ok(mac)
}

fn parse_ipv4(text: &str) -> Result<Ipv4Address, ConfigError> {
    let mut ip = [0u8; 4];
    let mut parts = text.split('.');
    for slot in ip.iter_mut() {
        let part = parts.next().ok_or_else(|| ConfigError::InvalidIpv4(text.to_string()))?;
        *slot = part.parse().map_err(|_| ConfigError::InvalidIpv4(text.to_string()))?;
    }
    if parts.next().is_some() {
        return Err(ConfigError::InvalidIpv4(text.to_string()));
    }
    Ok(ip)
}

/// Reads and parses the interface list at `path` (see `interface_line_pattern`
/// for the line format). Blank lines and lines starting with `#` are skipped.
pub fn load_interfaces(path: impl AsRef<Path>) -> Result<InterfaceTable, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let pattern = interface_line_pattern();
    let mut interfaces = Vec::new();

    for (line_no, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let caps = pattern.captures(line).ok_or_else(|| ConfigError::MalformedInterfaceLine {
            path: path.display().to_string(),
            line: line_no + 1,
            text: raw_line.to_string(),
        })?;

        let name = caps[1].to_string();
        let mac = parse_mac(&caps[2])?;
        let ipv4 = parse_ipv4(&caps[3])?;
        interfaces.push(Interface::new(name, mac, ipv4));
    }

    Ok(InterfaceTable::new(interfaces))
}

/// Reads and parses the routing table at `path` (see `route_line_pattern`
/// for the line format). Blank lines and lines starting with `#` are skipped.
/// A gateway of `0.0.0.0` marks a directly connected route.
pub fn load_routes(path: impl AsRef<Path>) -> Result<RoutingTable, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let pattern = route_line_pattern();
    let mut routes = Vec::new();

    for (line_no, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let caps = pattern.captures(line).ok_or_else(|| ConfigError::MalformedRouteLine {
            path: path.display().to_string(),
            line: line_no + 1,
            text: raw_line.to_string(),
        })?;

        let destination = parse_ipv4(&caps[1])?;
        let gateway = parse_ipv4(&caps[2])?;
        let netmask = parse_ipv4(&caps[3])?;
        let iface = caps[4].to_string();
        routes.push(Route::new(destination, netmask, gateway, iface));
    }

    Ok(RoutingTable::new(routes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn LoadInterfaces_ParsesWellFormedLines() {
        let file = write_temp("# comment\neth0, 01:02:03:04:05:06, 10.0.0.1\neth1, 07:08:09:0a:0b:0c, 10.0.1.1\n");
        let table = load_interfaces(file.path()).unwrap();
        assert_eq!(table.by_name("eth0").unwrap().ipv4, [10, 0, 0, 1]);
        assert_eq!(table.by_name("eth1").unwrap().mac, [7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn LoadInterfaces_MalformedLine_ReportsLineNumber() {
        let file = write_temp("eth0, 01:02:03:04:05:06, 10.0.0.1\nnot a valid line\n");
        let err = load_interfaces(file.path()).unwrap_err();
        match err {
            ConfigError::MalformedInterfaceLine { line, .. } => assert_eq!(line, 2),
            other => panic!("expected MalformedInterfaceLine, got {other:?}"),
        }
    }

    #[test]
    fn LoadRoutes_ParsesDirectlyConnectedAndGatewayRoutes() {
        let file = write_temp("10.0.1.0, 0.0.0.0, 255.255.255.0, eth1\n10.0.2.0, 10.0.1.2, 255.255.255.0, eth1\n");
        let table = load_routes(file.path()).unwrap();
        let routes: Vec<_> = table.iter().collect();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].gateway, [0, 0, 0, 0]);
        assert_eq!(routes[1].gateway, [10, 0, 1, 2]);
    }

    #[test]
    fn LoadRoutes_MalformedLine_ReportsLineNumber() {
        let file = write_temp("garbage\n");
        let err = load_routes(file.path()).unwrap_err();
        match err {
            ConfigError::MalformedRouteLine { line, .. } => assert_eq!(line, 1),
            other => panic!("expected MalformedRouteLine, got {other:?}"),
        }
    }

    #[test]
    fn LoadInterfaces_MissingFile_IsIoError() {
        let err = load_interfaces("/nonexistent/path/interfaces.txt").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
