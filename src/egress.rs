//! Egress helpers (`spec.md` §4.6): wrapping a payload in an Ethernet
//! header and handing it to the host I/O shim, synthesizing ICMP
//! messages, synthesizing ARP requests/replies, and the shared
//! cache-hit/cache-miss delivery path used by both transit forwarding and
//! every synthesized ICMP reply.

use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::arp_table::ParkedFrame;
use crate::error::DropReason;
use crate::interface::Interface;
use crate::route::{Route, RoutingTable};
use crate::router::Router;
use crate::wire::arp::{ArpOperation, ArpPacket, Ipv4Address};
use crate::wire::ethernet::{EtherType, EthernetHeader, MacAddress, BROADCAST_MAC, HEADER_LEN as ETH_HEADER_LEN};
use crate::wire::icmp::{Type3Message, CODE_HOST_UNREACHABLE, DEST_UNREACHABLE};
use crate::wire::ipv4::{Ipv4Header, Ipv4Protocol, DEFAULT_TTL};

impl Router {
    /// Fills the Ethernet header of `payload`-prefixed `frame` with
    /// `iface`'s MAC as the source and `dst_mac` as the destination, then
    /// hands the frame to the host I/O shim.
    pub(crate) fn send_ethernet(&self, iface: &Interface, dst_mac: MacAddress, frame: &mut [u8]) {
        let header = EthernetHeader {
            destination: dst_mac,
            source: iface.mac,
            ethertype: EtherType::from(u16::from_be_bytes([frame[12], frame[13]])),
        };
        header.write(frame);
        self.io.send(&iface.name, frame);
    }

    /// Synthesizes an ARP request or reply and sends it. `target_mac` is
    /// the Ethernet destination (broadcast for requests).
    pub(crate) fn send_arp(&self, iface: &Interface, target_mac: MacAddress, target_ip: Ipv4Address, operation: ArpOperation) {
        let arp = ArpPacket::new(operation, iface.mac, iface.ipv4, target_mac, target_ip);
        let mut frame = vec![0u8; ETH_HEADER_LEN];
        frame.extend_from_slice(&arp.to_bytes());
        let header = EthernetHeader {
            destination: target_mac,
            source: iface.mac,
            ethertype: EtherType::Arp,
        };
        header.write(&mut frame);
        self.io.send(&iface.name, &frame);
    }

    /// Builds and routes an ICMP message toward `dst_ip`. `snippet` is the
    /// offending IP datagram (for type 3/11 messages) or, for an echo
    /// reply built through this path, unused. Per `spec.md` §4.6: resolves
    /// the egress path via LPM, sets `ip_src` to that interface's address,
    /// then follows the ordinary cache-hit/miss delivery flow. If LPM
    /// fails the synthesized packet is dropped (no cascading ICMPs).
    pub(crate) fn send_icmp(&self, dst_ip: Ipv4Address, icmp_type: u8, code: u8, snippet: &[u8]) {
        let route = match self.routes.lookup(dst_ip) {
            Some(route) => route.clone(),
            None => {
                let reason = DropReason::Unroutable;
                info!(%reason, ?dst_ip, "cannot route synthesized ICMP message, dropping");
                return;
            }
        };
        let egress_iface = match self.interfaces.by_name(&route.iface) {
            Some(iface) => iface.clone(),
            None => {
                warn!(iface = %route.iface, "route names an interface that does not exist");
                return;
            }
        };

        let icmp = Type3Message::new(icmp_type, code, snippet);
        let icmp_bytes = icmp.to_bytes();

        let mut ip_header = Ipv4Header::new(egress_iface.ipv4, dst_ip, DEFAULT_TTL, Ipv4Protocol::Icmp, icmp_bytes.len());
        ip_header.recompute_checksum();

        let mut frame = vec![0u8; ETH_HEADER_LEN];
        frame.extend_from_slice(&ip_header.to_bytes());
        frame.extend_from_slice(&icmp_bytes);

        info!(?dst_ip, icmp_type, code, "sending synthesized ICMP message");
        self.deliver_via_route(&route, &egress_iface, dst_ip, frame);
    }

    /// Resolves `ip_dst` through the routing table and delivers `frame`
    /// (already containing a valid IP header, Ethernet header left blank)
    /// via the ARP cache-hit/miss flow. Returns the matched route and
    /// whether it was sent immediately (cache hit) or parked, or `None` if
    /// no route exists (caller is responsible for the destination-
    /// unreachable response).
    pub(crate) fn route_and_deliver(&self, ip_dst: Ipv4Address, frame: Vec<u8>) -> Option<(Route, bool)> {
        let route = self.routes.lookup(ip_dst)?;
        let route = route.clone();
        let egress_iface = self.interfaces.by_name(&route.iface)?.clone();
        let sent = self.deliver_via_route(&route, &egress_iface, ip_dst, frame);
        Some((route, sent))
    }

    fn deliver_via_route(&self, route: &Route, egress_iface: &Interface, ip_dst: Ipv4Address, frame: Vec<u8>) -> bool {
        let next_hop = RoutingTable::next_hop(route, ip_dst);
        self.deliver_to(next_hop, egress_iface, frame)
    }

    /// The shared cache-hit/cache-miss flow (`spec.md` §4.5 "Transit
    /// forwarding"): on a cache hit, rewrite the Ethernet header and send,
    /// returning `true`; on a miss, park an owned copy behind a pending ARP
    /// request, probe immediately so the first packet does not wait up to
    /// a second, and return `false`.
    pub(crate) fn deliver_to(&self, next_hop: Ipv4Address, egress_iface: &Interface, mut frame: Vec<u8>) -> bool {
        let now = self.now();
        match self.arp.lookup(next_hop, now) {
            Some(mac) => {
                debug!(?next_hop, iface = %egress_iface.name, "ARP cache hit, sending");
                self.send_ethernet(egress_iface, mac, &mut frame);
                true
            }
            None => {
                debug!(?next_hop, iface = %egress_iface.name, "ARP cache miss, parking frame");
                // Fill in what we already know; the destination is a
                // placeholder until resolution.
                EthernetHeader {
                    destination: [0; 6],
                    source: egress_iface.mac,
                    ethertype: EtherType::from(u16::from_be_bytes([frame[12], frame[13]])),
                }
                .write(&mut frame);

                let req = self
                    .arp
                    .queue_request(next_hop, frame, egress_iface.name.clone(), now);
                self.handle_arpreq(req);
                false
            }
        }
    }

    /// Drives one round of the ARP timer loop (`spec.md` §4.4): sweeps
    /// expired cache entries and hands every currently pending request to
    /// `handle_arpreq`. The background timer thread calls this once a
    /// second; tests call it directly after advancing a frozen clock to
    /// exercise retransmit/timeout behavior without sleeping in real time.
    pub fn sweep_arp(&self) {
        let now = self.now();
        for req in self.arp.sweep(now) {
            self.handle_arpreq(req);
        }
    }

    /// The ARP retransmit state machine (`spec.md` §4.3 `handle_arpreq`).
    /// `req` is a snapshot taken outside the lock (by `sweep` or
    /// `queue_request`'s caller); this function only ever reads it for the
    /// retransmit decision and writes back through targeted, conditional
    /// `ArpTable` methods, never by reinserting the snapshot wholesale, so
    /// a concurrent resolution or fresh parked frame on the live record is
    /// never clobbered.
    pub(crate) fn handle_arpreq(&self, req: crate::arp_table::PendingRequest) {
        let now = self.now();

        if req.attempts > 0 && now.duration_since(req.last_sent).unwrap_or_default() < crate::arp_table::RETRANSMIT_INTERVAL {
            return;
        }

        if req.attempts >= crate::arp_table::MAX_ATTEMPTS {
            info!(target_ip = ?req.target_ip, "ARP resolution exhausted, failing parked frames");
            for parked in &req.parked {
                self.fail_parked_frame(parked, now);
            }
            self.arp.destroy_request(req.target_ip);
            return;
        }

        let Some(first) = req.parked.front() else {
            // Nothing parked (shouldn't happen per spec's invariants, but
            // don't probe for a target nobody is waiting on).
            self.arp.destroy_request(req.target_ip);
            return;
        };
        let Some(egress_iface) = self.interfaces.by_name(&first.egress_iface).cloned() else {
            warn!(iface = %first.egress_iface, "pending request's egress interface no longer exists");
            self.arp.destroy_request(req.target_ip);
            return;
        };

        self.send_arp(&egress_iface, BROADCAST_MAC, req.target_ip, ArpOperation::Request);
        self.arp.record_probe_sent(req.target_ip, now);
    }

    fn fail_parked_frame(&self, parked: &ParkedFrame, now: SystemTime) {
        let _ = now;
        if parked.frame.len() < ETH_HEADER_LEN + crate::wire::ipv4::HEADER_LEN {
            return;
        }
        let ip = match Ipv4Header::read(&parked.frame[ETH_HEADER_LEN..]) {
            Ok(ip) => ip,
            Err(_) => return,
        };
        let snippet = &parked.frame[ETH_HEADER_LEN..];
        self.send_icmp(ip.source, DEST_UNREACHABLE, CODE_HOST_UNREACHABLE, snippet);
    }
}
