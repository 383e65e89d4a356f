//! The forwarding pipeline (`spec.md` §4.5): `handle_packet` is the single
//! entry point invoked once per received frame. It is strictly
//! synchronous — it may enqueue a parked frame but it never blocks on I/O.

use tracing::info;

use crate::error::DropReason;
use crate::router::Router;
use crate::wire::arp::{ArpOperation, ArpPacket};
use crate::wire::ethernet::{accepted_by, EtherType, EthernetHeader, HEADER_LEN as ETH_HEADER_LEN};
use crate::wire::icmp::{
    self, EchoMessage, CODE_NET_UNREACHABLE, CODE_PORT_UNREACHABLE, CODE_TTL_EXCEEDED, DEST_UNREACHABLE, TIME_EXCEEDED,
};
use crate::wire::ipv4::{Ipv4Header, Ipv4Protocol, HEADER_LEN as IP_HEADER_LEN};

/// Outcome of a call to `handle_packet`, exposed purely for logging and
/// test assertions — production callers only care about the side effects
/// already performed against the `HostIo` shim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketAction {
    /// Consumed by the router with no reply (e.g. a non-echo ICMP message
    /// addressed to us, or an ARP reply with no matching pending request).
    Consumed,
    /// Forwarded or replied immediately via an ARP cache hit.
    Forwarded,
    /// Parked pending ARP resolution of `target`.
    Parked,
    /// Dropped for the given reason. A reply may still have been
    /// synthesized (e.g. TTL expiry); this only reflects the original
    /// packet's fate.
    Dropped(DropReason),
}

impl Router {
    /// Entry point: decides a received frame's fate and performs whatever
    /// side effects that implies (consume, reply, forward, drop, or park).
    pub fn handle_packet(&self, ingress_iface: &str, frame: &[u8]) -> PacketAction {
        let Some(iface) = self.interfaces.by_name(ingress_iface) else {
            return PacketAction::Dropped(DropReason::RuntFrame);
        };

        let eth = match EthernetHeader::read(frame) {
            Ok(eth) => eth,
            Err(reason) => {
                info!(%reason, ingress_iface, "dropping frame");
                return PacketAction::Dropped(reason);
            }
        };

        if !accepted_by(eth.destination, iface.mac) {
            info!(ingress_iface, "dropping frame not addressed to us or broadcast");
            return PacketAction::Dropped(DropReason::ForeignDestination);
        }

        match eth.ethertype {
            EtherType::Arp => self.handle_arp_frame(frame),
            EtherType::Ipv4 => self.handle_ipv4_frame(frame),
            EtherType::Other(_) => {
                info!(ingress_iface, "dropping frame with unrecognized EtherType");
                PacketAction::Dropped(DropReason::RuntFrame)
            }
        }
    }

    fn handle_arp_frame(&self, frame: &[u8]) -> PacketAction {
        let arp = match ArpPacket::read(&frame[ETH_HEADER_LEN..]) {
            Ok(arp) => arp,
            Err(reason) => {
                info!(%reason, "dropping ARP frame");
                return PacketAction::Dropped(reason);
            }
        };

        match arp.operation {
            ArpOperation::Request => {
                // Opportunistic cache population (spec.md §9 open question,
                // resolved: enabled) to cut down on future probe traffic.
                self.arp.insert(arp.sender_ip, arp.sender_mac, self.now());

                let Some(iface) = self.interfaces.by_ipv4(arp.target_ip) else {
                    return PacketAction::Consumed;
                };
                self.send_arp(iface, arp.sender_mac, arp.sender_ip, ArpOperation::Reply);
                PacketAction::Forwarded
            }
            ArpOperation::Reply => {
                let Some(pending) = self.arp.insert(arp.sender_ip, arp.sender_mac, self.now()) else {
                    return PacketAction::Consumed;
                };
                for parked in pending.parked {
                    let Some(egress_iface) = self.interfaces.by_name(&parked.egress_iface) else {
                        continue;
                    };
                    let mut owned = parked.frame;
                    self.send_ethernet(egress_iface, arp.sender_mac, &mut owned);
                }
                self.arp.destroy_request(arp.sender_ip);
                PacketAction::Consumed
            }
            ArpOperation::Other(op) => {
                info!(opcode = op, "dropping ARP frame with unrecognized opcode");
                PacketAction::Dropped(DropReason::UnknownArpOpcode(op))
            }
        }
    }

    fn handle_ipv4_frame(&self, frame: &[u8]) -> PacketAction {
        let ip_bytes = &frame[ETH_HEADER_LEN..];
        if ip_bytes.len() < IP_HEADER_LEN {
            info!("dropping runt IPv4 frame");
            return PacketAction::Dropped(DropReason::RuntIpv4);
        }
        if !Ipv4Header::verify_checksum(ip_bytes) {
            info!("dropping IPv4 frame with bad checksum");
            return PacketAction::Dropped(DropReason::BadIpChecksum);
        }
        let mut header = match Ipv4Header::read(ip_bytes) {
            Ok(header) => header,
            Err(reason) => return PacketAction::Dropped(reason),
        };

        let header_len = header.header_len();
        header.ttl = header.ttl.saturating_sub(1);
        header.recompute_checksum();

        if header.ttl == 0 {
            info!(source = ?header.source, "TTL expired, sending time exceeded");
            let mut snippet = header.to_bytes();
            snippet.extend_from_slice(&ip_bytes[header_len..]);
            self.send_icmp(header.source, TIME_EXCEEDED, CODE_TTL_EXCEEDED, &snippet);
            return PacketAction::Dropped(DropReason::TtlExpired);
        }

        let payload = &ip_bytes[header_len..];

        if self.interfaces.is_local(header.destination) {
            return self.handle_for_us(&header, payload, frame, header_len);
        }

        self.handle_transit(&header, ip_bytes, header_len)
    }

    fn handle_for_us(&self, header: &Ipv4Header, payload: &[u8], original_frame: &[u8], ip_header_len: usize) -> PacketAction {
        match header.protocol {
            Ipv4Protocol::Icmp => {
                let icmp = match EchoMessage::read(payload) {
                    Ok(icmp) => icmp,
                    Err(reason) => return PacketAction::Dropped(reason),
                };
                if icmp.icmp_type != icmp::ECHO_REQUEST {
                    info!(icmp_type = icmp.icmp_type, "dropping non-echo ICMP addressed to router");
                    return PacketAction::Dropped(DropReason::IcmpNonEcho(icmp.icmp_type));
                }
                self.send_echo_reply(header, &icmp, original_frame, ip_header_len);
                PacketAction::Forwarded
            }
            Ipv4Protocol::Other(protocol) => {
                info!(source = ?header.source, protocol, "sending destination port unreachable");
                let mut snippet = header.to_bytes();
                snippet.extend_from_slice(payload);
                self.send_icmp(header.source, DEST_UNREACHABLE, CODE_PORT_UNREACHABLE, &snippet);
                PacketAction::Dropped(DropReason::UnsupportedTransport(protocol))
            }
        }
    }

    /// Synthesizes an echo reply by repurposing a clone of the received
    /// buffer in place (`spec.md` §9: isolate the in-place-mutation
    /// optimization to this single path; every other egress path
    /// allocates fresh buffers).
    fn send_echo_reply(&self, header: &Ipv4Header, request: &EchoMessage, original_frame: &[u8], ip_header_len: usize) {
        let reply = EchoMessage::echo_reply_from(request);

        let mut frame = original_frame.to_vec();
        let mut ip_reply = header.clone();
        std::mem::swap(&mut ip_reply.source, &mut ip_reply.destination);
        ip_reply.ttl = crate::wire::ipv4::DEFAULT_TTL;
        ip_reply.recompute_checksum();

        let ip_start = ETH_HEADER_LEN;
        frame.truncate(ip_start + ip_header_len);
        frame[ip_start..ip_start + ip_header_len].copy_from_slice(&ip_reply.to_bytes());
        frame.extend_from_slice(&reply.to_bytes());

        let dst_ip = ip_reply.destination;
        let _ = self.route_and_deliver(dst_ip, frame);
    }

    fn handle_transit(&self, header: &Ipv4Header, ip_bytes: &[u8], header_len: usize) -> PacketAction {
        let mut frame = vec![0u8; ETH_HEADER_LEN];
        frame.extend_from_slice(&header.to_bytes());
        frame.extend_from_slice(&ip_bytes[header_len..]);

        match self.route_and_deliver(header.destination, frame) {
            Some((_, true)) => PacketAction::Forwarded,
            Some((_, false)) => PacketAction::Parked,
            None => {
                info!(destination = ?header.destination, "no route, sending net unreachable");
                let mut snippet = header.to_bytes();
                snippet.extend_from_slice(&ip_bytes[header_len..]);
                self.send_icmp(header.source, DEST_UNREACHABLE, CODE_NET_UNREACHABLE, &snippet);
                PacketAction::Dropped(DropReason::NoRoute)
            }
        }
    }
}
