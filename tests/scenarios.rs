//! End-to-end scenario tests drawn directly from `spec.md` §8, exercised
//! against a `Router` wired to the in-memory `ChannelHostIo` test double.
//! ARP-timing scenarios (3 and 4) drive a frozen clock instead of
//! sleeping in real time.

use std::sync::Arc;

use ipv4_router::host_io::ChannelHostIo;
use ipv4_router::interface::{Interface, InterfaceTable};
use ipv4_router::pipeline::PacketAction;
use ipv4_router::route::{Route, RoutingTable};
use ipv4_router::router::Router;
use ipv4_router::time::Clock;
use ipv4_router::wire::arp::{ArpOperation, ArpPacket};
use ipv4_router::wire::checksum::internet_checksum;
use ipv4_router::wire::ethernet::{EtherType, EthernetHeader, HEADER_LEN as ETH_LEN};
use ipv4_router::wire::icmp::{self, EchoMessage, Type3Message};
use ipv4_router::wire::ipv4::{Ipv4Header, Ipv4Protocol, HEADER_LEN as IP_LEN};

fn eth1() -> Interface {
    Interface::new("eth1", [1; 6], [10, 0, 1, 1])
}

fn eth2() -> Interface {
    Interface::new("eth2", [2; 6], [10, 0, 2, 1])
}

fn build_ip_frame(eth_dst: [u8; 6], eth_src: [u8; 6], ip: &mut Ipv4Header, payload: &[u8]) -> Vec<u8> {
    ip.recompute_checksum();
    let mut frame = vec![0u8; ETH_LEN];
    EthernetHeader {
        destination: eth_dst,
        source: eth_src,
        ethertype: EtherType::Ipv4,
    }
    .write(&mut frame);
    frame.extend_from_slice(&ip.to_bytes());
    frame.extend_from_slice(payload);
    frame
}

fn build_arp_frame(eth_dst: [u8; 6], eth_src: [u8; 6], arp: &ArpPacket) -> Vec<u8> {
    let mut frame = vec![0u8; ETH_LEN];
    EthernetHeader {
        destination: eth_dst,
        source: eth_src,
        ethertype: EtherType::Arp,
    }
    .write(&mut frame);
    frame.extend_from_slice(&arp.to_bytes());
    frame
}

fn parse_ip_and_icmp(frame: &[u8]) -> (Ipv4Header, EchoMessage) {
    let ip = Ipv4Header::read(&frame[ETH_LEN..]).unwrap();
    let header_len = ip.header_len();
    let icmp = EchoMessage::read(&frame[ETH_LEN + header_len..]).unwrap();
    (ip, icmp)
}

/// Scenario 1: echo request to the router's own interface gets an echo
/// reply with source/destination swapped, type 0, identical id/seq/payload.
#[test]
fn EchoToRouter_RepliesWithSwappedAddressesAndType0() {
    let interfaces = InterfaceTable::new(vec![eth1()]);
    let routes = RoutingTable::new(vec![Route::new([10, 0, 1, 0], [255, 255, 255, 0], [0, 0, 0, 0], "eth1")]);
    let io = Arc::new(ChannelHostIo::new());
    let router = Router::with_clock(interfaces, routes, io.clone(), Clock::frozen());
    router.arp.insert([10, 0, 1, 2], [0xaa; 6], router.now());

    let mut request = EchoMessage {
        icmp_type: icmp::ECHO_REQUEST,
        code: 0,
        checksum: 0,
        identifier: 7,
        sequence: 1,
        payload: b"hi".to_vec(),
    };
    request.recompute_checksum();

    let mut ip = Ipv4Header::new([10, 0, 1, 2], [10, 0, 1, 1], 64, Ipv4Protocol::Icmp, request.to_bytes().len());
    let frame = build_ip_frame([1; 6], [0xaa; 6], &mut ip, &request.to_bytes());

    let action = router.handle_packet("eth1", &frame);
    assert_eq!(action, PacketAction::Forwarded);

    let sent = io.drain("eth1");
    assert_eq!(sent.len(), 1);
    let (reply_ip, reply_icmp) = parse_ip_and_icmp(&sent[0]);
    assert_eq!(reply_ip.source, [10, 0, 1, 1]);
    assert_eq!(reply_ip.destination, [10, 0, 1, 2]);
    assert!(Ipv4Header::verify_checksum(&sent[0][ETH_LEN..]));
    assert_eq!(reply_icmp.icmp_type, icmp::ECHO_REPLY);
    assert_eq!(reply_icmp.identifier, 7);
    assert_eq!(reply_icmp.sequence, 1);
    assert_eq!(reply_icmp.payload, b"hi");
    assert_eq!(internet_checksum(&reply_icmp.to_bytes()), 0);
}

/// Scenario 2: transit forwarding with an ARP cache hit rewrites the
/// Ethernet header, decrements TTL, and recomputes the IP checksum.
#[test]
fn TransitWithArpCacheHit_RewritesEthernetAndDecrementsTtl() {
    let interfaces = InterfaceTable::new(vec![eth1(), eth2()]);
    let routes = RoutingTable::new(vec![Route::new([10, 0, 2, 0], [255, 255, 255, 0], [10, 0, 2, 1], "eth2")]);
    let io = Arc::new(ChannelHostIo::new());
    let router = Router::with_clock(interfaces, routes, io.clone(), Clock::frozen());
    router.arp.insert([10, 0, 2, 1], [0xbb; 6], router.now());

    let mut ip = Ipv4Header::new([10, 0, 1, 50], [10, 0, 2, 42], 5, Ipv4Protocol::Other(17), 4);
    let frame = build_ip_frame([1; 6], [0xaa; 6], &mut ip, &[1, 2, 3, 4]);

    let action = router.handle_packet("eth1", &frame);
    assert_eq!(action, PacketAction::Forwarded);

    let sent = io.drain("eth2");
    assert_eq!(sent.len(), 1);
    let eth = EthernetHeader::read(&sent[0]).unwrap();
    assert_eq!(eth.destination, [0xbb; 6]);
    assert_eq!(eth.source, [2; 6]);
    let out_ip = Ipv4Header::read(&sent[0][ETH_LEN..]).unwrap();
    assert_eq!(out_ip.ttl, 4);
    assert!(Ipv4Header::verify_checksum(&sent[0][ETH_LEN..]));
}

/// Scenario 3: an ARP miss parks the frame and probes immediately; once
/// the reply arrives (simulated after advancing the frozen clock), exactly
/// one IPv4 frame is emitted with the TTL decremented once.
#[test]
fn TransitWithArpMiss_ParksAndDrainsOnReply() {
    let interfaces = InterfaceTable::new(vec![eth1(), eth2()]);
    let routes = RoutingTable::new(vec![Route::new([10, 0, 2, 0], [255, 255, 255, 0], [10, 0, 2, 1], "eth2")]);
    let io = Arc::new(ChannelHostIo::new());
    let router = Router::with_clock(interfaces, routes, io.clone(), Clock::frozen());

    let mut ip = Ipv4Header::new([10, 0, 1, 50], [10, 0, 2, 42], 5, Ipv4Protocol::Other(17), 0);
    let frame = build_ip_frame([1; 6], [0xaa; 6], &mut ip, &[]);

    let action = router.handle_packet("eth1", &frame);
    assert_eq!(action, PacketAction::Parked);

    // The first ARP probe is sent immediately, without waiting for a sweep.
    let probes = io.drain("eth2");
    assert_eq!(probes.len(), 1);
    let arp = ArpPacket::read(&probes[0][ETH_LEN..]).unwrap();
    assert_eq!(arp.operation, ArpOperation::Request);
    assert_eq!(arp.target_ip, [10, 0, 2, 1]);

    router.advance_clock(std::time::Duration::from_secs(2));
    let reply = ArpPacket::new(ArpOperation::Reply, [0xbb; 6], [10, 0, 2, 1], [2; 6], [10, 0, 2, 1]);
    let reply_frame = build_arp_frame([2; 6], [0xbb; 6], &reply);
    router.handle_packet("eth2", &reply_frame);

    let sent = io.drain("eth2");
    assert_eq!(sent.len(), 1);
    let out_ip = Ipv4Header::read(&sent[0][ETH_LEN..]).unwrap();
    assert_eq!(out_ip.ttl, 4);
    let eth = EthernetHeader::read(&sent[0]).unwrap();
    assert_eq!(eth.destination, [0xbb; 6]);
}

/// Scenario 4: no ARP reply ever arrives. Five probes at >=1s spacing,
/// then an ICMP host-unreachable toward the original source, and an empty
/// pending queue.
#[test]
fn ArpTimeout_SendsFiveProbesThenHostUnreachable() {
    let interfaces = InterfaceTable::new(vec![eth1(), eth2()]);
    let routes = RoutingTable::new(vec![
        Route::new([10, 0, 1, 0], [255, 255, 255, 0], [0, 0, 0, 0], "eth1"),
        Route::new([10, 0, 2, 0], [255, 255, 255, 0], [10, 0, 2, 1], "eth2"),
    ]);
    let io = Arc::new(ChannelHostIo::new());
    let router = Router::with_clock(interfaces, routes, io.clone(), Clock::frozen());
    router.arp.insert([10, 0, 1, 50], [9; 6], router.now());

    let mut ip = Ipv4Header::new([10, 0, 1, 50], [10, 0, 2, 42], 10, Ipv4Protocol::Other(17), 0);
    let frame = build_ip_frame([1; 6], [0xaa; 6], &mut ip, &[]);
    assert_eq!(router.handle_packet("eth1", &frame), PacketAction::Parked);
    assert_eq!(io.drain("eth2").len(), 1); // first probe, sent immediately

    for _ in 0..4 {
        router.advance_clock(std::time::Duration::from_secs(1));
        router.sweep_arp();
    }
    // Four more probes: attempts 2..5.
    let probes = io.drain("eth2");
    assert_eq!(probes.len(), 4);
    for probe in &probes {
        let arp = ArpPacket::read(&probe[ETH_LEN..]).unwrap();
        assert_eq!(arp.operation, ArpOperation::Request);
    }

    router.advance_clock(std::time::Duration::from_secs(1));
    router.sweep_arp();

    let failures = io.drain("eth1");
    assert_eq!(failures.len(), 1);
    let failure_ip = Ipv4Header::read(&failures[0][ETH_LEN..]).unwrap();
    assert_eq!(failure_ip.destination, [10, 0, 1, 50]);
    let icmp = Type3Message::new(icmp::DEST_UNREACHABLE, icmp::CODE_HOST_UNREACHABLE, &[]);
    let header_len = failure_ip.header_len();
    assert_eq!(failures[0][ETH_LEN + header_len], icmp.icmp_type);
    assert_eq!(failures[0][ETH_LEN + header_len + 1], icmp::CODE_HOST_UNREACHABLE);

    assert_eq!(router.arp.pending_len(), 0);
}

/// Scenario 5: TTL expiry emits ICMP time-exceeded carrying the first 28
/// bytes of the datagram as the router actually forwards it — TTL already
/// decremented (to 0) and the IP checksum recomputed to match, not the
/// bytes as they arrived off the wire.
#[test]
fn TtlExpiry_SendsTimeExceededWithPostDecrementSnippet() {
    let interfaces = InterfaceTable::new(vec![eth1(), eth2()]);
    let routes = RoutingTable::new(vec![
        Route::new([10, 0, 1, 0], [255, 255, 255, 0], [0, 0, 0, 0], "eth1"),
        Route::new([10, 0, 2, 0], [255, 255, 255, 0], [10, 0, 2, 1], "eth2"),
    ]);
    let io = Arc::new(ChannelHostIo::new());
    let router = Router::with_clock(interfaces, routes, io.clone(), Clock::frozen());
    router.arp.insert([10, 0, 1, 50], [9; 6], router.now());

    let mut ip = Ipv4Header::new([10, 0, 1, 50], [10, 0, 2, 42], 1, Ipv4Protocol::Other(17), 4);
    let frame = build_ip_frame([1; 6], [0xaa; 6], &mut ip, &[9, 9, 9, 9]);

    let mut expected_header = ip.clone();
    expected_header.ttl = 0;
    expected_header.recompute_checksum();
    let mut expected_snippet = expected_header.to_bytes();
    expected_snippet.extend_from_slice(&[9, 9, 9, 9]);

    let action = router.handle_packet("eth1", &frame);
    match action {
        PacketAction::Dropped(_) => {}
        other => panic!("expected Dropped, got {other:?}"),
    }

    // Routed back out eth1 since the original source is on that subnet.
    let sent = io.drain("eth1");
    assert_eq!(sent.len(), 1);
    let resp_ip = Ipv4Header::read(&sent[0][ETH_LEN..]).unwrap();
    let header_len = resp_ip.header_len();
    assert_eq!(sent[0][ETH_LEN + header_len], icmp::TIME_EXCEEDED);
    assert_eq!(sent[0][ETH_LEN + header_len + 1], icmp::CODE_TTL_EXCEEDED);
    let snippet = &sent[0][ETH_LEN + header_len + 8..ETH_LEN + header_len + 8 + 28];
    assert_eq!(&snippet[..expected_snippet.len()], &expected_snippet[..]);
}

/// Scenario 6: a non-ICMP datagram addressed to the router elicits a
/// destination-port-unreachable message.
#[test]
fn TransportToRouter_SendsPortUnreachable() {
    let interfaces = InterfaceTable::new(vec![eth1()]);
    let routes = RoutingTable::new(vec![Route::new([10, 0, 1, 0], [255, 255, 255, 0], [0, 0, 0, 0], "eth1")]);
    let io = Arc::new(ChannelHostIo::new());
    let router = Router::with_clock(interfaces, routes, io.clone(), Clock::frozen());
    router.arp.insert([10, 0, 1, 2], [0xaa; 6], router.now());

    let mut ip = Ipv4Header::new([10, 0, 1, 2], [10, 0, 1, 1], 64, Ipv4Protocol::Other(17), 4);
    let frame = build_ip_frame([1; 6], [0xaa; 6], &mut ip, &[1, 2, 3, 4]);

    router.handle_packet("eth1", &frame);

    let sent = io.drain("eth1");
    assert_eq!(sent.len(), 1);
    let resp_ip = Ipv4Header::read(&sent[0][ETH_LEN..]).unwrap();
    let header_len = resp_ip.header_len();
    assert_eq!(sent[0][ETH_LEN + header_len], icmp::DEST_UNREACHABLE);
    assert_eq!(sent[0][ETH_LEN + header_len + 1], icmp::CODE_PORT_UNREACHABLE);
}

/// Law: two ARP replies for the same (IP, MAC) collapse to one cache
/// entry and leave the pending queue for that IP empty.
#[test]
fn ArpIdempotence_TwoIdenticalRepliesLeaveOneCacheEntry() {
    let interfaces = InterfaceTable::new(vec![eth2()]);
    let routes = RoutingTable::new(vec![]);
    let io = Arc::new(ChannelHostIo::new());
    let router = Router::with_clock(interfaces, routes, io, Clock::frozen());

    let reply = ArpPacket::new(ArpOperation::Reply, [0xbb; 6], [10, 0, 2, 1], [2; 6], [10, 0, 2, 1]);
    let frame = build_arp_frame([2; 6], [0xbb; 6], &reply);

    router.handle_packet("eth2", &frame);
    router.handle_packet("eth2", &frame);

    assert_eq!(router.arp.cache_len(), 1);
    assert_eq!(router.arp.pending_len(), 0);
}

/// Law: frames parked on the same pending request drain in arrival order.
#[test]
fn DrainOrdering_ParkedFramesEmitInArrivalOrder() {
    let interfaces = InterfaceTable::new(vec![eth1(), eth2()]);
    let routes = RoutingTable::new(vec![Route::new([10, 0, 2, 0], [255, 255, 255, 0], [10, 0, 2, 1], "eth2")]);
    let io = Arc::new(ChannelHostIo::new());
    let router = Router::with_clock(interfaces, routes, io.clone(), Clock::frozen());

    for payload_byte in [1u8, 2, 3] {
        let mut ip = Ipv4Header::new([10, 0, 1, 50], [10, 0, 2, 42 + payload_byte], 10, Ipv4Protocol::Other(17), 1);
        let frame = build_ip_frame([1; 6], [0xaa; 6], &mut ip, &[payload_byte]);
        router.handle_packet("eth1", &frame);
    }
    io.drain("eth2"); // discard the ARP probes from parking

    let reply = ArpPacket::new(ArpOperation::Reply, [0xbb; 6], [10, 0, 2, 1], [2; 6], [10, 0, 2, 1]);
    let reply_frame = build_arp_frame([2; 6], [0xbb; 6], &reply);
    router.handle_packet("eth2", &reply_frame);

    let sent = io.drain("eth2");
    assert_eq!(sent.len(), 3);
    let destinations: Vec<u8> = sent
        .iter()
        .map(|frame| Ipv4Header::read(&frame[ETH_LEN..]).unwrap().destination[3])
        .collect();
    assert_eq!(destinations, vec![43, 44, 45]);
}

/// Invariant: every interface the router's ARP table can be queued
/// against must resolve through the interface table (the pending
/// request's `egress_iface` always names a real interface).
#[test]
fn QueuedRequest_EgressInterfaceExistsInTable() {
    let interfaces = InterfaceTable::new(vec![eth1(), eth2()]);
    let routes = RoutingTable::new(vec![Route::new([10, 0, 2, 0], [255, 255, 255, 0], [10, 0, 2, 1], "eth2")]);
    let io = Arc::new(ChannelHostIo::new());
    let router = Router::with_clock(interfaces, routes, io, Clock::frozen());

    let mut ip = Ipv4Header::new([10, 0, 1, 50], [10, 0, 2, 42], 10, Ipv4Protocol::Other(17), 0);
    let frame = build_ip_frame([1; 6], [0xaa; 6], &mut ip, &[]);
    router.handle_packet("eth1", &frame);

    let pending = router.arp.sweep(router.now());
    assert_eq!(pending.len(), 1);
    for parked in &pending[0].parked {
        assert!(router.interfaces.by_name(&parked.egress_iface).is_some());
    }
}
