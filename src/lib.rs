//! Forwarding plane of an IPv4 software router: link-layer validation,
//! IPv4 header validation and rewriting, ICMP reply synthesis, routing-
//! table resolution, and ARP-backed address resolution with
//! retransmission and parking of in-flight frames.
//!
//! The host I/O shim, configuration file parsing, and CLI bootstrap are
//! the only pieces of this crate that know anything about the outside
//! world; everything under `wire`, `interface`, `route`, `arp_table`,
//! `pipeline`, and `egress` is pure, synchronous, and testable without a
//! real network device.

pub mod arp_table;
pub mod config;
pub mod egress;
pub mod error;
pub mod host_io;
pub mod interface;
pub mod pipeline;
pub mod route;
pub mod router;
pub mod time;
pub mod timer;
pub mod wire;
