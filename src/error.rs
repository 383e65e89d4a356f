//! Crate-wide error types. Startup/config failures are ordinary `thiserror`
//! errors propagated with `?`; per-packet malformed input is not an "error"
//! in the `Result`-propagation sense — per the spec it is a silent drop —
//! so it is represented by `DropReason`, an enum returned internally by the
//! pipeline for logging and for tests to assert against.

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: malformed interface line: {text:?}")]
    MalformedInterfaceLine {
        path: String,
        line: usize,
        text: String,
    },

    #[error("{path}:{line}: malformed route line: {text:?}")]
    MalformedRouteLine {
        path: String,
        line: usize,
        text: String,
    },

    #[error("invalid MAC address {0:?}")]
    InvalidMac(String),

    #[error("invalid IPv4 address {0:?}")]
    InvalidIpv4(String),
}

/// Why a packet was dropped without a response. Every variant is logged at
/// `tracing::info!` at the drop site; none of these propagate as `Result`
/// errors since a single malformed or unrouteable packet must never take
/// down the forwarding loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Buffer shorter than the Ethernet header.
    RuntFrame,
    /// Ethernet destination is neither ours nor broadcast.
    ForeignDestination,
    /// Buffer shorter than an ARP packet.
    RuntArp,
    /// ARP opcode other than request/reply.
    UnknownArpOpcode(u16),
    /// Buffer shorter than an IPv4 header.
    RuntIpv4,
    /// IPv4 header checksum did not verify.
    BadIpChecksum,
    /// TTL reached zero; an ICMP time-exceeded was sent instead.
    TtlExpired,
    /// No matching route; an ICMP net-unreachable was sent instead.
    NoRoute,
    /// ICMP message addressed to us that was not an echo request.
    IcmpNonEcho(u8),
    /// Non-ICMP transport addressed to the router itself.
    UnsupportedTransport(u8),
    /// A synthesized ICMP reply itself could not be routed and was dropped.
    Unroutable,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::RuntFrame => write!(f, "frame shorter than an Ethernet header"),
            DropReason::ForeignDestination => write!(f, "Ethernet destination not ours or broadcast"),
            DropReason::RuntArp => write!(f, "frame shorter than an ARP packet"),
            DropReason::UnknownArpOpcode(op) => write!(f, "unrecognized ARP opcode {op}"),
            DropReason::RuntIpv4 => write!(f, "frame shorter than an IPv4 header"),
            DropReason::BadIpChecksum => write!(f, "IPv4 header checksum mismatch"),
            DropReason::TtlExpired => write!(f, "TTL reached zero"),
            DropReason::NoRoute => write!(f, "no matching route"),
            DropReason::IcmpNonEcho(t) => write!(f, "ICMP type {t} addressed to router, not echo request"),
            DropReason::UnsupportedTransport(p) => write!(f, "protocol {p} addressed to router has no transport handling"),
            DropReason::Unroutable => write!(f, "synthesized reply could not be routed"),
        }
    }
}
