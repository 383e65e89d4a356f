//! Pure byte-buffer codecs for the link/network/transport headers this
//! router touches. Every multi-byte wire field is explicitly converted
//! between network (big-endian) and host byte order at the read/write
//! boundary; in-memory structs use host order throughout.

pub mod arp;
pub mod checksum;
pub mod ethernet;
pub mod icmp;
pub mod ipv4;
