//! IPv4 header parsing/writing (RFC 791). Options, if present on a received
//! datagram, are preserved as opaque bytes between the fixed header and the
//! payload but are never interpreted.

use crate::error::DropReason;
use crate::wire::arp::Ipv4Address;
use crate::wire::checksum::{internet_checksum, verify_checksum};

/// Size of the fixed (no-options) IPv4 header.
pub const HEADER_LEN: usize = 20;

pub const DEFAULT_TTL: u8 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ipv4Protocol {
    Icmp,
    Other(u8),
}

impl From<u8> for Ipv4Protocol {
    fn from(value: u8) -> Self {
        match value {
            1 => Ipv4Protocol::Icmp,
            other => Ipv4Protocol::Other(other),
        }
    }
}

impl From<Ipv4Protocol> for u8 {
    fn from(value: Ipv4Protocol) -> Self {
        match value {
            Ipv4Protocol::Icmp => 1,
            Ipv4Protocol::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version_ihl: u8,
    pub tos: u8,
    pub total_length: u16,
    pub id: u16,
    pub flags_fragment_offset: u16,
    pub ttl: u8,
    pub protocol: Ipv4Protocol,
    pub checksum: u16,
    pub source: Ipv4Address,
    pub destination: Ipv4Address,
    pub options: Vec<u8>,
}

impl Ipv4Header {
    /// Length in bytes of this header including options (`ihl * 4`).
    pub fn header_len(&self) -> usize {
        (self.version_ihl & 0x0F) as usize * 4
    }

    pub fn new(source: Ipv4Address, destination: Ipv4Address, ttl: u8, protocol: Ipv4Protocol, payload_len: usize) -> Self {
        Self {
            version_ihl: 0x45,
            tos: 0,
            total_length: (HEADER_LEN + payload_len) as u16,
            id: 0,
            flags_fragment_offset: 0,
            ttl,
            protocol,
            checksum: 0,
            source,
            destination,
            options: Vec::new(),
        }
    }

    /// Reads the fixed header only; `bytes` must be at least `HEADER_LEN`.
    /// Does not validate the checksum — see `verify_checksum_against`.
    pub fn read(bytes: &[u8]) -> Result<Self, DropReason> {
        if bytes.len() < HEADER_LEN {
            return Err(DropReason::RuntIpv4);
        }

        let version_ihl = bytes[0];
        let ihl = (version_ihl & 0x0F) as usize * 4;
        let options = if ihl > HEADER_LEN && bytes.len() >= ihl {
            bytes[HEADER_LEN..ihl].to_vec()
        } else {
            Vec::new()
        };

        Ok(Self {
            version_ihl,
            tos: bytes[1],
            total_length: u16::from_be_bytes([bytes[2], bytes[3]]),
            id: u16::from_be_bytes([bytes[4], bytes[5]]),
            flags_fragment_offset: u16::from_be_bytes([bytes[6], bytes[7]]),
            ttl: bytes[8],
            protocol: bytes[9].into(),
            checksum: u16::from_be_bytes([bytes[10], bytes[11]]),
            source: bytes[12..16].try_into().unwrap(),
            destination: bytes[16..20].try_into().unwrap(),
            options,
        })
    }

    pub fn write(&self, out: &mut [u8]) {
        out[0] = self.version_ihl;
        out[1] = self.tos;
        out[2..4].copy_from_slice(&self.total_length.to_be_bytes());
        out[4..6].copy_from_slice(&self.id.to_be_bytes());
        out[6..8].copy_from_slice(&self.flags_fragment_offset.to_be_bytes());
        out[8] = self.ttl;
        out[9] = self.protocol.into();
        out[10..12].copy_from_slice(&self.checksum.to_be_bytes());
        out[12..16].copy_from_slice(&self.source);
        out[16..20].copy_from_slice(&self.destination);
        out[20..20 + self.options.len()].copy_from_slice(&self.options);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.header_len()];
        self.write(&mut out);
        out
    }

    /// Verifies the checksum of the header (including options, if any) at
    /// the front of `frame_from_header`. The header's length is read from
    /// the IHL nibble rather than assumed to be `HEADER_LEN`, so it covers
    /// exactly the bytes `recompute_checksum` hashed when options are
    /// present.
    pub fn verify_checksum(frame_from_header: &[u8]) -> bool {
        if frame_from_header.is_empty() {
            return false;
        }
        let ihl = (frame_from_header[0] & 0x0F) as usize * 4;
        if ihl < HEADER_LEN || frame_from_header.len() < ihl {
            return false;
        }
        verify_checksum(&frame_from_header[..ihl], 10)
    }

    /// Recomputes and stores this header's checksum in place.
    pub fn recompute_checksum(&mut self) {
        self.checksum = 0;
        let bytes = self.to_bytes();
        self.checksum = internet_checksum(&bytes);
    }
}
