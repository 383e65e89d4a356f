//! ICMP (RFC 792): echo request/reply and the destination-unreachable /
//! time-exceeded "type 3 / type 11" layout (4 unused bytes followed by 28
//! bytes of the triggering datagram).

use crate::error::DropReason;
use crate::wire::checksum::internet_checksum;

pub const ECHO_REQUEST: u8 = 8;
pub const ECHO_REPLY: u8 = 0;
pub const DEST_UNREACHABLE: u8 = 3;
pub const TIME_EXCEEDED: u8 = 11;

pub const CODE_NET_UNREACHABLE: u8 = 0;
pub const CODE_HOST_UNREACHABLE: u8 = 1;
pub const CODE_PORT_UNREACHABLE: u8 = 3;
pub const CODE_TTL_EXCEEDED: u8 = 0;

/// Bytes of the offending datagram carried in a type-3/type-11 message.
pub const TYPE3_DATA_LEN: usize = 28;

/// Size of an ICMP header common to every message type (type, code,
/// checksum, then 4 type-specific bytes — identifier+sequence for echo,
/// unused+next-mtu for type 3/11).
pub const HEADER_LEN: usize = 8;

/// An echo request/reply message: 8-byte header + arbitrary payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoMessage {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

impl EchoMessage {
    pub fn read(bytes: &[u8]) -> Result<Self, DropReason> {
        if bytes.len() < HEADER_LEN {
            return Err(DropReason::RuntIpv4);
        }
        Ok(Self {
            icmp_type: bytes[0],
            code: bytes[1],
            checksum: u16::from_be_bytes([bytes[2], bytes[3]]),
            identifier: u16::from_be_bytes([bytes[4], bytes[5]]),
            sequence: u16::from_be_bytes([bytes[6], bytes[7]]),
            payload: bytes[8..].to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.push(self.icmp_type);
        out.push(self.code);
        out.extend_from_slice(&self.checksum.to_be_bytes());
        out.extend_from_slice(&self.identifier.to_be_bytes());
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Recomputes the checksum over the full message (header + payload),
    /// never `HEADER_LEN` alone.
    pub fn recompute_checksum(&mut self) {
        self.checksum = 0;
        self.checksum = internet_checksum(&self.to_bytes());
    }

    pub fn echo_reply_from(request: &EchoMessage) -> Self {
        let mut reply = Self {
            icmp_type: ECHO_REPLY,
            code: 0,
            checksum: 0,
            identifier: request.identifier,
            sequence: request.sequence,
            payload: request.payload.clone(),
        };
        reply.recompute_checksum();
        reply
    }
}

/// A type-3 (destination unreachable) or type-11 (time exceeded) message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type3Message {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub unused: u16,
    pub next_mtu: u16,
    /// First 28 bytes of the IP datagram that triggered this message.
    pub data: [u8; TYPE3_DATA_LEN],
}

impl Type3Message {
    pub fn new(icmp_type: u8, code: u8, offending_datagram: &[u8]) -> Self {
        let mut data = [0u8; TYPE3_DATA_LEN];
        let take = offending_datagram.len().min(TYPE3_DATA_LEN);
        data[..take].copy_from_slice(&offending_datagram[..take]);

        let mut msg = Self {
            icmp_type,
            code,
            checksum: 0,
            unused: 0,
            next_mtu: 0,
            data,
        };
        msg.recompute_checksum();
        msg
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + TYPE3_DATA_LEN);
        out.push(self.icmp_type);
        out.push(self.code);
        out.extend_from_slice(&self.checksum.to_be_bytes());
        out.extend_from_slice(&self.unused.to_be_bytes());
        out.extend_from_slice(&self.next_mtu.to_be_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    pub fn recompute_checksum(&mut self) {
        self.checksum = 0;
        self.checksum = internet_checksum(&self.to_bytes());
    }
}
