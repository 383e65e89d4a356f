//! Address Resolution Protocol (RFC 826) over Ethernet/IPv4.

use crate::error::DropReason;
use crate::wire::ethernet::MacAddress;

pub type Ipv4Address = [u8; 4];

/// Size of an ARP packet specialized to Ethernet hardware / IPv4 protocol
/// addresses: the 8-byte fixed header plus 2*(6+4) address bytes.
pub const PACKET_LEN: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOperation {
    Request,
    Reply,
    Other(u16),
}

impl From<u16> for ArpOperation {
    fn from(value: u16) -> Self {
        match value {
            1 => ArpOperation::Request,
            2 => ArpOperation::Reply,
            other => ArpOperation::Other(other),
        }
    }
}

impl From<ArpOperation> for u16 {
    fn from(value: ArpOperation) -> Self {
        match value {
            ArpOperation::Request => 1,
            ArpOperation::Reply => 2,
            ArpOperation::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    pub hardware_type: u16,
    pub protocol_type: u16,
    pub hardware_len: u8,
    pub protocol_len: u8,
    pub operation: ArpOperation,
    pub sender_mac: MacAddress,
    pub sender_ip: Ipv4Address,
    pub target_mac: MacAddress,
    pub target_ip: Ipv4Address,
}

impl ArpPacket {
    pub fn new(
        operation: ArpOperation,
        sender_mac: MacAddress,
        sender_ip: Ipv4Address,
        target_mac: MacAddress,
        target_ip: Ipv4Address,
    ) -> Self {
        Self {
            hardware_type: 1, // Ethernet
            protocol_type: 0x0800,
            hardware_len: 6,
            protocol_len: 4,
            operation,
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        }
    }

    pub fn read(bytes: &[u8]) -> Result<Self, DropReason> {
        if bytes.len() < PACKET_LEN {
            return Err(DropReason::RuntArp);
        }

        Ok(Self {
            hardware_type: u16::from_be_bytes([bytes[0], bytes[1]]),
            protocol_type: u16::from_be_bytes([bytes[2], bytes[3]]),
            hardware_len: bytes[4],
            protocol_len: bytes[5],
            operation: u16::from_be_bytes([bytes[6], bytes[7]]).into(),
            sender_mac: bytes[8..14].try_into().unwrap(),
            sender_ip: bytes[14..18].try_into().unwrap(),
            target_mac: bytes[18..24].try_into().unwrap(),
            target_ip: bytes[24..28].try_into().unwrap(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PACKET_LEN);
        bytes.extend_from_slice(&self.hardware_type.to_be_bytes());
        bytes.extend_from_slice(&self.protocol_type.to_be_bytes());
        bytes.push(self.hardware_len);
        bytes.push(self.protocol_len);
        bytes.extend_from_slice(&u16::from(self.operation).to_be_bytes());
        bytes.extend_from_slice(&self.sender_mac);
        bytes.extend_from_slice(&self.sender_ip);
        bytes.extend_from_slice(&self.target_mac);
        bytes.extend_from_slice(&self.target_ip);
        bytes
    }
}
