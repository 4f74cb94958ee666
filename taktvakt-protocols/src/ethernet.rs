//! ## taktvakt-protocols::ethernet
//! Ethernet II header, with one optional 802.1Q tag skipped.

use std::fmt;

use crate::error::{ensure, read_u16, ParseError};

pub const ETHER_TYPE_IPV4: u16 = 0x0800;
pub const ETHER_TYPE_ARP: u16 = 0x0806;
pub const ETHER_TYPE_VLAN: u16 = 0x8100;
pub const ETHER_TYPE_IPV6: u16 = 0x86DD;

const HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xFF; 6]);
    pub const ZERO: MacAddr = MacAddr([0; 6]);

    fn from_slice(bytes: &[u8]) -> Self {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&bytes[..6]);
        MacAddr(mac)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Zero-copy view of an Ethernet frame.
#[derive(Debug, Clone, Copy)]
pub struct EthernetFrame<'a> {
    pub destination: MacAddr,
    pub source: MacAddr,
    /// EtherType after any VLAN tag.
    pub ether_type: u16,
    pub vlan_id: Option<u16>,
    pub payload: &'a [u8],
}

impl<'a> EthernetFrame<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        ensure("ethernet", data, HEADER_LEN)?;
        let destination = MacAddr::from_slice(&data[0..6]);
        let source = MacAddr::from_slice(&data[6..12]);
        let mut ether_type = read_u16(data, 12);
        let mut offset = HEADER_LEN;
        let mut vlan_id = None;

        if ether_type == ETHER_TYPE_VLAN {
            ensure("802.1Q", data, HEADER_LEN + VLAN_TAG_LEN)?;
            vlan_id = Some(read_u16(data, 14) & 0x0FFF);
            ether_type = read_u16(data, 16);
            offset += VLAN_TAG_LEN;
        }

        Ok(Self {
            destination,
            source,
            ether_type,
            vlan_id,
            payload: &data[offset..],
        })
    }

    pub fn is_ipv4(&self) -> bool {
        self.ether_type == ETHER_TYPE_IPV4
    }
}
