//! ## taktvakt-protocols::ipv4
//! IPv4 header. Options are skipped; fragments are not reassembled.

use std::net::Ipv4Addr;

use crate::error::{ensure, read_u16, ParseError};

pub const PROTO_ICMP: u8 = 1;
pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;

const MIN_HEADER_LEN: usize = 20;

/// Zero-copy view of an IPv4 packet.
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Packet<'a> {
    pub header_len: usize,
    pub total_len: usize,
    pub ttl: u8,
    pub protocol: u8,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    /// Bytes after the header, bounded by the total length field.
    pub payload: &'a [u8],
}

impl<'a> Ipv4Packet<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        let packet = Self::parse_header(data)?;
        // Captures can carry Ethernet padding after the datagram, never less.
        if packet.is_truncated() {
            return Err(ParseError::TotalLengthMismatch {
                total: packet.total_len,
                captured: data.len(),
            });
        }
        Ok(packet)
    }

    /// Parses the fixed header and options only. A capture cut short of
    /// `total_len` is accepted; `payload` then ends at the captured bytes.
    pub fn parse_header(data: &'a [u8]) -> Result<Self, ParseError> {
        ensure("ipv4", data, MIN_HEADER_LEN)?;

        let version = data[0] >> 4;
        if version != 4 {
            return Err(ParseError::InvalidIpVersion(version));
        }
        let ihl = data[0] & 0x0F;
        let header_len = usize::from(ihl) * 4;
        if header_len < MIN_HEADER_LEN {
            return Err(ParseError::InvalidHeaderLength(ihl));
        }
        ensure("ipv4 options", data, header_len)?;

        let total_len = usize::from(read_u16(data, 2));
        if total_len < header_len {
            return Err(ParseError::InvalidHeaderLength(ihl));
        }

        Ok(Self {
            header_len,
            total_len,
            ttl: data[8],
            protocol: data[9],
            source: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            destination: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
            payload: &data[header_len..total_len.min(data.len())],
        })
    }

    /// True when fewer bytes were captured than `total_len` announces.
    pub fn is_truncated(&self) -> bool {
        self.header_len + self.payload.len() < self.total_len
    }
}

/// Internet checksum over `data` (RFC 1071).
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = data
        .chunks(2)
        .map(|pair| match *pair {
            [hi, lo] => u32::from(u16::from_be_bytes([hi, lo])),
            [hi] => u32::from(hi) << 8,
            _ => 0,
        })
        .sum();
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}
