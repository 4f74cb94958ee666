//! ## taktvakt-protocols::transport
//! ICMP, UDP and TCP headers carried in IPv4.

use crate::error::{ensure, read_u16, ParseError};
use crate::ipv4::{PROTO_ICMP, PROTO_TCP, PROTO_UDP};

#[derive(Debug, Clone, Copy)]
pub struct IcmpMessage<'a> {
    pub icmp_type: u8,
    pub code: u8,
    pub payload: &'a [u8],
}

#[derive(Debug, Clone, Copy)]
pub struct UdpDatagram<'a> {
    pub source_port: u16,
    pub destination_port: u16,
    pub payload: &'a [u8],
}

#[derive(Debug, Clone, Copy)]
pub struct TcpSegment<'a> {
    pub source_port: u16,
    pub destination_port: u16,
    pub flags: u8,
    pub payload: &'a [u8],
}

/// Transport layer of an IPv4 packet.
#[derive(Debug, Clone, Copy)]
pub enum Transport<'a> {
    Icmp(IcmpMessage<'a>),
    Udp(UdpDatagram<'a>),
    Tcp(TcpSegment<'a>),
    /// Any other protocol number; the payload is the raw IP payload.
    Other { protocol: u8, payload: &'a [u8] },
}

impl<'a> Transport<'a> {
    pub fn parse(protocol: u8, data: &'a [u8]) -> Result<Self, ParseError> {
        match protocol {
            PROTO_ICMP => {
                ensure("icmp", data, 8)?;
                Ok(Transport::Icmp(IcmpMessage {
                    icmp_type: data[0],
                    code: data[1],
                    payload: &data[8..],
                }))
            }
            PROTO_UDP => {
                ensure("udp", data, 8)?;
                // The UDP length field may undercount; trust the IP bound.
                let length = usize::from(read_u16(data, 4)).clamp(8, data.len());
                Ok(Transport::Udp(UdpDatagram {
                    source_port: read_u16(data, 0),
                    destination_port: read_u16(data, 2),
                    payload: &data[8..length],
                }))
            }
            PROTO_TCP => {
                ensure("tcp", data, 20)?;
                let offset = data[12] >> 4;
                let header_len = usize::from(offset) * 4;
                if header_len < 20 {
                    return Err(ParseError::InvalidDataOffset(offset));
                }
                ensure("tcp options", data, header_len)?;
                Ok(Transport::Tcp(TcpSegment {
                    source_port: read_u16(data, 0),
                    destination_port: read_u16(data, 2),
                    flags: data[13],
                    payload: &data[header_len..],
                }))
            }
            other => Ok(Transport::Other {
                protocol: other,
                payload: data,
            }),
        }
    }

    /// Application payload.
    pub fn payload(&self) -> &'a [u8] {
        match *self {
            Transport::Icmp(icmp) => icmp.payload,
            Transport::Udp(udp) => udp.payload,
            Transport::Tcp(tcp) => tcp.payload,
            Transport::Other { payload, .. } => payload,
        }
    }

    pub fn source_port(&self) -> Option<u16> {
        match self {
            Transport::Udp(udp) => Some(udp.source_port),
            Transport::Tcp(tcp) => Some(tcp.source_port),
            _ => None,
        }
    }
}
