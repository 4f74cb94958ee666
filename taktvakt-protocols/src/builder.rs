//! ## taktvakt-protocols::builder
//! Synthetic Ethernet/IPv4 frames for traffic generation and tests.

use std::net::Ipv4Addr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::ethernet::{MacAddr, ETHER_TYPE_IPV4};
use crate::ipv4::{checksum, PROTO_ICMP, PROTO_TCP, PROTO_UDP};

const ICMP_ECHO_REQUEST: u8 = 8;
pub const TCP_SYN: u8 = 0x02;
pub const TCP_ACK: u8 = 0x10;

#[derive(Debug, Clone, Copy)]
pub struct FrameBuilder {
    source_mac: MacAddr,
    destination_mac: MacAddr,
    source_ip: Ipv4Addr,
    destination_ip: Ipv4Addr,
    ttl: u8,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuilder {
    /// Locally administered MACs, 10.0.0.1 → 10.0.0.2, TTL 64.
    pub fn new() -> Self {
        Self {
            source_mac: MacAddr([0x02, 0, 0, 0, 0, 0x01]),
            destination_mac: MacAddr([0x02, 0, 0, 0, 0, 0x02]),
            source_ip: Ipv4Addr::new(10, 0, 0, 1),
            destination_ip: Ipv4Addr::new(10, 0, 0, 2),
            ttl: 64,
        }
    }

    pub fn macs(mut self, source: MacAddr, destination: MacAddr) -> Self {
        self.source_mac = source;
        self.destination_mac = destination;
        self
    }

    pub fn ipv4(mut self, source: Ipv4Addr, destination: Ipv4Addr) -> Self {
        self.source_ip = source;
        self.destination_ip = destination;
        self
    }

    pub fn icmp_echo(&self, sequence: u16, payload: &[u8]) -> Bytes {
        let mut icmp = BytesMut::with_capacity(8 + payload.len());
        icmp.put_u8(ICMP_ECHO_REQUEST);
        icmp.put_u8(0);
        icmp.put_u16(0); // checksum
        icmp.put_u16(0x7476); // identifier
        icmp.put_u16(sequence);
        icmp.put_slice(payload);
        let sum = checksum(&icmp);
        icmp[2..4].copy_from_slice(&sum.to_be_bytes());
        self.raw_ipv4(PROTO_ICMP, &icmp)
    }

    /// UDP checksum is left at zero (permitted for IPv4).
    pub fn udp(&self, source_port: u16, destination_port: u16, payload: &[u8]) -> Bytes {
        let mut udp = BytesMut::with_capacity(8 + payload.len());
        udp.put_u16(source_port);
        udp.put_u16(destination_port);
        udp.put_u16((8 + payload.len()) as u16);
        udp.put_u16(0);
        udp.put_slice(payload);
        self.raw_ipv4(PROTO_UDP, &udp)
    }

    /// TCP segment without options; checksum left at zero.
    pub fn tcp(&self, source_port: u16, destination_port: u16, flags: u8, payload: &[u8]) -> Bytes {
        let mut tcp = BytesMut::with_capacity(20 + payload.len());
        tcp.put_u16(source_port);
        tcp.put_u16(destination_port);
        tcp.put_u32(1); // sequence
        tcp.put_u32(0); // acknowledgement
        tcp.put_u8(5 << 4);
        tcp.put_u8(flags);
        tcp.put_u16(0xFFFF); // window
        tcp.put_u16(0); // checksum
        tcp.put_u16(0); // urgent pointer
        tcp.put_slice(payload);
        self.raw_ipv4(PROTO_TCP, &tcp)
    }

    /// Wraps an already encoded transport header and payload.
    pub fn raw_ipv4(&self, protocol: u8, transport: &[u8]) -> Bytes {
        let total_len = 20 + transport.len();
        let mut frame = BytesMut::with_capacity(14 + total_len);

        frame.put_slice(&self.destination_mac.0);
        frame.put_slice(&self.source_mac.0);
        frame.put_u16(ETHER_TYPE_IPV4);

        let ip_start = frame.len();
        frame.put_u8(0x45);
        frame.put_u8(0);
        frame.put_u16(total_len as u16);
        frame.put_u16(0); // identification
        frame.put_u16(0x4000); // don't fragment
        frame.put_u8(self.ttl);
        frame.put_u8(protocol);
        frame.put_u16(0); // checksum
        frame.put_slice(&self.source_ip.octets());
        frame.put_slice(&self.destination_ip.octets());
        let sum = checksum(&frame[ip_start..ip_start + 20]);
        frame[ip_start + 10..ip_start + 12].copy_from_slice(&sum.to_be_bytes());

        frame.put_slice(transport);
        frame.freeze()
    }
}
