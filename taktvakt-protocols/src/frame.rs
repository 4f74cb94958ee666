//! ## taktvakt-protocols::frame
//! One-pass parse of a captured frame down to the transport layer.

use crate::error::ParseError;
use crate::ethernet::EthernetFrame;
use crate::ipv4::Ipv4Packet;
use crate::transport::Transport;

/// Network layer as far as it was understood.
#[derive(Debug, Clone, Copy)]
pub enum Network<'a> {
    Ipv4 {
        packet: Ipv4Packet<'a>,
        transport: Transport<'a>,
    },
    /// Any non-IPv4 EtherType; not inspected further.
    Other(u16),
}

#[derive(Debug, Clone, Copy)]
pub struct ParsedFrame<'a> {
    pub ethernet: EthernetFrame<'a>,
    pub network: Network<'a>,
}

impl<'a> ParsedFrame<'a> {
    pub fn ipv4(&self) -> Option<&Ipv4Packet<'a>> {
        match &self.network {
            Network::Ipv4 { packet, .. } => Some(packet),
            Network::Other(_) => None,
        }
    }

    pub fn transport(&self) -> Option<&Transport<'a>> {
        match &self.network {
            Network::Ipv4 { transport, .. } => Some(transport),
            Network::Other(_) => None,
        }
    }
}

/// Parses Ethernet, then IPv4 and its transport header when present.
///
/// A non-IPv4 frame parses successfully with [`Network::Other`]; a truncated
/// or inconsistent IPv4 frame is an error.
pub fn parse_frame(data: &[u8]) -> Result<ParsedFrame<'_>, ParseError> {
    let ethernet = EthernetFrame::parse(data)?;
    let network = if ethernet.is_ipv4() {
        let packet = Ipv4Packet::parse(ethernet.payload)?;
        let transport = Transport::parse(packet.protocol, packet.payload)?;
        Network::Ipv4 { packet, transport }
    } else {
        Network::Other(ethernet.ether_type)
    };
    Ok(ParsedFrame { ethernet, network })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FrameBuilder;
    use crate::ethernet::ETHER_TYPE_ARP;
    use crate::ipv4::PROTO_ICMP;
    use std::net::Ipv4Addr;

    #[test]
    fn icmp_frame_round_trip() {
        let frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(192, 168, 1, 1))
            .icmp_echo(7, b"ping");
        let parsed = parse_frame(&frame).unwrap();

        let ip = parsed.ipv4().unwrap();
        assert_eq!(ip.protocol, PROTO_ICMP);
        assert_eq!(ip.source, Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(parsed.transport().unwrap().payload(), b"ping");
    }

    #[test]
    fn arp_is_not_ipv4() {
        let mut frame = vec![0xFF; 12];
        frame.extend_from_slice(&ETHER_TYPE_ARP.to_be_bytes());
        frame.extend_from_slice(&[0u8; 28]);

        let parsed = parse_frame(&frame).unwrap();
        assert!(matches!(parsed.network, Network::Other(ETHER_TYPE_ARP)));
        assert!(parsed.ipv4().is_none());
    }

    #[test]
    fn truncated_ipv4_is_an_error() {
        let frame = FrameBuilder::new().udp(1000, 5005, b"Alice");
        assert!(parse_frame(&frame[..20]).is_err());
    }
}
