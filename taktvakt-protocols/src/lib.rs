//! # taktvakt Protocol Parsers
//!
//! Zero-copy parsing of captured frames: Ethernet, IPv4, and the ICMP, UDP
//! and TCP headers above it. Every view borrows from the frame buffer.

pub mod builder;
pub mod error;
pub mod ethernet;
pub mod frame;
pub mod ipv4;
pub mod query;
pub mod transport;

pub use builder::FrameBuilder;
pub use error::ParseError;
pub use ethernet::{EthernetFrame, MacAddr};
pub use frame::{parse_frame, Network, ParsedFrame};
pub use ipv4::Ipv4Packet;
pub use query::{query_key, truncate_on_char_boundary, MAX_FIELD_LEN};
pub use transport::{IcmpMessage, TcpSegment, Transport, UdpDatagram};

/// Hex rendering of the first `max` bytes of `data`, for trace logs.
pub fn hex_prefix(data: &[u8], max: usize) -> String {
    hex::encode(&data[..data.len().min(max)])
}
