//! ## taktvakt-detection::classifier
//! **Per-frame verdicts: protocol blacklist, payload signatures, queries**
//!
//! Pure function of the frame bytes. Side effects (replies, logging) belong
//! to the caller.

use std::fmt;
use std::net::SocketAddrV4;

use taktvakt_config::DetectionConfig;
use taktvakt_protocols::{query_key, EthernetFrame, Ipv4Packet, MacAddr, ParseError, Transport};
use tracing::debug;

use crate::error::DetectionError;
use crate::signatures::SignatureEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Safe,
    Threat,
    Unknown,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Safe => "Safe",
            Classification::Threat => "Threat",
            Classification::Unknown => "Unknown",
        }
    }

    /// Lowercase form used as a metrics label.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Safe => "safe",
            Classification::Threat => "threat",
            Classification::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a frame was classified as a threat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatReason {
    BlacklistedProtocol(u8),
    Signature(usize),
}

/// A directory lookup carried by a UDP datagram to the query port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub key: String,
    pub reply_to: SocketAddrV4,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub classification: Classification,
    pub reason: Option<ThreatReason>,
    /// Present only for non-threat frames addressed to the query port.
    pub query: Option<QueryRequest>,
    pub source: MacAddr,
    pub destination: MacAddr,
    pub protocol: Option<u8>,
}

impl Verdict {
    fn unknown(source: MacAddr, destination: MacAddr) -> Self {
        Self {
            classification: Classification::Unknown,
            reason: None,
            query: None,
            source,
            destination,
            protocol: None,
        }
    }
}

pub struct Classifier {
    blacklist: [bool; 256],
    signatures: SignatureEngine,
    query_port: u16,
}

impl Classifier {
    pub fn new(config: &DetectionConfig) -> Result<Self, DetectionError> {
        let mut blacklist = [false; 256];
        for &protocol in &config.blacklisted_protocols {
            blacklist[usize::from(protocol)] = true;
        }
        Ok(Self {
            blacklist,
            signatures: SignatureEngine::with_patterns(config.signatures.iter().cloned())?,
            query_port: config.query_port,
        })
    }

    pub fn signatures(&self) -> &SignatureEngine {
        &self.signatures
    }

    /// The protocol blacklist is checked on the IPv4 fixed header alone,
    /// before any transport parsing: a blacklisted protocol in a truncated
    /// or snapped frame is a threat.
    pub fn classify(&self, frame: &[u8]) -> Verdict {
        let ethernet = match EthernetFrame::parse(frame) {
            Ok(ethernet) => ethernet,
            Err(e) => {
                debug!(error = %e, len = frame.len(), "Runt frame");
                return Verdict::unknown(MacAddr::ZERO, MacAddr::ZERO);
            }
        };
        let source = ethernet.source;
        let destination = ethernet.destination;
        if !ethernet.is_ipv4() {
            return Verdict::unknown(source, destination);
        }

        let ip = match Ipv4Packet::parse_header(ethernet.payload) {
            Ok(ip) => ip,
            Err(e) => {
                debug!(error = %e, len = frame.len(), "Malformed IPv4 header");
                return Verdict::unknown(source, destination);
            }
        };
        if self.blacklist[usize::from(ip.protocol)] {
            return Verdict {
                classification: Classification::Threat,
                reason: Some(ThreatReason::BlacklistedProtocol(ip.protocol)),
                query: None,
                source,
                destination,
                protocol: Some(ip.protocol),
            };
        }

        let transport = if ip.is_truncated() {
            Err(ParseError::TotalLengthMismatch {
                total: ip.total_len,
                captured: ip.header_len + ip.payload.len(),
            })
        } else {
            Transport::parse(ip.protocol, ip.payload)
        };
        let transport = match transport {
            Ok(transport) => transport,
            Err(e) => {
                debug!(error = %e, protocol = ip.protocol, "Malformed transport");
                return Verdict {
                    protocol: Some(ip.protocol),
                    ..Verdict::unknown(source, destination)
                };
            }
        };

        let reason = self
            .signatures
            .first_match(transport.payload())
            .map(ThreatReason::Signature);

        let query = match (reason, transport) {
            (None, Transport::Udp(udp)) if udp.destination_port == self.query_port => {
                query_key(udp.payload).map(|key| QueryRequest {
                    key: key.to_owned(),
                    reply_to: SocketAddrV4::new(ip.source, udp.source_port),
                })
            }
            _ => None,
        };

        Verdict {
            classification: if reason.is_some() {
                Classification::Threat
            } else {
                Classification::Safe
            },
            reason,
            query,
            source,
            destination,
            protocol: Some(ip.protocol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::net::Ipv4Addr;
    use taktvakt_protocols::builder::TCP_SYN;
    use taktvakt_protocols::FrameBuilder;

    fn classifier() -> Classifier {
        Classifier::new(&DetectionConfig::default()).unwrap()
    }

    #[test]
    fn icmp_is_threat() {
        let frame = FrameBuilder::new().icmp_echo(1, b"ping");
        let verdict = classifier().classify(&frame);
        assert_eq!(verdict.classification, Classification::Threat);
        assert_eq!(verdict.reason, Some(ThreatReason::BlacklistedProtocol(1)));
        assert_eq!(verdict.protocol, Some(1));
    }

    #[test]
    fn tcp_and_udp_are_safe() {
        let builder = FrameBuilder::new();
        let classifier = classifier();
        assert_eq!(
            classifier.classify(&builder.tcp(4000, 8080, TCP_SYN, b"")).classification,
            Classification::Safe
        );
        let verdict = classifier.classify(&builder.udp(4000, 9999, b"hello"));
        assert_eq!(verdict.classification, Classification::Safe);
        assert!(verdict.query.is_none());
    }

    #[test]
    fn non_ipv4_and_garbage_are_unknown() {
        let classifier = classifier();
        let mut arp = vec![0xAA; 6];
        arp.extend_from_slice(&[0xBB; 6]);
        arp.extend_from_slice(&[0x08, 0x06]);
        arp.extend_from_slice(&[0u8; 28]);

        let verdict = classifier.classify(&arp);
        assert_eq!(verdict.classification, Classification::Unknown);
        assert_eq!(verdict.source, MacAddr([0xBB; 6]));

        let verdict = classifier.classify(&[1, 2, 3]);
        assert_eq!(verdict.classification, Classification::Unknown);
        assert_eq!(verdict.source, MacAddr::ZERO);
    }

    #[test]
    fn query_extracted_from_query_port() {
        let frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::new(192, 168, 1, 20), Ipv4Addr::new(192, 168, 1, 2))
            .udp(40001, 5005, b"Alice\n");
        let verdict = classifier().classify(&frame);

        assert_eq!(verdict.classification, Classification::Safe);
        assert_eq!(
            verdict.query,
            Some(QueryRequest {
                key: "Alice".into(),
                reply_to: SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 20), 40001),
            })
        );
    }

    #[test]
    fn signature_match_is_threat_and_not_answered() {
        let config = DetectionConfig {
            signatures: vec!["DROP TABLE".into()],
            ..DetectionConfig::default()
        };
        let classifier = Classifier::new(&config).unwrap();
        let frame = FrameBuilder::new().udp(40001, 5005, b"x; DROP TABLE users");

        let verdict = classifier.classify(&frame);
        assert_eq!(verdict.classification, Classification::Threat);
        assert_eq!(verdict.reason, Some(ThreatReason::Signature(0)));
        assert!(verdict.query.is_none());
    }

    #[test]
    fn truncated_ipv4_is_unknown_with_macs() {
        let frame = FrameBuilder::new().udp(1, 5005, b"Alice");
        let verdict = classifier().classify(&frame[..20]);
        assert_eq!(verdict.classification, Classification::Unknown);
        assert_eq!(verdict.destination, MacAddr([0x02, 0, 0, 0, 0, 0x02]));
    }

    #[test]
    fn blacklisted_protocol_wins_over_broken_transport() {
        let classifier = classifier();

        let short_icmp = FrameBuilder::new().raw_ipv4(1, &[8, 0, 0, 0]);
        let verdict = classifier.classify(&short_icmp);
        assert_eq!(verdict.classification, Classification::Threat);
        assert_eq!(verdict.reason, Some(ThreatReason::BlacklistedProtocol(1)));

        let jumbo = FrameBuilder::new().icmp_echo(1, &[0u8; 3000]);
        let verdict = classifier.classify(&jumbo[..2048]);
        assert_eq!(verdict.classification, Classification::Threat);
        assert_eq!(verdict.protocol, Some(1));
    }

    #[test]
    fn malformed_frames_are_unknown() {
        let classifier = classifier();
        let builder = FrameBuilder::new();
        let udp = builder.udp(40000, 9000, &[0u8; 64]);
        let short_udp = builder.raw_ipv4(17, &[0, 1, 0]);
        let mut ipv6_in_ipv4 = builder.udp(40000, 9000, b"x").to_vec();
        ipv6_in_ipv4[14] = 0x60;

        let cases: [(&str, &[u8], Option<u8>); 5] = [
            ("runt ethernet", &udp[..10], None),
            ("short udp header", &short_udp[..], Some(17)),
            ("snapped udp datagram", &udp[..50], Some(17)),
            ("bad ip version", &ipv6_in_ipv4[..], None),
            ("short ipv4 header", &udp[..30], None),
        ];
        for (name, frame, protocol) in cases {
            let verdict = classifier.classify(frame);
            assert_eq!(verdict.classification, Classification::Unknown, "{name}");
            assert_eq!(verdict.protocol, protocol, "{name}");
            assert!(verdict.query.is_none(), "{name}");
        }
    }

    proptest! {
        #[test]
        fn any_cut_past_ipv4_header_stays_threat(
            payload in proptest::collection::vec(any::<u8>(), 0..256),
            cut in 0usize..400,
        ) {
            let frame = FrameBuilder::new().icmp_echo(9, &payload);
            let cut = cut.min(frame.len());
            let verdict = classifier().classify(&frame[..cut]);
            let expected = if cut >= 14 + 20 {
                Classification::Threat
            } else {
                Classification::Unknown
            };
            prop_assert_eq!(verdict.classification, expected);
        }
    }
}
