//! ## taktvakt-capture::generator
//! **Seeded synthetic traffic alternating single packets and attack bursts**
//!
//! Each cycle picks a mode:
//! - **Normal**: one frame, then a gap drawn from `normal_gap_ms`
//! - **Burst**: `burst_len` frames back to back, then a pause drawn from
//!   `burst_pause_ms`
//!
//! A frame is a threat (ICMP echo) with probability `threat_ratio`, otherwise
//! a TCP SYN or UDP datagram to a random high port. The same seed always
//! yields the same frame sequence.

use std::time::Duration;

use bytes::Bytes;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use taktvakt_config::GeneratorConfig;
use taktvakt_core::{BufferPool, PacketBuffer, Timestamp};
use taktvakt_protocols::builder::TCP_SYN;
use taktvakt_protocols::FrameBuilder;
use tracing::{debug, trace};

use crate::device::{Device, DeviceStats};
use crate::error::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Icmp,
    Tcp,
    Udp,
}

impl FrameKind {
    pub fn is_threat(&self) -> bool {
        matches!(self, FrameKind::Icmp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Nothing due before `until`.
    Waiting { until: Timestamp },
    /// One frame, then the normal gap.
    Normal,
    /// `remaining` frames of the current burst still to send.
    Burst { remaining: u32 },
}

/// Counts of generated frames by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorStats {
    pub icmp: u64,
    pub tcp: u64,
    pub udp: u64,
}

impl GeneratorStats {
    pub fn total(&self) -> u64 {
        self.icmp + self.tcp + self.udp
    }
}

pub struct TrafficGenerator {
    pool: BufferPool,
    config: GeneratorConfig,
    rng: SmallRng,
    builder: FrameBuilder,
    mode: Mode,
    sequence: u16,
    limit: Option<u64>,
    generated: GeneratorStats,
    stats: DeviceStats,
}

impl TrafficGenerator {
    pub fn new(pool: BufferPool, config: GeneratorConfig) -> Self {
        let rng = SmallRng::seed_from_u64(config.seed);
        Self {
            pool,
            config,
            rng,
            builder: FrameBuilder::new(),
            mode: Mode::Waiting {
                until: Timestamp::from_nanos(0),
            },
            sequence: 0,
            limit: None,
            generated: GeneratorStats::default(),
            stats: DeviceStats::default(),
        }
    }

    /// Stops producing after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    pub fn with_builder(mut self, builder: FrameBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn generated(&self) -> GeneratorStats {
        self.generated
    }

    pub fn is_exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.generated.total() >= limit)
    }

    /// Builds the next frame, independent of timing.
    pub fn next_frame(&mut self) -> (FrameKind, Bytes) {
        let kind = if self.rng.random_bool(self.config.threat_ratio) {
            FrameKind::Icmp
        } else if self.rng.random_bool(0.5) {
            FrameKind::Tcp
        } else {
            FrameKind::Udp
        };

        let source_port = self.rng.random_range(1024..=u16::MAX);
        let destination_port = self.rng.random_range(1024..=u16::MAX);
        let frame = match kind {
            FrameKind::Icmp => {
                self.sequence = self.sequence.wrapping_add(1);
                self.generated.icmp += 1;
                self.builder.icmp_echo(self.sequence, &[0u8; 32])
            }
            FrameKind::Tcp => {
                self.generated.tcp += 1;
                self.builder.tcp(source_port, destination_port, TCP_SYN, &[])
            }
            FrameKind::Udp => {
                self.generated.udp += 1;
                self.builder.udp(source_port, destination_port, b"payload")
            }
        };
        (kind, frame)
    }

    fn draw_ms(&mut self, (low, high): (u64, u64)) -> Duration {
        Duration::from_millis(self.rng.random_range(low..=high.max(low)))
    }

    /// Picks the next mode once the current one has run out.
    fn next_cycle(&mut self, now: Timestamp) -> Mode {
        if !self.rng.random_bool(0.5) {
            return Mode::Normal;
        }
        let (low, high) = self.config.burst_len;
        let remaining = self.rng.random_range(low..=high.max(low));
        if remaining == 0 {
            return Mode::Waiting {
                until: now + self.draw_ms(self.config.burst_pause_ms),
            };
        }
        debug!(frames = remaining, "Starting attack burst");
        Mode::Burst { remaining }
    }

    fn emit(&mut self, out: &mut Vec<PacketBuffer>) -> bool {
        let (kind, frame) = self.next_frame();
        match self.pool.allocate_from(&frame, Timestamp::now()) {
            Ok(buffer) => {
                trace!(?kind, len = frame.len(), "Generated frame");
                out.push(buffer);
                self.stats.received += 1;
                true
            }
            Err(_) => {
                self.stats.pool_exhausted += 1;
                false
            }
        }
    }
}

impl Device for TrafficGenerator {
    fn receive_burst(
        &mut self,
        max: usize,
        out: &mut Vec<PacketBuffer>,
    ) -> Result<usize, CaptureError> {
        let now = Timestamp::now();
        let mut delivered = 0;

        while delivered < max && !self.is_exhausted() {
            match self.mode {
                Mode::Waiting { until } => {
                    if now < until {
                        break;
                    }
                    self.mode = self.next_cycle(now);
                }
                Mode::Normal => {
                    if self.emit(out) {
                        delivered += 1;
                    }
                    self.mode = Mode::Waiting {
                        until: now + self.draw_ms(self.config.normal_gap_ms),
                    };
                }
                Mode::Burst { remaining } => {
                    if self.emit(out) {
                        delivered += 1;
                    }
                    self.mode = if remaining > 1 {
                        Mode::Burst {
                            remaining: remaining - 1,
                        }
                    } else {
                        Mode::Waiting {
                            until: now + self.draw_ms(self.config.burst_pause_ms),
                        }
                    };
                }
            }
        }
        Ok(delivered)
    }

    fn stats(&self) -> DeviceStats {
        self.stats
    }
}
