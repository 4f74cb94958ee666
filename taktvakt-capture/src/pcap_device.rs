//! Live capture on a network interface through libpcap.

use pcap::{Active, Capture};
use taktvakt_config::CaptureConfig;
use taktvakt_core::{BufferPool, PacketBuffer, Timestamp};
use tracing::{info, warn};

use crate::device::{Device, DeviceStats};
use crate::error::CaptureError;

pub struct PcapDevice {
    capture: Capture<Active>,
    pool: BufferPool,
    stats: DeviceStats,
}

impl PcapDevice {
    /// Opens `config.interface` in non-blocking mode.
    pub fn open(config: &CaptureConfig, pool: BufferPool) -> Result<Self, CaptureError> {
        let device = pcap::Device::list()?
            .into_iter()
            .find(|d| d.name == config.interface)
            .ok_or_else(|| CaptureError::DeviceNotFound(config.interface.clone()))?;

        let snaplen = i32::try_from(config.snaplen).unwrap_or(i32::MAX);
        let capture = Capture::from_device(device)?
            .promisc(config.promiscuous)
            .snaplen(snaplen)
            .immediate_mode(true)
            .open()?
            .setnonblock()?;

        info!(
            interface = %config.interface,
            promiscuous = config.promiscuous,
            snaplen,
            "Live capture opened"
        );
        Ok(Self {
            capture,
            pool,
            stats: DeviceStats::default(),
        })
    }
}

impl Device for PcapDevice {
    fn receive_burst(
        &mut self,
        max: usize,
        out: &mut Vec<PacketBuffer>,
    ) -> Result<usize, CaptureError> {
        let mut delivered = 0;
        while delivered < max {
            let packet = match self.capture.next_packet() {
                Ok(packet) => packet,
                Err(pcap::Error::TimeoutExpired) | Err(pcap::Error::NoMorePackets) => break,
                Err(e) => return Err(e.into()),
            };
            match self.pool.allocate_from(packet.data, Timestamp::now()) {
                Ok(buffer) => {
                    out.push(buffer);
                    self.stats.received += 1;
                    delivered += 1;
                }
                Err(e) => {
                    self.stats.pool_exhausted += 1;
                    if self.stats.pool_exhausted == 1 {
                        warn!(error = %e, "Dropping captured frames, buffer pool exhausted");
                    }
                }
            }
        }
        Ok(delivered)
    }

    fn stats(&self) -> DeviceStats {
        self.stats
    }
}
