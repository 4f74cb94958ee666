//! ## taktvakt-engine::workloads::rx
//! **Receive service: device bursts into the packet ring**
//!
//! Released once; polls the device until the service stops. A frame that
//! does not fit in the packet ring is freed here and counted.

use taktvakt_capture::Device;
use taktvakt_core::{PacketBuffer, Producer};
use taktvakt_protocols::hex_prefix;
use taktvakt_sequencer::{RunControl, Workload};
use taktvakt_telemetry::MetricsRecorder;
use tracing::{trace, warn};

use crate::idle::Idler;

const TRACE_PREFIX_LEN: usize = 16;

pub struct RxWorkload {
    device: Box<dyn Device>,
    ring: Producer<PacketBuffer>,
    metrics: MetricsRecorder,
    burst_size: usize,
    idler: Idler,
    burst: Vec<PacketBuffer>,
    exhausted_seen: u64,
}

impl RxWorkload {
    pub fn new(
        device: Box<dyn Device>,
        ring: Producer<PacketBuffer>,
        metrics: MetricsRecorder,
        burst_size: usize,
        idler: Idler,
    ) -> Self {
        Self {
            device,
            ring,
            metrics,
            burst_size,
            idler,
            burst: Vec::with_capacity(burst_size),
            exhausted_seen: 0,
        }
    }

    /// One device poll. Returns the number of frames received.
    pub fn poll(&mut self) -> usize {
        let received = match self.device.receive_burst(self.burst_size, &mut self.burst) {
            Ok(received) => received,
            Err(e) => {
                warn!(error = %e, "Device receive failed");
                0
            }
        };
        self.metrics.packets_received.inc_by(received as u64);

        for buffer in self.burst.drain(..) {
            trace!(
                id = buffer.id(),
                len = buffer.len(),
                head = %hex_prefix(buffer.data(), TRACE_PREFIX_LEN),
                "Frame received"
            );
            if let Err(buffer) = self.ring.push(buffer) {
                self.metrics.rx_dropped.inc();
                self.device.free(buffer);
            }
        }

        let exhausted = self.device.stats().pool_exhausted;
        if exhausted > self.exhausted_seen {
            self.metrics
                .pool_exhausted
                .inc_by(exhausted - self.exhausted_seen);
            self.exhausted_seen = exhausted;
        }
        received
    }
}

impl Workload for RxWorkload {
    fn run(&mut self, control: &RunControl) {
        while control.should_continue() {
            if self.poll() == 0 {
                self.idler.idle();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use taktvakt_capture::ScriptedDevice;
    use taktvakt_config::IdleStrategy;
    use taktvakt_core::{BoundedQueue, BufferPool};
    use taktvakt_protocols::FrameBuilder;

    #[test]
    fn full_ring_frees_and_counts() {
        let pool = BufferPool::new(16, 256).unwrap();
        let builder = FrameBuilder::new();
        let frames: Vec<_> = (0..6).map(|seq| builder.icmp_echo(seq, b"x")).collect();
        let device = ScriptedDevice::new(pool.clone(), frames);
        let (producer, mut consumer) = BoundedQueue::with_capacity(4).unwrap().split();
        let metrics = MetricsRecorder::new().unwrap();

        let mut rx = RxWorkload::new(
            Box::new(device),
            producer,
            metrics.clone(),
            8,
            Idler::new(IdleStrategy::Spin, Duration::ZERO),
        );
        assert_eq!(rx.poll(), 6);
        assert_eq!(rx.poll(), 0);

        assert_eq!(metrics.packets_received.get(), 6);
        assert_eq!(metrics.rx_dropped.get(), 2);
        assert_eq!(consumer.len(), 4);
        assert_eq!(pool.available(), 12);

        while consumer.pop().is_some() {}
        assert_eq!(pool.available(), 16);
    }
}
