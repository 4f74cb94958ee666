//! Device that replays a fixed list of frames, for tests and demos.

use std::collections::VecDeque;

use bytes::Bytes;
use taktvakt_core::{BufferPool, PacketBuffer, Timestamp};
use tracing::debug;

use crate::device::{Device, DeviceStats};
use crate::error::CaptureError;

pub struct ScriptedDevice {
    pool: BufferPool,
    frames: VecDeque<Bytes>,
    stats: DeviceStats,
}

impl ScriptedDevice {
    pub fn new<I, F>(pool: BufferPool, frames: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Bytes>,
    {
        Self {
            pool,
            frames: frames.into_iter().map(Into::into).collect(),
            stats: DeviceStats::default(),
        }
    }

    /// Queues another frame behind the remaining ones.
    pub fn push_frame(&mut self, frame: impl Into<Bytes>) {
        self.frames.push_back(frame.into());
    }

    /// Frames not yet delivered.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl Device for ScriptedDevice {
    fn receive_burst(
        &mut self,
        max: usize,
        out: &mut Vec<PacketBuffer>,
    ) -> Result<usize, CaptureError> {
        let mut delivered = 0;
        while delivered < max {
            let Some(frame) = self.frames.pop_front() else {
                break;
            };
            match self.pool.allocate_from(&frame, Timestamp::now()) {
                Ok(buffer) => {
                    out.push(buffer);
                    delivered += 1;
                }
                Err(e) => {
                    debug!(error = %e, "Scripted frame dropped");
                    self.stats.pool_exhausted += 1;
                }
            }
        }
        self.stats.received += delivered as u64;
        Ok(delivered)
    }

    fn stats(&self) -> DeviceStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_order_and_bounded_by_max() {
        let pool = BufferPool::new(8, 64).unwrap();
        let mut device = ScriptedDevice::new(pool, [&b"one"[..], b"two", b"three"]);

        let mut out = Vec::new();
        assert_eq!(device.receive_burst(2, &mut out).unwrap(), 2);
        assert_eq!(device.receive_burst(2, &mut out).unwrap(), 1);
        assert_eq!(device.receive_burst(2, &mut out).unwrap(), 0);

        let frames: Vec<&[u8]> = out.iter().map(|b| b.data()).collect();
        assert_eq!(frames, vec![&b"one"[..], b"two", b"three"]);
        assert_eq!(device.stats().received, 3);
    }

    #[test]
    fn pool_exhaustion_drops_and_counts() {
        let pool = BufferPool::new(1, 64).unwrap();
        let mut device = ScriptedDevice::new(pool.clone(), [&b"a"[..], b"b"]);

        let mut out = Vec::new();
        assert_eq!(device.receive_burst(4, &mut out).unwrap(), 1);
        assert_eq!(device.stats().pool_exhausted, 1);
        assert_eq!(device.remaining(), 0);

        for buffer in out.drain(..) {
            device.free(buffer);
        }
        assert_eq!(pool.available(), 1);
    }
}
