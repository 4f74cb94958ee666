//! The device I/O boundary.
//!
//! RX polls a [`Device`] for bursts of frames already copied into pooled
//! buffers. Polling never blocks and may yield nothing.

use taktvakt_core::PacketBuffer;

use crate::error::CaptureError;

/// Counters kept by every device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Frames delivered to the caller.
    pub received: u64,
    /// Frames lost because no buffer was free.
    pub pool_exhausted: u64,
}

pub trait Device: Send {
    /// Appends up to `max` received frames to `out` and returns how many.
    fn receive_burst(
        &mut self,
        max: usize,
        out: &mut Vec<PacketBuffer>,
    ) -> Result<usize, CaptureError>;

    /// Gives a buffer back. Buffers also return to their pool when dropped.
    fn free(&mut self, buffer: PacketBuffer) {
        buffer.free();
    }

    fn stats(&self) -> DeviceStats;
}

impl<D: Device + ?Sized> Device for Box<D> {
    fn receive_burst(
        &mut self,
        max: usize,
        out: &mut Vec<PacketBuffer>,
    ) -> Result<usize, CaptureError> {
        (**self).receive_burst(max, out)
    }

    fn free(&mut self, buffer: PacketBuffer) {
        (**self).free(buffer)
    }

    fn stats(&self) -> DeviceStats {
        (**self).stats()
    }
}
