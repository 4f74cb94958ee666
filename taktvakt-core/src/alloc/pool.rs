//! ## taktvakt-core::alloc::pool
//! **Fixed-size packet-buffer pool**
//!
//! All frame storage is allocated once at startup. A [`PacketBuffer`] is a
//! move-only handle to one slot: whichever stage holds it owns the frame, and
//! dropping it (or calling [`PacketBuffer::free`]) puts the slot back on the
//! pool's free list. Because the handle cannot be copied, a buffer is released
//! exactly once and cannot be read after being moved into a queue.
//!
//! The free list is a lock-free bounded MPMC queue: RX allocates on one core
//! while Detect and Log release on others.

use std::fmt;
use std::mem::ManuallyDrop;
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use tracing::error;

use super::stats::PoolStats;
use crate::error::PoolError;
use crate::time::Timestamp;

struct Slot {
    id: u32,
    data: Box<[u8]>,
}

struct PoolInner {
    free: ArrayQueue<Slot>,
    capacity: usize,
    frame_size: usize,
    stats: PoolStats,
}

impl PoolInner {
    fn release(&self, slot: Slot) {
        self.stats.increment_releases();
        if let Err(slot) = self.free.push(slot) {
            // Only reachable if slots from a foreign pool were mixed in.
            error!(slot = slot.id, "Free list overflow, slot discarded");
        }
    }
}

/// Shared handle to a preallocated pool of equally sized frame buffers.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Preallocates `capacity` buffers of `frame_size` bytes each.
    pub fn new(capacity: usize, frame_size: usize) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }
        if frame_size == 0 {
            return Err(PoolError::ZeroFrameSize);
        }

        let free = ArrayQueue::new(capacity);
        for id in 0..capacity {
            let slot = Slot {
                id: id as u32,
                data: vec![0u8; frame_size].into_boxed_slice(),
            };
            // Cannot fail: the queue was sized to hold every slot.
            let _ = free.push(slot);
        }

        Ok(Self {
            inner: Arc::new(PoolInner {
                free,
                capacity,
                frame_size,
                stats: PoolStats::new(),
            }),
        })
    }

    /// Takes an empty buffer from the pool.
    pub fn allocate(&self) -> Result<PacketBuffer, PoolError> {
        match self.inner.free.pop() {
            Some(slot) => {
                self.inner.stats.increment_allocations();
                Ok(PacketBuffer {
                    slot: ManuallyDrop::new(slot),
                    len: 0,
                    rx_timestamp: Timestamp::default(),
                    pool: Arc::clone(&self.inner),
                })
            }
            None => {
                self.inner.stats.increment_exhausted();
                Err(PoolError::Exhausted {
                    capacity: self.inner.capacity,
                })
            }
        }
    }

    /// Takes a buffer and copies `frame` into it (truncated to the frame size).
    pub fn allocate_from(
        &self,
        frame: &[u8],
        rx_timestamp: Timestamp,
    ) -> Result<PacketBuffer, PoolError> {
        let mut buffer = self.allocate()?;
        buffer.fill_from(frame);
        buffer.set_rx_timestamp(rx_timestamp);
        Ok(buffer)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn frame_size(&self) -> usize {
        self.inner.frame_size
    }

    /// Buffers currently on the free list.
    pub fn available(&self) -> usize {
        self.inner.free.len()
    }

    pub fn stats(&self) -> &PoolStats {
        &self.inner.stats
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("capacity", &self.inner.capacity)
            .field("frame_size", &self.inner.frame_size)
            .field("available", &self.available())
            .finish()
    }
}

/// Exclusive handle to one pooled frame plus its capture metadata.
pub struct PacketBuffer {
    slot: ManuallyDrop<Slot>,
    len: usize,
    rx_timestamp: Timestamp,
    pool: Arc<PoolInner>,
}

impl PacketBuffer {
    /// Pool slot index, stable for the lifetime of the pool.
    #[inline]
    pub fn id(&self) -> u32 {
        self.slot.id
    }

    /// The valid frame bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.slot.data[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the underlying storage.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slot.data.len()
    }

    /// Full backing storage for in-place writes; follow with [`set_len`](Self::set_len).
    #[inline]
    pub fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.slot.data
    }

    /// Marks the first `len` bytes as valid (clamped to capacity).
    #[inline]
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(self.capacity());
    }

    /// Copies `frame` into the buffer, returning the number of bytes kept.
    pub fn fill_from(&mut self, frame: &[u8]) -> usize {
        let kept = frame.len().min(self.capacity());
        self.slot.data[..kept].copy_from_slice(&frame[..kept]);
        self.len = kept;
        kept
    }

    #[inline]
    pub fn rx_timestamp(&self) -> Timestamp {
        self.rx_timestamp
    }

    #[inline]
    pub fn set_rx_timestamp(&mut self, timestamp: Timestamp) {
        self.rx_timestamp = timestamp;
    }

    /// Returns the buffer to its pool. Equivalent to dropping it.
    #[inline]
    pub fn free(self) {
        drop(self);
    }
}

impl Drop for PacketBuffer {
    fn drop(&mut self) {
        // SAFETY: `slot` is taken exactly once, here, and never touched again.
        let slot = unsafe { ManuallyDrop::take(&mut self.slot) };
        self.pool.release(slot);
    }
}

impl fmt::Debug for PacketBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketBuffer")
            .field("id", &self.slot.id)
            .field("len", &self.len)
            .field("rx_timestamp", &self.rx_timestamp)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::BoundedQueue;

    #[test]
    fn rejects_zero_sizes() {
        assert_eq!(BufferPool::new(0, 64).err(), Some(PoolError::ZeroCapacity));
        assert_eq!(BufferPool::new(4, 0).err(), Some(PoolError::ZeroFrameSize));
    }

    #[test]
    fn allocate_until_exhausted() {
        let pool = BufferPool::new(4, 64).unwrap();
        let held: Vec<_> = (0..4).map(|_| pool.allocate().unwrap()).collect();

        assert_eq!(pool.available(), 0);
        assert_eq!(pool.stats().live(), 4);
        assert_eq!(
            pool.allocate().err(),
            Some(PoolError::Exhausted { capacity: 4 })
        );
        assert_eq!(pool.stats().exhausted(), 1);

        drop(held);
        assert_eq!(pool.available(), 4);
        assert_eq!(pool.stats().live(), 0);
    }

    #[test]
    fn fill_truncates_to_frame_size() {
        let pool = BufferPool::new(1, 4).unwrap();
        let buffer = pool
            .allocate_from(b"abcdef", Timestamp::from_nanos(42))
            .unwrap();
        assert_eq!(buffer.data(), b"abcd");
        assert_eq!(buffer.rx_timestamp(), Timestamp::from_nanos(42));
    }

    #[test]
    fn in_place_write() {
        let pool = BufferPool::new(1, 16).unwrap();
        let mut buffer = pool.allocate().unwrap();
        buffer.storage_mut()[..3].copy_from_slice(b"xyz");
        buffer.set_len(3);
        assert_eq!(buffer.data(), b"xyz");
        buffer.set_len(100);
        assert_eq!(buffer.len(), 16);
    }

    #[test]
    fn each_buffer_released_exactly_once_through_queues() {
        let pool = BufferPool::new(8, 32).unwrap();
        let (mut tx, mut rx) = BoundedQueue::with_capacity(4).unwrap().split();

        for i in 0..8u8 {
            let buffer = pool.allocate_from(&[i], Timestamp::now()).unwrap();
            if let Err(rejected) = tx.push(buffer) {
                rejected.free();
            }
        }
        // Four accepted, four rejected and freed by the producer.
        assert_eq!(pool.stats().releases(), 4);
        assert_eq!(pool.available(), 4);

        while let Some(buffer) = rx.pop() {
            buffer.free();
        }
        assert_eq!(pool.stats().allocations(), 8);
        assert_eq!(pool.stats().releases(), 8);
        assert_eq!(pool.available(), pool.capacity());
    }

    #[test]
    fn cross_thread_release() {
        let pool = BufferPool::new(16, 64).unwrap();
        let (mut tx, mut rx) = BoundedQueue::with_capacity(16).unwrap().split();

        let consumer = std::thread::spawn(move || {
            let mut seen = 0;
            while seen < 1_000 {
                if let Some(buffer) = rx.pop() {
                    let buffer: PacketBuffer = buffer;
                    buffer.free();
                    seen += 1;
                } else {
                    std::thread::yield_now();
                }
            }
        });

        let mut sent = 0;
        while sent < 1_000 {
            let Ok(buffer) = pool.allocate_from(b"frame", Timestamp::now()) else {
                std::thread::yield_now();
                continue;
            };
            match tx.push(buffer) {
                Ok(()) => sent += 1,
                Err(buffer) => {
                    buffer.free();
                    std::thread::yield_now();
                }
            }
        }
        consumer.join().unwrap();

        assert_eq!(pool.stats().live(), 0);
        assert_eq!(pool.available(), 16);
    }
}
