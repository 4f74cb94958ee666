//! Bounded single-producer single-consumer ring for inter-core hand-off.
//!
//! Each pipeline edge (RX → Detect, Detect → Log) owns one queue. Items move
//! *by value*: a successful `push` transfers ownership into the ring and a
//! `pop` transfers it out again, so a stage can never touch a buffer after
//! handing it downstream.
//!
//! Inspired by the LMAX Disruptor layout:
//! - Cache-line aligned head/tail counters prevent false sharing
//! - Power-of-two capacity turns the modulo into a mask
//! - A full ring hands the item back to the caller instead of blocking
//!
//! The SPSC discipline is enforced by the type system: [`BoundedQueue::split`]
//! yields exactly one [`Producer`] and one [`Consumer`], neither of which is
//! `Clone`, and both mutate through `&mut self`.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::QueueError;

/// Cache-line aligned atomic counter to prevent false sharing
#[repr(align(64))]
struct AlignedCounter(AtomicU64);

impl AlignedCounter {
    #[inline]
    fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }
}

/// Fixed-capacity ring storage shared by one producer and one consumer.
pub struct BoundedQueue<T> {
    buffer: Box<[UnsafeCell<Option<T>>]>,
    /// Next slot the producer writes. Only the producer stores it.
    head: AlignedCounter,
    /// Next slot the consumer reads. Only the consumer stores it.
    tail: AlignedCounter,
    mask: usize,
}

impl<T> BoundedQueue<T> {
    /// Creates a ring with `capacity` slots.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Must be a non-zero power of two.
    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(QueueError::InvalidCapacity(capacity));
        }

        let buffer = (0..capacity)
            .map(|_| UnsafeCell::new(None))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            buffer,
            head: AlignedCounter::new(0),
            tail: AlignedCounter::new(0),
            mask: capacity - 1,
        })
    }

    /// Splits the ring into its producing and consuming halves.
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        let ring = Arc::new(self);
        (
            Producer {
                ring: Arc::clone(&ring),
            },
            Consumer { ring },
        )
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Snapshot of the occupancy, always within `0..=capacity`.
    ///
    /// The two counters are read separately, so a reader that owns neither
    /// side can see them out of step.
    #[inline]
    fn len(&self) -> usize {
        let tail = self.tail.0.load(Ordering::Acquire);
        let head = self.head.0.load(Ordering::Acquire);
        (head.saturating_sub(tail) as usize).min(self.capacity())
    }
}

// SAFETY: slots are only accessed by the single producer (at `head`) or the
// single consumer (at `tail`), and the Release/Acquire pairs on the counters
// publish slot contents before the other side may observe them.
unsafe impl<T: Send> Send for BoundedQueue<T> {}
unsafe impl<T: Send> Sync for BoundedQueue<T> {}

/// Writing half of a [`BoundedQueue`].
pub struct Producer<T> {
    ring: Arc<BoundedQueue<T>>,
}

impl<T> Producer<T> {
    /// Attempts to move `item` into the ring.
    ///
    /// Returns `Err(item)` when the ring is full; ownership goes back to the
    /// caller, who must free or drop it.
    #[inline]
    pub fn push(&mut self, item: T) -> Result<(), T> {
        let ring = &*self.ring;
        let head = ring.head.0.load(Ordering::Relaxed);
        let tail = ring.tail.0.load(Ordering::Acquire);

        if head.wrapping_sub(tail) >= ring.buffer.len() as u64 {
            return Err(item);
        }

        // SAFETY: the slot at `head` is outside the consumer's visible range
        // until the Release store below.
        unsafe {
            let idx = (head as usize) & ring.mask;
            *ring.buffer[idx].get() = Some(item);
        }

        ring.head.0.store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

/// Reading half of a [`BoundedQueue`].
pub struct Consumer<T> {
    ring: Arc<BoundedQueue<T>>,
}

impl<T> Consumer<T> {
    /// Moves the oldest item out of the ring.
    ///
    /// Returns `None` if the ring is empty. Never blocks.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        let ring = &*self.ring;
        let tail = ring.tail.0.load(Ordering::Relaxed);
        let head = ring.head.0.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        // SAFETY: the slot at `tail` was published by the producer's Release
        // store and is not reused until our own Release store below.
        let item = unsafe {
            let idx = (tail as usize) & ring.mask;
            (*ring.buffer[idx].get()).take()
        };

        ring.tail.0.store(tail.wrapping_add(1), Ordering::Release);
        item
    }

    /// Pops up to `max` items into `out`, returning how many were moved.
    pub fn drain_into(&mut self, out: &mut Vec<T>, max: usize) -> usize {
        let mut moved = 0;
        while moved < max {
            match self.pop() {
                Some(item) => {
                    out.push(item);
                    moved += 1;
                }
                None => break,
            }
        }
        moved
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    fn queue(capacity: usize) -> (Producer<u64>, Consumer<u64>) {
        BoundedQueue::with_capacity(capacity).unwrap().split()
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert_eq!(
            BoundedQueue::<u64>::with_capacity(3).err(),
            Some(QueueError::InvalidCapacity(3))
        );
        assert_eq!(
            BoundedQueue::<u64>::with_capacity(0).err(),
            Some(QueueError::InvalidCapacity(0))
        );
    }

    #[test]
    fn handles_single_element() {
        let (mut tx, mut rx) = queue(2);
        tx.push(1).unwrap();
        assert_eq!(rx.pop(), Some(1));
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn full_queue_returns_item() {
        let (mut tx, mut rx) = queue(2);
        tx.push(1).unwrap();
        tx.push(2).unwrap();
        assert!(tx.is_full());
        assert_eq!(tx.push(3), Err(3));

        // Rejected push must not disturb stored items.
        assert_eq!(rx.pop(), Some(1));
        assert_eq!(rx.pop(), Some(2));
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn wraps_buffer_correctly() {
        let (mut tx, mut rx) = queue(4);
        for cycle in 0..3 {
            for i in 0..4 {
                tx.push(i + cycle * 4).unwrap();
            }
            for i in 0..4 {
                assert_eq!(rx.pop().unwrap(), i + cycle * 4);
            }
        }
    }

    #[test]
    fn drain_respects_max() {
        let (mut tx, mut rx) = queue(8);
        for i in 0..6 {
            tx.push(i).unwrap();
        }
        let mut out = Vec::new();
        assert_eq!(rx.drain_into(&mut out, 4), 4);
        assert_eq!(out, vec![0, 1, 2, 3]);
        assert_eq!(rx.drain_into(&mut out, 10), 2);
        assert_eq!(out, vec![0, 1, 2, 3, 4, 5]);
        assert!(rx.is_empty());
    }

    #[test]
    fn concurrent_transfer_preserves_order() {
        const ITEMS: u64 = 100_000;
        let (mut tx, mut rx) = queue(64);

        let producer = std::thread::spawn(move || {
            let mut next = 0;
            while next < ITEMS {
                match tx.push(next) {
                    Ok(()) => next += 1,
                    Err(_) => std::hint::spin_loop(),
                }
            }
        });

        let mut expected = 0;
        while expected < ITEMS {
            if let Some(item) = rx.pop() {
                assert_eq!(item, expected);
                expected += 1;
            } else {
                std::hint::spin_loop();
            }
        }
        producer.join().unwrap();
        assert!(rx.is_empty());
    }

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn remaining_items_dropped_with_queue() {
        let drops = Arc::new(AtomicUsize::new(0));
        let (mut tx, mut rx) = BoundedQueue::with_capacity(4).unwrap().split();
        for _ in 0..3 {
            assert!(tx.push(DropCounter(drops.clone())).is_ok());
        }
        drop(rx.pop());
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        drop(tx);
        drop(rx);
        assert_eq!(drops.load(Ordering::SeqCst), 3);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push,
        Pop,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Push), Just(Op::Pop)]
    }

    #[test]
    fn len_stays_within_capacity_when_counters_disagree() {
        let ring = BoundedQueue::<u32>::with_capacity(4).unwrap();

        ring.head.0.store(10, Ordering::Relaxed);
        ring.tail.0.store(11, Ordering::Relaxed);
        assert_eq!(ring.len(), 0);

        ring.tail.0.store(2, Ordering::Relaxed);
        assert_eq!(ring.len(), 4);
    }

    proptest! {
        #[test]
        fn matches_fifo_model(ops in proptest::collection::vec(op(), 0..256)) {
            let (mut tx, mut rx) = queue(16);
            let mut model = VecDeque::new();
            let mut next = 0u64;

            for op in ops {
                match op {
                    Op::Push => {
                        let accepted = tx.push(next).is_ok();
                        prop_assert_eq!(accepted, model.len() < 16);
                        if accepted {
                            model.push_back(next);
                        }
                        next += 1;
                    }
                    Op::Pop => prop_assert_eq!(rx.pop(), model.pop_front()),
                }
                prop_assert_eq!(rx.len(), model.len());
            }
        }
    }
}
