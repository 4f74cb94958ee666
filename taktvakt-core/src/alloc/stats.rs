//! ## taktvakt-core::alloc::stats
//! **Buffer pool statistics**
//!
//! Atomic counters updated on every allocation and release. Their balance is
//! the runtime check behind the "freed exactly once" invariant: once a
//! pipeline drains, `allocations == releases`.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct PoolStats {
    allocations: AtomicUsize,
    releases: AtomicUsize,
    exhausted: AtomicUsize,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_allocations(&self) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_releases(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Relaxed)
    }

    /// Allocation attempts refused because every buffer was in flight.
    pub fn exhausted(&self) -> usize {
        self.exhausted.load(Ordering::Relaxed)
    }

    /// Buffers currently held by some pipeline stage.
    pub fn live(&self) -> usize {
        self.allocations().saturating_sub(self.releases())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_tracks_balance() {
        let stats = PoolStats::new();
        for _ in 0..10 {
            stats.increment_allocations();
        }
        for _ in 0..4 {
            stats.increment_releases();
        }
        stats.increment_exhausted();

        assert_eq!(stats.allocations(), 10);
        assert_eq!(stats.releases(), 4);
        assert_eq!(stats.live(), 6);
        assert_eq!(stats.exhausted(), 1);
    }
}
