//! Process-wide quiescence flag.
//!
//! Set once by signal handling (or an auto-stop timer) and polled by every
//! long-running loop between iterations. Shutdown is cooperative; nothing is
//! interrupted mid-iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests quiescence. Idempotent.
    #[inline]
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
