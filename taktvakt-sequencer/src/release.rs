//! Coalescing release primitive between the tick thread and a service worker.
//!
//! Holds at most one pending release. Posting while a release is still
//! pending replaces it with the newer one, so a worker that falls behind runs
//! once with the latest release timestamp instead of replaying the backlog.

use parking_lot::{Condvar, Mutex};
use taktvakt_core::Timestamp;

/// One release of a service: the tick it belongs to and when it was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub at: Timestamp,
    pub tick: u64,
}

impl Release {
    pub fn new(at: Timestamp, tick: u64) -> Self {
        Self { at, tick }
    }
}

#[derive(Default)]
struct SignalState {
    pending: Option<Release>,
    stopping: bool,
    coalesced: u64,
}

#[derive(Default)]
pub(crate) struct ReleaseSignal {
    state: Mutex<SignalState>,
    wake: Condvar,
}

impl ReleaseSignal {
    /// Records `release` and wakes the worker. Never blocks on the workload.
    pub(crate) fn post(&self, release: Release) {
        let mut state = self.state.lock();
        if state.pending.replace(release).is_some() {
            state.coalesced += 1;
        }
        drop(state);
        self.wake.notify_one();
    }

    /// Marks the signal as stopping and wakes the worker.
    pub(crate) fn stop(&self) {
        self.state.lock().stopping = true;
        self.wake.notify_one();
    }

    /// Blocks until a release is pending or the signal is stopped.
    ///
    /// Stopping wins over a pending release.
    pub(crate) fn wait(&self) -> Option<Release> {
        let mut state = self.state.lock();
        loop {
            if state.stopping {
                return None;
            }
            if let Some(release) = state.pending.take() {
                return Some(release);
            }
            self.wake.wait(&mut state);
        }
    }

    /// Releases superseded before the worker consumed them.
    pub(crate) fn coalesced(&self) -> u64 {
        self.state.lock().coalesced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn release(tick: u64) -> Release {
        Release::new(Timestamp::from_nanos(tick * 1_000), tick)
    }

    #[test]
    fn burst_collapses_to_latest() {
        let signal = ReleaseSignal::default();
        for tick in 0..5 {
            signal.post(release(tick));
        }
        assert_eq!(signal.wait(), Some(release(4)));
        assert_eq!(signal.coalesced(), 4);

        signal.stop();
        assert_eq!(signal.wait(), None);
    }

    #[test]
    fn stop_wakes_blocked_waiter() {
        let signal = Arc::new(ReleaseSignal::default());
        let waiter = {
            let signal = Arc::clone(&signal);
            std::thread::spawn(move || signal.wait())
        };
        std::thread::sleep(Duration::from_millis(20));
        signal.stop();
        assert_eq!(waiter.join().unwrap(), None);
    }

    #[test]
    fn stop_takes_precedence_over_pending() {
        let signal = ReleaseSignal::default();
        signal.post(release(1));
        signal.stop();
        assert_eq!(signal.wait(), None);
    }
}
