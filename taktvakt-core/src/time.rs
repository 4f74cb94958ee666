//! ## taktvakt-core::time
//! **Monotonic timestamps & absolute-deadline sleeping**
//!
//! All release, wake and completion instants in the pipeline are taken from the
//! same monotonic clock so jitter, execution time and drift can be computed by
//! plain subtraction. On Linux the clock is `CLOCK_MONOTONIC` read through
//! `clock_gettime`, and [`sleep_until`] uses `clock_nanosleep` with
//! `TIMER_ABSTIME` so oversleep on one tick never accumulates into the next.

use std::ops::Add;
use std::time::Duration;

#[cfg(target_os = "linux")]
const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Monotonic instant in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Reads the monotonic clock.
    #[inline]
    pub fn now() -> Self {
        Self(monotonic_nanos())
    }

    /// Signed distance `self - earlier` in microseconds.
    #[inline]
    pub fn micros_since(self, earlier: Timestamp) -> f64 {
        (self.0 as i128 - earlier.0 as i128) as f64 / 1_000.0
    }

    /// Signed distance `self - earlier` in milliseconds.
    #[inline]
    pub fn millis_since(self, earlier: Timestamp) -> f64 {
        (self.0 as i128 - earlier.0 as i128) as f64 / 1_000_000.0
    }

    /// Unsigned distance, zero if `earlier` is after `self`.
    #[inline]
    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(rhs.as_nanos() as u64))
    }
}

#[cfg(target_os = "linux")]
fn monotonic_nanos() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    ts.tv_sec as u64 * NANOS_PER_SEC + ts.tv_nsec as u64
}

#[cfg(not(target_os = "linux"))]
fn monotonic_nanos() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Sleeps until the monotonic clock reaches `deadline`.
///
/// Returns immediately if the deadline is already in the past.
#[cfg(target_os = "linux")]
pub fn sleep_until(deadline: Timestamp) {
    let ts = libc::timespec {
        tv_sec: (deadline.0 / NANOS_PER_SEC) as libc::time_t,
        tv_nsec: (deadline.0 % NANOS_PER_SEC) as libc::c_long,
    };
    loop {
        // SAFETY: `ts` outlives the call; the remainder pointer may be null
        // for absolute sleeps.
        let rc = unsafe {
            libc::clock_nanosleep(
                libc::CLOCK_MONOTONIC,
                libc::TIMER_ABSTIME,
                &ts,
                std::ptr::null_mut(),
            )
        };
        if rc != libc::EINTR {
            break;
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn sleep_until(deadline: Timestamp) {
    let now = Timestamp::now();
    if deadline > now {
        std::thread::sleep(deadline.saturating_duration_since(now));
    }
}
