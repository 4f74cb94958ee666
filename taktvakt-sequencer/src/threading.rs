//! CPU pinning and real-time priority for the calling thread.
//!
//! Both are scheduling hints: callers log failures and carry on.

use std::io;

/// Restricts the calling thread to `core`.
#[cfg(target_os = "linux")]
pub fn pin_to_core(core: usize) -> io::Result<()> {
    use libc::{cpu_set_t, pthread_self, pthread_setaffinity_np, CPU_SET, CPU_SETSIZE, CPU_ZERO};

    if core >= CPU_SETSIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("core {core} exceeds CPU_SETSIZE"),
        ));
    }

    // SAFETY: `set` is a plain bitmask owned by this frame; the call only
    // reads it for the current thread.
    let rc = unsafe {
        let mut set: cpu_set_t = std::mem::zeroed();
        CPU_ZERO(&mut set);
        CPU_SET(core, &mut set);
        pthread_setaffinity_np(pthread_self(), std::mem::size_of::<cpu_set_t>(), &set)
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(rc))
    }
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_core(core: usize) -> io::Result<()> {
    let _ = core;
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "thread pinning is only available on Linux",
    ))
}

/// Switches the calling thread to `SCHED_FIFO` at `priority`.
///
/// Usually needs `CAP_SYS_NICE` or root.
#[cfg(target_os = "linux")]
pub fn set_fifo_priority(priority: i32) -> io::Result<()> {
    use libc::{pthread_self, pthread_setschedparam, sched_param, SCHED_FIFO};

    // SAFETY: `param` is fully initialised and outlives the call.
    let rc = unsafe {
        let mut param: sched_param = std::mem::zeroed();
        param.sched_priority = priority;
        pthread_setschedparam(pthread_self(), SCHED_FIFO, &param)
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(rc))
    }
}

#[cfg(not(target_os = "linux"))]
pub fn set_fifo_priority(priority: i32) -> io::Result<()> {
    let _ = priority;
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "SCHED_FIFO is only available on Linux",
    ))
}
