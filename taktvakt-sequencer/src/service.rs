//! A unit of work with its own pinned worker thread and release primitive.
//!
//! Lifecycle: `Created → Running → Stopping → Stopped`. The worker blocks on
//! its [`ReleaseSignal`](crate::release) until the sequencer releases it,
//! measures jitter against the release timestamp, runs the workload once,
//! then records execution time, drift and deadline misses.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use taktvakt_core::{Shutdown, Timestamp};
use tracing::{debug, error, warn};

use crate::error::SequencerError;
use crate::release::{Release, ReleaseSignal};
use crate::stats::{ServiceReport, TimingStats};
use crate::threading;
use crate::timing_log::TimingLog;

/// How often a service is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Every `n` ticks, starting at tick 0.
    Ticks(u64),
    /// Exactly once, at the first tick. For self-looping poll workloads.
    RunOnce,
}

impl Period {
    pub fn is_periodic(&self) -> bool {
        matches!(self, Period::Ticks(_))
    }

    /// Wall-clock length of the period, `None` for run-once services.
    pub fn duration(&self, tick_interval: Duration) -> Option<Duration> {
        match *self {
            Period::Ticks(n) => Some(tick_interval.saturating_mul(n.min(u32::MAX as u64) as u32)),
            Period::RunOnce => None,
        }
    }
}

impl From<Option<u64>> for Period {
    fn from(period_ticks: Option<u64>) -> Self {
        period_ticks.map_or(Period::RunOnce, Period::Ticks)
    }
}

/// What a service does each time it is released.
pub trait Workload: Send {
    fn run(&mut self, control: &RunControl);
}

impl<F> Workload for F
where
    F: FnMut(&RunControl) + Send,
{
    fn run(&mut self, control: &RunControl) {
        self(control)
    }
}

/// Handed to a workload on every invocation.
pub struct RunControl {
    running: Arc<AtomicBool>,
    shutdown: Shutdown,
    release: Release,
}

impl RunControl {
    /// False once the service is stopping or the process is shutting down.
    ///
    /// Poll loops in run-once workloads check this between iterations.
    #[inline]
    pub fn should_continue(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.shutdown.is_triggered()
    }

    /// The release that triggered this invocation.
    #[inline]
    pub fn release(&self) -> Release {
        self.release
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceState {
    Created = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl ServiceState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ServiceState::Created,
            1 => ServiceState::Running,
            2 => ServiceState::Stopping,
            _ => ServiceState::Stopped,
        }
    }
}

struct ServiceShared {
    signal: ReleaseSignal,
    running: Arc<AtomicBool>,
    state: AtomicU8,
}

impl ServiceShared {
    fn set_state(&self, state: ServiceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Moves forward only; a late `Running` never overwrites `Stopping`.
    fn advance_state(&self, state: ServiceState) {
        self.state.fetch_max(state as u8, Ordering::AcqRel);
    }
}

/// Everything needed to spawn a [`Service`].
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: String,
    pub core: usize,
    pub priority: i32,
    pub period: Period,
    pub tick_interval: Duration,
    /// Execution-time CSV; only honoured for periodic services.
    pub timing_log: Option<PathBuf>,
    pub shutdown: Shutdown,
}

/// Cheap handle the tick thread uses to release a service.
#[derive(Clone)]
pub struct ReleaseHandle {
    shared: Arc<ServiceShared>,
}

impl ReleaseHandle {
    #[inline]
    pub fn release(&self, release: Release) {
        self.shared.signal.post(release);
    }
}

pub struct Service {
    name: String,
    period: Period,
    shared: Arc<ServiceShared>,
    handle: Option<JoinHandle<ServiceReport>>,
}

impl Service {
    /// Creates the worker thread, named after the service. The worker waits
    /// for its first release.
    pub fn spawn(spec: ServiceSpec, workload: Box<dyn Workload>) -> Result<Self, SequencerError> {
        let timing_log = match (&spec.timing_log, spec.period.is_periodic()) {
            (Some(path), true) => Some(TimingLog::create(path).map_err(|source| {
                SequencerError::TimingLog {
                    path: path.clone(),
                    source,
                }
            })?),
            _ => None,
        };

        let running = Arc::new(AtomicBool::new(true));
        let shared = Arc::new(ServiceShared {
            signal: ReleaseSignal::default(),
            running: Arc::clone(&running),
            state: AtomicU8::new(ServiceState::Created as u8),
        });

        let worker = Worker {
            name: spec.name.clone(),
            core: spec.core,
            priority: spec.priority,
            period: spec.period,
            shared: Arc::clone(&shared),
            stats: TimingStats::new(spec.period.duration(spec.tick_interval), spec.tick_interval),
            timing_log,
            workload,
            running,
            shutdown: spec.shutdown,
        };

        let handle = thread::Builder::new()
            .name(spec.name.clone())
            .spawn(move || worker.run())
            .map_err(|source| SequencerError::Spawn {
                name: spec.name.clone(),
                source,
            })?;

        Ok(Self {
            name: spec.name,
            period: spec.period,
            shared,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn release_handle(&self) -> ReleaseHandle {
        ReleaseHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Posts a release. Never blocks on the workload.
    pub fn release(&self, release: Release) {
        self.shared.signal.post(release);
    }

    /// Asks the worker to exit after its current invocation. Never blocks.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.advance_state(ServiceState::Stopping);
        self.shared.signal.stop();
    }

    /// Waits for the worker and returns its statistics.
    ///
    /// Returns `None` if already joined or if the workload panicked.
    pub fn join(&mut self) -> Option<ServiceReport> {
        let handle = self.handle.take()?;
        let report = match handle.join() {
            Ok(report) => Some(report),
            Err(_) => {
                error!(service = %self.name, "Service worker panicked");
                None
            }
        };
        self.shared.set_state(ServiceState::Stopped);
        report
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.stop();
        if let Some(report) = self.join() {
            if report.period.is_periodic() {
                report.log();
            }
        }
    }
}

struct Worker {
    name: String,
    core: usize,
    priority: i32,
    period: Period,
    shared: Arc<ServiceShared>,
    stats: TimingStats,
    timing_log: Option<TimingLog>,
    workload: Box<dyn Workload>,
    running: Arc<AtomicBool>,
    shutdown: Shutdown,
}

impl Worker {
    fn run(mut self) -> ServiceReport {
        self.apply_scheduling_hints();

        while let Some(release) = self.shared.signal.wait() {
            self.shared.advance_state(ServiceState::Running);
            let wake = Timestamp::now();
            let control = RunControl {
                running: Arc::clone(&self.running),
                shutdown: self.shutdown.clone(),
                release,
            };
            self.workload.run(&control);
            let end = Timestamp::now();

            let exec_us = self.stats.record(release, wake, end);
            if let Some(log) = self.timing_log.as_mut() {
                log.record(exec_us);
            }
        }

        if let Some(log) = self.timing_log.as_mut() {
            log.flush();
        }
        debug!(service = %self.name, "Service worker exiting");
        self.stats
            .into_report(&self.name, self.period, self.shared.signal.coalesced())
    }

    fn apply_scheduling_hints(&self) {
        if let Err(e) = threading::pin_to_core(self.core) {
            warn!(service = %self.name, core = self.core, error = %e, "Failed to pin service to core");
        }
        if let Err(e) = threading::set_fifo_priority(self.priority) {
            warn!(
                service = %self.name,
                priority = self.priority,
                error = %e,
                "Failed to set SCHED_FIFO priority"
            );
        }
    }
}
