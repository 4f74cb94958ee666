//! ## taktvakt-sequencer::sequencer
//! **Rate-monotonic tick thread driving the registered services**
//!
//! The tick thread sleeps to absolute deadlines `base + tick × interval`.
//! Lateness observed on waking is folded into `base`, so a late tick shifts
//! the timeline instead of producing a burst of catch-up ticks. Services see
//! the accumulated shift as drift.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use taktvakt_config::SequencerConfig;
use taktvakt_core::{time, Shutdown, Timestamp};
use tracing::{debug, error, info, instrument, warn};

use crate::error::SequencerError;
use crate::plan::ReleasePlan;
use crate::release::Release;
use crate::service::{Period, ReleaseHandle, Service, ServiceSpec, Workload};
use crate::stats::ServiceReport;
use crate::threading;
use crate::timing_log::timing_log_path;

/// Priority requested by the tick thread; it must preempt every service.
const TICK_PRIORITY: i32 = 99;

pub struct Sequencer {
    config: SequencerConfig,
    tick_interval: Duration,
    shutdown: Shutdown,
    services: Vec<Service>,
    ticking: Arc<AtomicBool>,
    tick_thread: Option<JoinHandle<u64>>,
    started: bool,
}

impl Sequencer {
    pub fn new(config: SequencerConfig, shutdown: Shutdown) -> Result<Self, SequencerError> {
        if config.tick_interval_us == 0 || config.wrap_modulus == 0 {
            return Err(SequencerError::InvalidTimebase);
        }
        Ok(Self {
            tick_interval: Duration::from_micros(config.tick_interval_us),
            config,
            shutdown,
            services: Vec::new(),
            ticking: Arc::new(AtomicBool::new(false)),
            tick_thread: None,
            started: false,
        })
    }

    /// Registers a service and spawns its (idle) worker.
    ///
    /// Periodic periods must be non-zero and divide the tick wrap modulus.
    pub fn add_service<W>(
        &mut self,
        name: &str,
        affinity: usize,
        priority: i32,
        period: Period,
        workload: W,
    ) -> Result<(), SequencerError>
    where
        W: Workload + 'static,
    {
        if self.started {
            return Err(SequencerError::AlreadyStarted);
        }
        if let Period::Ticks(ticks) = period {
            if ticks == 0 {
                return Err(SequencerError::ZeroPeriod {
                    service: name.to_owned(),
                });
            }
            if self.config.wrap_modulus % ticks != 0 {
                return Err(SequencerError::PeriodNotDivisor {
                    service: name.to_owned(),
                    period: ticks,
                    modulus: self.config.wrap_modulus,
                });
            }
        }

        let spec = ServiceSpec {
            name: name.to_owned(),
            core: affinity,
            priority,
            period,
            tick_interval: self.tick_interval,
            timing_log: self
                .config
                .timing_log_dir
                .as_deref()
                .map(|dir| timing_log_path(dir, name)),
            shutdown: self.shutdown.clone(),
        };
        let service = Service::spawn(spec, Box::new(workload))?;
        debug!(service = name, core = affinity, priority, ?period, "Service registered");
        self.services.push(service);
        Ok(())
    }

    /// Spawns the tick thread. Tick 0 fires immediately.
    #[instrument(skip(self), fields(services = self.services.len()))]
    pub fn start_services(&mut self) -> Result<(), SequencerError> {
        if self.started {
            return Err(SequencerError::AlreadyStarted);
        }

        let plan = ReleasePlan::new(
            self.services.iter().map(Service::period).collect(),
            self.config.wrap_modulus,
        );
        let handles: Vec<ReleaseHandle> =
            self.services.iter().map(Service::release_handle).collect();
        let ticker = Ticker {
            plan,
            handles,
            interval: self.tick_interval,
            ticking: Arc::clone(&self.ticking),
            shutdown: self.shutdown.clone(),
        };

        self.ticking.store(true, Ordering::Release);
        let handle = thread::Builder::new()
            .name("sequencer".into())
            .spawn(move || ticker.run())
            .map_err(|source| {
                self.ticking.store(false, Ordering::Release);
                SequencerError::Spawn {
                    name: "sequencer".into(),
                    source,
                }
            })?;

        self.tick_thread = Some(handle);
        self.started = true;
        info!(
            tick_interval_us = self.config.tick_interval_us,
            wrap_modulus = self.config.wrap_modulus,
            "Sequencer started"
        );
        Ok(())
    }

    /// Stops the tick thread, then every service, then joins them.
    ///
    /// Idempotent and safe without a prior start; later calls return nothing.
    pub fn stop_services(&mut self) -> Vec<ServiceReport> {
        self.ticking.store(false, Ordering::Release);
        if let Some(handle) = self.tick_thread.take() {
            match handle.join() {
                Ok(ticks) => info!(ticks, "Sequencer tick thread stopped"),
                Err(_) => error!("Sequencer tick thread panicked"),
            }
        }

        for service in &self.services {
            service.stop();
        }

        let mut reports = Vec::with_capacity(self.services.len());
        for service in &mut self.services {
            if let Some(report) = service.join() {
                if report.period.is_periodic() {
                    report.log();
                }
                reports.push(report);
            }
        }
        reports
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(Service::name)
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.stop_services();
    }
}

struct Ticker {
    plan: ReleasePlan,
    handles: Vec<ReleaseHandle>,
    interval: Duration,
    ticking: Arc<AtomicBool>,
    shutdown: Shutdown,
}

impl Ticker {
    /// Returns the number of ticks issued.
    fn run(mut self) -> u64 {
        if let Err(e) = threading::set_fifo_priority(TICK_PRIORITY) {
            warn!(error = %e, "Failed to set SCHED_FIFO priority for tick thread");
        }

        let interval_ns = self.interval.as_nanos() as u64;
        let mut base = Timestamp::now();
        let mut tick: u64 = 0;
        let mut due = Vec::with_capacity(self.plan.len());

        while self.ticking.load(Ordering::Acquire) && !self.shutdown.is_triggered() {
            let deadline = base + Duration::from_nanos(interval_ns.saturating_mul(tick));
            time::sleep_until(deadline);
            let now = Timestamp::now();
            base = base + now.saturating_duration_since(deadline);

            if !self.ticking.load(Ordering::Acquire) {
                break;
            }

            due.clear();
            self.plan.due_at(tick, &mut due);
            let release = Release::new(now, tick);
            for &index in &due {
                self.handles[index].release(release);
            }
            tick += 1;
        }
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    fn config(tick_interval_us: u64) -> SequencerConfig {
        SequencerConfig {
            tick_interval_us,
            wrap_modulus: 1000,
            timing_log_dir: None,
        }
    }

    #[test]
    fn rejects_bad_periods() {
        let mut sequencer = Sequencer::new(config(1000), Shutdown::new()).unwrap();
        let noop = |_: &crate::RunControl| {};
        assert!(matches!(
            sequencer.add_service("ZERO", 0, 1, Period::Ticks(0), noop),
            Err(SequencerError::ZeroPeriod { .. })
        ));
        assert!(matches!(
            sequencer.add_service("ODD", 0, 1, Period::Ticks(3), noop),
            Err(SequencerError::PeriodNotDivisor {
                period: 3,
                modulus: 1000,
                ..
            })
        ));
        assert!(sequencer.add_service("OK", 0, 1, Period::Ticks(8), noop).is_ok());
    }

    #[test]
    fn stop_without_start_is_safe_and_idempotent() {
        let mut sequencer = Sequencer::new(config(1000), Shutdown::new()).unwrap();
        sequencer
            .add_service("IDLE", 0, 1, Period::Ticks(10), |_: &crate::RunControl| {})
            .unwrap();
        let reports = sequencer.stop_services();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].invocations, 0);
        assert!(sequencer.stop_services().is_empty());
    }

    #[test]
    fn add_after_start_rejected() {
        let mut sequencer = Sequencer::new(config(1000), Shutdown::new()).unwrap();
        sequencer.start_services().unwrap();
        assert!(matches!(
            sequencer.add_service("LATE", 0, 1, Period::RunOnce, |_: &crate::RunControl| {}),
            Err(SequencerError::AlreadyStarted)
        ));
        assert!(matches!(
            sequencer.start_services(),
            Err(SequencerError::AlreadyStarted)
        ));
        sequencer.stop_services();
    }

    #[test]
    fn run_once_service_runs_once() {
        let runs = Arc::new(AtomicU64::new(0));
        let mut sequencer = Sequencer::new(config(500), Shutdown::new()).unwrap();
        {
            let runs = Arc::clone(&runs);
            sequencer
                .add_service("ONCE", 0, 1, Period::RunOnce, move |_: &crate::RunControl| {
                    runs.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        sequencer.start_services().unwrap();
        thread::sleep(Duration::from_millis(50));
        let reports = sequencer.stop_services();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(reports[0].invocations, 1);
        assert_eq!(reports[0].cpu_utilization, None);
    }

    #[test]
    fn periodic_service_released_repeatedly() {
        let mut sequencer = Sequencer::new(config(1000), Shutdown::new()).unwrap();
        sequencer
            .add_service("FAST", 0, 1, Period::Ticks(2), |_: &crate::RunControl| {})
            .unwrap();
        sequencer.start_services().unwrap();
        thread::sleep(Duration::from_millis(60));
        let reports = sequencer.stop_services();

        let report = &reports[0];
        assert!(report.invocations >= 2, "got {}", report.invocations);
        assert_eq!(report.deadline_misses, 0);
    }

    #[test]
    fn sleeping_workload_misses_every_deadline() {
        let mut sequencer = Sequencer::new(config(1000), Shutdown::new()).unwrap();
        // Period 2 ticks = 2 ms, each invocation sleeps 5 ms.
        sequencer
            .add_service("SLOW", 0, 1, Period::Ticks(2), |_: &crate::RunControl| {
                thread::sleep(Duration::from_millis(5));
            })
            .unwrap();
        sequencer.start_services().unwrap();
        thread::sleep(Duration::from_millis(60));
        let reports = sequencer.stop_services();

        let report = &reports[0];
        assert!(report.invocations >= 1);
        assert_eq!(report.deadline_misses, report.invocations);
        assert!(report.coalesced > 0);
    }

    #[test]
    fn shutdown_flag_stops_ticking() {
        let shutdown = Shutdown::new();
        let mut sequencer = Sequencer::new(config(1000), shutdown.clone()).unwrap();
        sequencer.start_services().unwrap();
        shutdown.trigger();
        thread::sleep(Duration::from_millis(10));
        assert!(sequencer.stop_services().is_empty());
    }

    #[test]
    fn timing_logs_only_for_periodic_services() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(1000);
        config.timing_log_dir = Some(dir.path().to_path_buf());

        let mut sequencer = Sequencer::new(config, Shutdown::new()).unwrap();
        sequencer
            .add_service("PERIODIC", 0, 1, Period::Ticks(1), |_: &crate::RunControl| {})
            .unwrap();
        sequencer
            .add_service("ONESHOT", 0, 1, Period::RunOnce, |_: &crate::RunControl| {})
            .unwrap();
        sequencer.start_services().unwrap();
        thread::sleep(Duration::from_millis(20));
        sequencer.stop_services();

        assert!(dir.path().join("PERIODIC_exec_times.csv").exists());
        assert!(!dir.path().join("ONESHOT_exec_times.csv").exists());
    }
}
