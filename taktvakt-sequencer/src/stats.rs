//! Per-service timing statistics.
//!
//! Owned by the worker thread while it runs and handed back through the join
//! handle, so nothing here is shared or synchronised.

use std::time::Duration;

use taktvakt_core::Timestamp;
use tracing::info;

use crate::release::Release;
use crate::service::Period;

/// Min/max/average of one measured quantity, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Default)]
struct Running {
    min: f64,
    max: f64,
    sum: f64,
    count: u64,
}

impl Running {
    fn record(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    fn summary(&self) -> Summary {
        if self.count == 0 {
            return Summary::default();
        }
        Summary {
            min: self.min,
            max: self.max,
            avg: self.sum / self.count as f64,
        }
    }
}

/// Accumulates jitter, execution time, drift and deadline misses.
#[derive(Debug)]
pub(crate) struct TimingStats {
    period: Option<Duration>,
    tick_interval: Duration,
    invocations: u64,
    jitter: Running,
    exec: Running,
    drift_base: Option<Release>,
    last_drift_us: f64,
    max_drift_us: f64,
    deadline_misses: u64,
}

impl TimingStats {
    /// `period` is `None` for run-once services.
    pub(crate) fn new(period: Option<Duration>, tick_interval: Duration) -> Self {
        Self {
            period,
            tick_interval,
            invocations: 0,
            jitter: Running::default(),
            exec: Running::default(),
            drift_base: None,
            last_drift_us: 0.0,
            max_drift_us: 0.0,
            deadline_misses: 0,
        }
    }

    /// Folds in one invocation and returns its execution time in µs.
    pub(crate) fn record(&mut self, release: Release, wake: Timestamp, end: Timestamp) -> f64 {
        let exec_us = end.micros_since(wake);
        self.invocations += 1;
        self.jitter.record(wake.micros_since(release.at));
        self.exec.record(exec_us);

        if let Some(period) = self.period {
            if end.saturating_duration_since(wake) > period {
                self.deadline_misses += 1;
            }

            let base = *self.drift_base.get_or_insert(release);
            let elapsed_ticks = release.tick.saturating_sub(base.tick);
            let expected_ns = base.at.as_nanos() as i128
                + elapsed_ticks as i128 * self.tick_interval.as_nanos() as i128;
            let drift_us = (release.at.as_nanos() as i128 - expected_ns) as f64 / 1_000.0;
            self.last_drift_us = drift_us;
            if drift_us.abs() > self.max_drift_us.abs() {
                self.max_drift_us = drift_us;
            }
        }

        exec_us
    }

    pub(crate) fn into_report(self, name: &str, period: Period, coalesced: u64) -> ServiceReport {
        let exec = self.exec.summary();
        let cpu_utilization = self
            .period
            .filter(|_| self.invocations > 0)
            .map(|period| exec.avg / (period.as_nanos() as f64 / 1_000.0) * 100.0);

        ServiceReport {
            name: name.to_owned(),
            period,
            invocations: self.invocations,
            jitter_us: self.jitter.summary(),
            exec_us: exec,
            last_drift_us: self.last_drift_us,
            max_drift_us: self.max_drift_us,
            deadline_misses: self.deadline_misses,
            coalesced,
            cpu_utilization,
        }
    }
}

/// Final statistics of one service, produced after its worker has stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceReport {
    pub name: String,
    pub period: Period,
    pub invocations: u64,
    pub jitter_us: Summary,
    pub exec_us: Summary,
    /// Drift of the most recent release against the base timeline.
    pub last_drift_us: f64,
    /// Largest drift (by magnitude) observed.
    pub max_drift_us: f64,
    pub deadline_misses: u64,
    /// Releases superseded before the worker consumed them.
    pub coalesced: u64,
    /// Average execution time as a percentage of the period.
    pub cpu_utilization: Option<f64>,
}

impl ServiceReport {
    pub fn log(&self) {
        info!(
            service = %self.name,
            period = ?self.period,
            invocations = self.invocations,
            jitter_min_us = self.jitter_us.min,
            jitter_max_us = self.jitter_us.max,
            jitter_avg_us = self.jitter_us.avg,
            exec_min_us = self.exec_us.min,
            exec_max_us = self.exec_us.max,
            exec_avg_us = self.exec_us.avg,
            last_drift_us = self.last_drift_us,
            max_drift_us = self.max_drift_us,
            deadline_misses = self.deadline_misses,
            coalesced = self.coalesced,
            cpu_utilization = ?self.cpu_utilization,
            "Service statistics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: u64 = 1_000_000;

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_nanos(ms * MS)
    }

    #[test]
    fn jitter_and_exec_summaries() {
        let mut stats = TimingStats::new(None, Duration::from_millis(1));
        stats.record(Release::new(at(0), 0), at(1), at(3));
        stats.record(Release::new(at(10), 10), at(13), at(14));

        let report = stats.into_report("RX", Period::RunOnce, 0);
        assert_eq!(report.invocations, 2);
        assert_eq!(report.jitter_us.min, 1_000.0);
        assert_eq!(report.jitter_us.max, 3_000.0);
        assert_eq!(report.jitter_us.avg, 2_000.0);
        assert_eq!(report.exec_us.avg, 1_500.0);
        assert_eq!(report.deadline_misses, 0);
        assert_eq!(report.cpu_utilization, None);
    }

    #[test]
    fn deadline_miss_per_overrunning_invocation() {
        let mut stats = TimingStats::new(Some(Duration::from_millis(2)), Duration::from_millis(1));
        stats.record(Release::new(at(0), 0), at(0), at(5));
        stats.record(Release::new(at(6), 6), at(6), at(7));
        stats.record(Release::new(at(8), 8), at(8), at(11));

        let report = stats.into_report("LOGGER", Period::Ticks(2), 0);
        assert_eq!(report.deadline_misses, 2);
        assert_eq!(report.cpu_utilization, Some(150.0));
    }

    #[test]
    fn drift_measured_against_base_timeline() {
        let mut stats = TimingStats::new(Some(Duration::from_millis(2)), Duration::from_millis(1));
        stats.record(Release::new(at(100), 0), at(100), at(100));
        stats.record(Release::new(at(102), 2), at(102), at(102));
        // Released 3 ms late relative to base + 4 ticks.
        stats.record(Release::new(at(107), 4), at(107), at(107));
        stats.record(Release::new(at(107), 6), at(107), at(107));

        let report = stats.into_report("LOGGER", Period::Ticks(2), 0);
        assert_eq!(report.last_drift_us, 1_000.0);
        assert_eq!(report.max_drift_us, 3_000.0);
    }

    #[tracing_test::traced_test]
    #[test]
    fn report_logged_with_service_name() {
        let mut stats = TimingStats::new(Some(Duration::from_millis(2)), Duration::from_millis(1));
        stats.record(Release::new(at(0), 0), at(0), at(1));
        stats.into_report("STATUS", Period::Ticks(2), 0).log();

        assert!(logs_contain("Service statistics"));
        assert!(logs_contain("STATUS"));
    }
}
