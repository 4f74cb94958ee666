//! Status-indication heartbeat.

use taktvakt_sequencer::{RunControl, Workload};
use taktvakt_telemetry::MetricsRecorder;
use tracing::debug;

use crate::context::StatusIndicator;

pub struct StatusWorkload {
    indicator: StatusIndicator,
    metrics: MetricsRecorder,
}

impl StatusWorkload {
    pub fn new(indicator: StatusIndicator, metrics: MetricsRecorder) -> Self {
        Self { indicator, metrics }
    }
}

impl Workload for StatusWorkload {
    fn run(&mut self, _control: &RunControl) {
        let on = self.indicator.toggle();
        let classified = |label: &str| self.metrics.classified.with_label_values(&[label]).get();
        debug!(
            on,
            received = self.metrics.packets_received.get(),
            dropped = self.metrics.rx_dropped.get() + self.metrics.detect_dropped.get(),
            threats = classified("threat"),
            safe = classified("safe"),
            logged = self.metrics.packets_logged.get(),
            "Status"
        );
    }
}
