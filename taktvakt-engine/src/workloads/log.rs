//! ## taktvakt-engine::workloads::log
//! **Logging service: persist and display results, release buffers**
//!
//! Periodic. Each release drains at most one batch from the result ring.

use taktvakt_core::{Consumer, Timestamp};
use taktvakt_sequencer::{RunControl, Workload};
use taktvakt_telemetry::MetricsRecorder;
use tracing::{debug, warn};

use crate::packet_log::{PacketLog, PacketRecord, RecentRecords};
use crate::pipeline::DetectionResult;

pub struct LogWorkload {
    results: Consumer<DetectionResult>,
    batch: Vec<DetectionResult>,
    max_batch: usize,
    log: PacketLog,
    recent: RecentRecords,
    metrics: MetricsRecorder,
    write_failed: bool,
}

impl LogWorkload {
    pub fn new(
        results: Consumer<DetectionResult>,
        max_batch: usize,
        log: PacketLog,
        recent: RecentRecords,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            results,
            batch: Vec::with_capacity(max_batch),
            max_batch,
            log,
            recent,
            metrics,
            write_failed: false,
        }
    }

    /// Logs one batch. Returns the number of results handled.
    pub fn drain_batch(&mut self) -> usize {
        let drained = self.results.drain_into(&mut self.batch, self.max_batch);
        if drained == 0 {
            return 0;
        }

        for result in self.batch.drain(..) {
            let logged_at = Timestamp::now();
            let record = PacketRecord::new(&result, logged_at);
            if let Err(e) = self.log.append(&record) {
                if !self.write_failed {
                    warn!(error = %e, path = %self.log.path().display(), "Packet log write failed");
                    self.write_failed = true;
                }
            }
            debug!(
                source = %record.source,
                destination = %record.destination,
                classification = %record.classification,
                detect_delay_ms = record.detect_delay_ms,
                log_delay_ms = record.log_delay_ms,
                "Packet logged"
            );
            self.metrics
                .observe_latency_ms(logged_at.millis_since(result.rx_timestamp));
            self.metrics.packets_logged.inc();
            self.recent.push(record);
            result.buffer.free();
        }

        if let Err(e) = self.log.flush() {
            warn!(error = %e, "Packet log flush failed");
        }
        drained
    }
}

impl Workload for LogWorkload {
    fn run(&mut self, _control: &RunControl) {
        self.drain_batch();
    }
}
