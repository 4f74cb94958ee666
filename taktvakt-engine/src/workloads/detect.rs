//! ## taktvakt-engine::workloads::detect
//! **Detection service: classify, answer directory queries, forward**
//!
//! Released once; drains the packet ring until the service stops. Every
//! buffer is forwarded with its timestamps; if the result ring is full the
//! buffer is freed here instead.

use std::net::SocketAddr;
use std::sync::Arc;

use opentelemetry::KeyValue;
use taktvakt_core::{Consumer, PacketBuffer, Producer, Timestamp};
use taktvakt_detection::{
    format_reply, Classification, Classifier, Directory, QueryRequest, ReplySink, ThreatReason,
    Verdict,
};
use taktvakt_sequencer::{RunControl, Workload};
use taktvakt_telemetry::{EventLogger, MetricsRecorder};
use tracing::{debug, warn};

use crate::idle::Idler;
use crate::pipeline::DetectionResult;

pub struct DetectWorkload {
    packets: Consumer<PacketBuffer>,
    results: Producer<DetectionResult>,
    classifier: Classifier,
    directory: Arc<Directory>,
    replies: Box<dyn ReplySink>,
    metrics: MetricsRecorder,
    idler: Idler,
}

impl DetectWorkload {
    pub fn new(
        packets: Consumer<PacketBuffer>,
        results: Producer<DetectionResult>,
        classifier: Classifier,
        directory: Arc<Directory>,
        replies: Box<dyn ReplySink>,
        metrics: MetricsRecorder,
        idler: Idler,
    ) -> Self {
        Self {
            packets,
            results,
            classifier,
            directory,
            replies,
            metrics,
            idler,
        }
    }

    /// Handles one buffer from the packet ring, if any.
    pub fn process_next(&mut self) -> bool {
        let Some(buffer) = self.packets.pop() else {
            return false;
        };
        let rx_timestamp = buffer.rx_timestamp();
        let verdict = self.classifier.classify(buffer.data());
        let detect_timestamp = Timestamp::now();

        self.metrics.inc_classified(verdict.classification.label());
        if verdict.classification == Classification::Threat {
            report_threat(&verdict);
        }
        if let Some(query) = &verdict.query {
            self.answer(query);
        }

        let result = DetectionResult {
            buffer,
            classification: verdict.classification,
            rx_timestamp,
            detect_timestamp,
            source: verdict.source,
            destination: verdict.destination,
        };
        if let Err(result) = self.results.push(result) {
            self.metrics.detect_dropped.inc();
            result.buffer.free();
        }
        true
    }

    fn answer(&mut self, query: &QueryRequest) {
        let Some(value) = self.directory.lookup(&query.key) else {
            debug!(key = %query.key, "Query for unknown key");
            return;
        };
        let reply = format_reply(&query.key, &value);
        match self
            .replies
            .send_reply(SocketAddr::V4(query.reply_to), reply.as_bytes())
        {
            Ok(()) => {
                self.metrics.replies_sent.inc();
                debug!(key = %query.key, to = %query.reply_to, "Query answered");
            }
            Err(e) => {
                self.metrics.replies_failed.inc();
                warn!(error = %e, to = %query.reply_to, "Failed to send query reply");
            }
        }
    }
}

fn report_threat(verdict: &Verdict) {
    let reason = match verdict.reason {
        Some(ThreatReason::BlacklistedProtocol(protocol)) => format!("protocol {protocol}"),
        Some(ThreatReason::Signature(index)) => format!("signature {index}"),
        None => "unspecified".to_owned(),
    };
    EventLogger::log_event(
        "threat_detected",
        vec![
            KeyValue::new("source", verdict.source.to_string()),
            KeyValue::new("destination", verdict.destination.to_string()),
            KeyValue::new("reason", reason),
        ],
    );
}

impl Workload for DetectWorkload {
    fn run(&mut self, control: &RunControl) {
        while control.should_continue() {
            if !self.process_next() {
                self.idler.idle();
            }
        }
    }
}
