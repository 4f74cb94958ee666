//! ## taktvakt-telemetry::metrics
//! **Prometheus counters and latency histogram for the pipeline**
//!
//! Drops are never retried; they are counted here so overload is visible in
//! `GET /metrics` instead of disappearing.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    /// Frames taken from the device.
    pub packets_received: IntCounter,
    /// Frames dropped because the RX → Detect ring was full.
    pub rx_dropped: IntCounter,
    /// Frames the device could not deliver because the pool was empty.
    pub pool_exhausted: IntCounter,
    /// Classification outcomes, labelled `safe`/`threat`/`unknown`.
    pub classified: IntCounterVec,
    /// Results dropped because the Detect → Log ring was full.
    pub detect_dropped: IntCounter,
    /// Records appended to the packet log.
    pub packets_logged: IntCounter,
    pub replies_sent: IntCounter,
    pub replies_failed: IntCounter,
    /// Deadline misses, labelled by service name.
    pub deadline_misses: IntCounterVec,
    /// Receive to log latency in milliseconds.
    pub end_to_end_latency: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let packets_received =
            IntCounter::new("taktvakt_packets_received_total", "Frames received")?;
        let rx_dropped = IntCounter::new(
            "taktvakt_rx_dropped_total",
            "Frames dropped on a full packet ring",
        )?;
        let pool_exhausted = IntCounter::new(
            "taktvakt_pool_exhausted_total",
            "Receive attempts that found the buffer pool empty",
        )?;
        let classified = IntCounterVec::new(
            Opts::new("taktvakt_classified_total", "Classified frames"),
            &["classification"],
        )?;
        let detect_dropped = IntCounter::new(
            "taktvakt_detect_dropped_total",
            "Results dropped on a full result ring",
        )?;
        let packets_logged =
            IntCounter::new("taktvakt_packets_logged_total", "Packet log records")?;
        let replies_sent =
            IntCounter::new("taktvakt_replies_sent_total", "Directory replies sent")?;
        let replies_failed = IntCounter::new(
            "taktvakt_replies_failed_total",
            "Directory replies that failed to send",
        )?;
        let deadline_misses = IntCounterVec::new(
            Opts::new("taktvakt_deadline_misses_total", "Service deadline misses"),
            &["service"],
        )?;
        let end_to_end_latency = Histogram::with_opts(
            HistogramOpts::new(
                "taktvakt_end_to_end_latency_ms",
                "Receive to log latency",
            )
            .buckets(vec![0.01, 0.1, 1.0, 10.0, 100.0, 1_000.0]),
        )?;

        registry.register(Box::new(packets_received.clone()))?;
        registry.register(Box::new(rx_dropped.clone()))?;
        registry.register(Box::new(pool_exhausted.clone()))?;
        registry.register(Box::new(classified.clone()))?;
        registry.register(Box::new(detect_dropped.clone()))?;
        registry.register(Box::new(packets_logged.clone()))?;
        registry.register(Box::new(replies_sent.clone()))?;
        registry.register(Box::new(replies_failed.clone()))?;
        registry.register(Box::new(deadline_misses.clone()))?;
        registry.register(Box::new(end_to_end_latency.clone()))?;

        Ok(Self {
            registry,
            packets_received,
            rx_dropped,
            pool_exhausted,
            classified,
            detect_dropped,
            packets_logged,
            replies_sent,
            replies_failed,
            deadline_misses,
            end_to_end_latency,
        })
    }

    /// Renders all metrics in the Prometheus text exposition format.
    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    #[inline]
    pub fn inc_classified(&self, classification: &str) {
        self.classified.with_label_values(&[classification]).inc();
    }

    #[inline]
    pub fn add_deadline_misses(&self, service: &str, misses: u64) {
        self.deadline_misses.with_label_values(&[service]).inc_by(misses);
    }

    #[inline]
    pub fn observe_latency_ms(&self, latency_ms: f64) {
        self.end_to_end_latency.observe(latency_ms);
    }
}
