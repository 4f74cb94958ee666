//! Values that travel between pipeline stages.

use taktvakt_core::{PacketBuffer, Timestamp};
use taktvakt_detection::Classification;
use taktvakt_protocols::MacAddr;

/// A classified frame on its way from Detect to Log.
///
/// Owns the buffer; whoever drops the result returns it to the pool.
#[derive(Debug)]
pub struct DetectionResult {
    pub buffer: PacketBuffer,
    pub classification: Classification,
    pub rx_timestamp: Timestamp,
    pub detect_timestamp: Timestamp,
    pub source: MacAddr,
    pub destination: MacAddr,
}

impl DetectionResult {
    /// Receive to classification, in milliseconds.
    pub fn detect_delay_ms(&self) -> f64 {
        self.detect_timestamp.millis_since(self.rx_timestamp)
    }
}
