//! ## taktvakt-engine::packet_log
//! **Persistent CSV log of classified packets plus a ring of recent records**
//!
//! The CSV header is written once, when the file is created or empty.
//! Reopening an existing log appends below the old records.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use taktvakt_core::Timestamp;
use taktvakt_detection::Classification;
use taktvakt_protocols::MacAddr;

use crate::error::EngineError;
use crate::pipeline::DetectionResult;

pub const PACKET_LOG_HEADER: &str =
    "timestamp,source_address,destination_address,classification,detect_delay_ms,log_delay_ms";

#[derive(Debug, Clone, PartialEq)]
pub struct PacketRecord {
    /// Wall clock, microseconds since the Unix epoch.
    pub timestamp_us: i64,
    pub source: MacAddr,
    pub destination: MacAddr,
    pub classification: Classification,
    pub detect_delay_ms: f64,
    pub log_delay_ms: f64,
}

impl PacketRecord {
    pub fn new(result: &DetectionResult, logged_at: Timestamp) -> Self {
        Self {
            timestamp_us: Utc::now().timestamp_micros(),
            source: result.source,
            destination: result.destination,
            classification: result.classification,
            detect_delay_ms: result.detect_delay_ms(),
            log_delay_ms: logged_at.millis_since(result.detect_timestamp),
        }
    }

    pub fn write_csv<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "{},{},{},{},{:.3},{:.3}",
            self.timestamp_us,
            self.source,
            self.destination,
            self.classification,
            self.detect_delay_ms,
            self.log_delay_ms
        )
    }
}

pub struct PacketLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl PacketLog {
    pub fn open(path: &Path) -> Result<Self, EngineError> {
        let open_err = |source| EngineError::PacketLog {
            path: path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_err)?;
        let is_empty = file.metadata().map_err(open_err)?.len() == 0;

        let mut writer = BufWriter::new(file);
        if is_empty {
            writeln!(writer, "{PACKET_LOG_HEADER}").map_err(open_err)?;
            writer.flush().map_err(open_err)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, record: &PacketRecord) -> io::Result<()> {
        record.write_csv(&mut self.writer)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Bounded, shared ring of the most recent records; the oldest is evicted.
#[derive(Debug, Clone)]
pub struct RecentRecords {
    records: Arc<Mutex<VecDeque<PacketRecord>>>,
    capacity: usize,
}

impl RecentRecords {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push(&self, record: PacketRecord) {
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<PacketRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
