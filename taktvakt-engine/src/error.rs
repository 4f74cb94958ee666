use std::io;
use std::path::PathBuf;

use taktvakt_capture::CaptureError;
use taktvakt_config::ConfigError;
use taktvakt_core::{PoolError, QueueError};
use taktvakt_detection::DetectionError;
use taktvakt_sequencer::SequencerError;
use thiserror::Error;

/// Setup failures. Once the pipeline runs, errors are counted and logged
/// instead of surfacing here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sequencer error: {0}")]
    Sequencer(#[from] SequencerError),

    #[error("Detection setup failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Buffer pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Failed to bind control listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open packet log {}", path.display())]
    PacketLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
