//! Packet log configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct LoggingConfig {
    /// Append-only CSV of classified packets.
    #[serde(default = "default_packet_log")]
    pub packet_log: PathBuf,

    /// Capacity of the in-memory ring of recent records.
    #[validate(range(min = 1, max = 65_536))]
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
}

fn default_packet_log() -> PathBuf {
    PathBuf::from("packet_logger.csv")
}

fn default_recent_capacity() -> usize {
    128
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            packet_log: default_packet_log(),
            recent_capacity: default_recent_capacity(),
        }
    }
}
