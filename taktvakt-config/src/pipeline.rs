//! Packet pipeline sizing.
//!
//! Pool and ring capacities bound the memory the pipeline can hold in
//! flight; overflow anywhere is a counted drop, never growth.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

/// What a polling stage does when it finds nothing to do.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdleStrategy {
    /// Busy-spin: lowest latency, burns a full core.
    Spin,
    /// `sched_yield` between polls.
    #[default]
    Yield,
    /// Sleep `idle_sleep_us` between polls.
    Sleep,
}

/// Buffer pool and queue configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct PipelineConfig {
    /// Number of preallocated packet buffers.
    #[validate(range(min = 16, max = 1_048_576))]
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,

    /// Size of each packet buffer in bytes.
    #[validate(range(min = 64, max = 65_536))]
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,

    /// RX → Detect ring capacity (power of two).
    #[validate(custom(function = validation::validate_power_of_two))]
    #[serde(default = "default_packet_ring")]
    pub packet_ring_capacity: usize,

    /// Detect → Log ring capacity (power of two).
    #[validate(custom(function = validation::validate_power_of_two))]
    #[serde(default = "default_result_ring")]
    pub result_ring_capacity: usize,

    /// Maximum frames pulled from the device per poll.
    #[validate(range(min = 1, max = 1024))]
    #[serde(default = "default_burst_size")]
    pub burst_size: usize,

    /// Maximum results the logger drains per release.
    #[validate(range(min = 1, max = 65_536))]
    #[serde(default = "default_log_batch")]
    pub log_batch: usize,

    #[serde(default)]
    pub idle_strategy: IdleStrategy,

    /// Sleep length for [`IdleStrategy::Sleep`].
    #[validate(range(min = 1, max = 100_000))]
    #[serde(default = "default_idle_sleep")]
    pub idle_sleep_us: u64,
}

fn default_pool_capacity() -> usize {
    8192
}

fn default_frame_size() -> usize {
    2048
}

fn default_packet_ring() -> usize {
    2048
}

fn default_result_ring() -> usize {
    8192
}

fn default_burst_size() -> usize {
    32
}

fn default_log_batch() -> usize {
    1024
}

fn default_idle_sleep() -> u64 {
    50
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pool_capacity: default_pool_capacity(),
            frame_size: default_frame_size(),
            packet_ring_capacity: default_packet_ring(),
            result_ring_capacity: default_result_ring(),
            burst_size: default_burst_size(),
            log_batch: default_log_batch(),
            idle_strategy: IdleStrategy::default(),
            idle_sleep_us: default_idle_sleep(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two_rings() {
        let mut config = PipelineConfig::default();
        config.packet_ring_capacity = 1000;
        assert!(config.validate().is_err());
    }
}
