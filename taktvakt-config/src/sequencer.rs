//! Sequencer timebase and per-service scheduling parameters.
//!
//! One tick is the sequencer's release granularity; service periods are
//! expressed in ticks. The tick counter wraps at `wrap_modulus`, so every
//! periodic service's period must divide it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Tick thread configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct SequencerConfig {
    /// Length of one tick in microseconds.
    #[validate(range(min = 100, max = 1_000_000))]
    #[serde(default = "default_tick_interval")]
    pub tick_interval_us: u64,

    /// Tick counter wrap modulus (the hyperperiod, in ticks).
    #[validate(range(min = 1, max = 1_000_000))]
    #[serde(default = "default_wrap_modulus")]
    pub wrap_modulus: u64,

    /// Directory for `<service>_exec_times.csv` files; `None` disables them.
    #[serde(default = "default_timing_log_dir")]
    pub timing_log_dir: Option<PathBuf>,
}

fn default_tick_interval() -> u64 {
    1_000
}

fn default_wrap_modulus() -> u64 {
    1_000
}

fn default_timing_log_dir() -> Option<PathBuf> {
    Some(PathBuf::from("."))
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            tick_interval_us: default_tick_interval(),
            wrap_modulus: default_wrap_modulus(),
            timing_log_dir: default_timing_log_dir(),
        }
    }
}

/// Placement and release policy of one service.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// CPU core the worker pins itself to.
    #[validate(range(max = 1023))]
    pub core: usize,

    /// `SCHED_FIFO` priority requested by the worker.
    #[validate(range(min = 1, max = 99))]
    pub priority: i32,

    /// Release period in ticks; absent means "release once at start".
    #[validate(range(min = 1))]
    #[serde(default)]
    pub period_ticks: Option<u64>,
}

impl ServiceConfig {
    pub fn run_once(core: usize, priority: i32) -> Self {
        Self {
            core,
            priority,
            period_ticks: None,
        }
    }

    pub fn periodic(core: usize, priority: i32, period_ticks: u64) -> Self {
        Self {
            core,
            priority,
            period_ticks: Some(period_ticks),
        }
    }
}

/// The static service set.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ServicesConfig {
    /// Receive service: polls the device continuously.
    #[validate(nested)]
    pub rx: ServiceConfig,

    /// Detection service: polls the packet ring continuously.
    #[validate(nested)]
    pub detect: ServiceConfig,

    /// Logging service: drains the result ring periodically.
    #[validate(nested)]
    pub logger: ServiceConfig,

    /// Control-plane responder.
    #[validate(nested)]
    pub control: ServiceConfig,

    /// Status indicator heartbeat.
    #[validate(nested)]
    pub status: ServiceConfig,
}

impl ServicesConfig {
    /// `(name, config)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ServiceConfig)> {
        [
            ("RX", &self.rx),
            ("DETECT", &self.detect),
            ("CONTROL", &self.control),
            ("LOGGER", &self.logger),
            ("STATUS", &self.status),
        ]
        .into_iter()
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            rx: ServiceConfig::run_once(1, 99),
            detect: ServiceConfig::run_once(2, 99),
            control: ServiceConfig::periodic(3, 98, 10),
            logger: ServiceConfig::periodic(3, 99, 2),
            status: ServiceConfig::periodic(3, 97, 500),
        }
    }
}
