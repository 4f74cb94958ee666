//! # taktvakt-sequencer
//!
//! Rate-monotonic release of a static set of services.
//!
//! One tick thread decides which services are due on each tick and releases
//! them; every service owns a worker thread pinned to its core that runs the
//! workload once per release and keeps timing statistics:
//! - **Jitter**: wake time minus release time
//! - **Execution time**: completion minus wake
//! - **Drift**: release time against `base + ticks × interval`
//! - **Deadline misses**: executions longer than the period

pub mod error;
pub mod plan;
pub mod release;
pub mod sequencer;
pub mod service;
pub mod stats;
pub mod threading;
mod timing_log;

pub use error::SequencerError;
pub use plan::ReleasePlan;
pub use release::Release;
pub use sequencer::Sequencer;
pub use service::{
    Period, ReleaseHandle, RunControl, Service, ServiceSpec, ServiceState, Workload,
};
pub use stats::{ServiceReport, Summary};
pub use timing_log::timing_log_path;
