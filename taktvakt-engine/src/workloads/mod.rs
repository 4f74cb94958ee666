//! Per-service workloads. Each owns its end of the pipeline rings and is
//! handed to the sequencer as a [`taktvakt_sequencer::Workload`].

pub mod detect;
pub mod log;
pub mod rx;
pub mod status;

pub use detect::DetectWorkload;
pub use log::LogWorkload;
pub use rx::RxWorkload;
pub use status::StatusWorkload;
