//! # taktvakt-engine
//!
//! The packet pipeline run under the rate-monotonic sequencer:
//!
//! ```text
//! device → RX → packet ring → DETECT → result ring → LOGGER → pool
//!                                 ↘ replies   CONTROL ↔ directory
//! ```
//!
//! Buffers move by value through the rings, so exactly one stage owns each
//! frame at any time and every frame goes back to the pool exactly once.

pub mod context;
pub mod control;
pub mod error;
pub mod idle;
pub mod packet_log;
pub mod pipeline;
pub mod runtime;
pub mod workloads;

pub use context::{PipelineContext, StatusIndicator};
pub use control::ControlServer;
pub use error::EngineError;
pub use idle::Idler;
pub use packet_log::{PacketLog, PacketRecord, RecentRecords, PACKET_LOG_HEADER};
pub use pipeline::DetectionResult;
pub use runtime::{RunSummary, Runtime};
