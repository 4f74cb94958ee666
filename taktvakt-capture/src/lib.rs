//! # taktvakt-capture
//!
//! Packet sources polled by the RX service.
//!
//! - `scripted`: a fixed list of frames, used by tests and replays
//! - `generator`: seeded synthetic traffic with attack bursts
//! - `pcap_device`: live capture on an interface (`live` feature)

pub mod device;
pub mod error;
pub mod generator;
#[cfg(feature = "live")]
pub mod pcap_device;
pub mod scripted;

pub use device::{Device, DeviceStats};
pub use error::CaptureError;
pub use generator::{FrameKind, GeneratorStats, TrafficGenerator};
#[cfg(feature = "live")]
pub use pcap_device::PcapDevice;
pub use scripted::ScriptedDevice;

use taktvakt_config::CaptureConfig;
use taktvakt_core::BufferPool;

/// Opens the packet source selected by `config.mode`.
pub fn open_device(
    config: &CaptureConfig,
    pool: BufferPool,
) -> Result<Box<dyn Device>, CaptureError> {
    match config.mode.as_str() {
        "simulated" => Ok(Box::new(TrafficGenerator::new(
            pool,
            config.generator.clone(),
        ))),
        #[cfg(feature = "live")]
        "live" => Ok(Box::new(PcapDevice::open(config, pool)?)),
        other => Err(CaptureError::Unsupported(other.to_owned())),
    }
}
