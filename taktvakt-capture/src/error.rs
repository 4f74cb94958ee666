use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture device '{0}' not found")]
    DeviceNotFound(String),

    #[error("Capture mode '{0}' is not available in this build")]
    Unsupported(String),

    #[cfg(feature = "live")]
    #[error("pcap error: {0}")]
    Pcap(#[from] pcap::Error),
}
