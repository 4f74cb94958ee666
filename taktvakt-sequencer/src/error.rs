use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("Tick interval and wrap modulus must be non-zero")]
    InvalidTimebase,

    #[error("Service {service}: periodic services need a period of at least one tick")]
    ZeroPeriod { service: String },

    #[error("Service {service}: period {period} does not divide the tick modulus {modulus}")]
    PeriodNotDivisor {
        service: String,
        period: u64,
        modulus: u64,
    },

    #[error("Services cannot be added after the sequencer has started")]
    AlreadyStarted,

    #[error("Failed to spawn thread {name}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create timing log {path}")]
    TimingLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
