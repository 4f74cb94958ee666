use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Pattern compilation failed: {0}")]
    PatternError(String),

    #[error("Directory slot {index} out of range (capacity {capacity})")]
    SlotOutOfRange { index: usize, capacity: usize },

    #[error("Directory seed has {seeds} entries but capacity is {capacity}")]
    TooManySeeds { seeds: usize, capacity: usize },

    #[error("Failed to bind reply socket on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
