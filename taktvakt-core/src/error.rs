use thiserror::Error;

/// Queue construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Invalid capacity {0} (must be a non-zero power of two)")]
    InvalidCapacity(usize),
}

/// Buffer pool errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool capacity must be greater than zero")]
    ZeroCapacity,

    #[error("Frame size must be greater than zero")]
    ZeroFrameSize,

    #[error("Buffer pool exhausted ({capacity} buffers in flight)")]
    Exhausted { capacity: usize },
}
