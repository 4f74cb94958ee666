//! # taktvakt-core
//!
//! Foundation layer shared by every stage of the packet pipeline.
//!
//! ### Expectations (Production):
//! - Zero heap allocations in packet processing paths
//! - Lock-free hand-off between pipeline stages
//! - Exactly-once release of every packet buffer
//!
//! ### Key Submodules:
//! - `alloc`: Preallocated packet-buffer pool and its statistics
//! - `queue`: Bounded SPSC ring used for inter-core ownership transfer
//! - `time`: Monotonic timestamps and absolute-deadline sleeping
//! - `shutdown`: Process-wide quiescence flag

pub mod alloc;
pub mod error;
pub mod queue;
pub mod shutdown;
pub mod time;

pub mod prelude {
    pub use crate::alloc::*;
    pub use crate::error::*;
    pub use crate::queue::*;
    pub use crate::shutdown::Shutdown;
    pub use crate::time::Timestamp;
}

pub use alloc::{BufferPool, PacketBuffer, PoolStats};
pub use error::{PoolError, QueueError};
pub use queue::{BoundedQueue, Consumer, Producer};
pub use shutdown::Shutdown;
pub use time::Timestamp;
