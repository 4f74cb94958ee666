//! ## taktvakt-core::alloc
//! **Preallocated packet-buffer storage**
//!
//! ### Expectations (Production):
//! - Zero heap allocations in packet processing paths
//! - Every buffer returns to its pool exactly once
//! - Live buffers never exceed pool capacity
//!
//! ### Key Submodules:
//! - `pool/`: Fixed-size frame pool and the move-only `PacketBuffer` handle
//! - `stats/`: Allocation/release counters for leak and double-free checks

pub mod pool;
pub mod stats;

pub use pool::{BufferPool, PacketBuffer};
pub use stats::PoolStats;
