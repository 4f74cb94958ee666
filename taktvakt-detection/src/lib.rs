//! # taktvakt Detection Engine
//!
//! Frame classification (protocol blacklist and payload signatures), the
//! shared key/value directory answered over UDP, and the reply path.

pub mod classifier;
pub mod directory;
pub mod error;
pub mod reply;
pub mod signatures;

pub use classifier::{Classification, Classifier, QueryRequest, ThreatReason, Verdict};
pub use directory::{Directory, DirectoryEntry};
pub use error::DetectionError;
pub use reply::{format_reply, MemoryReplySink, ReplySink, UdpReplySink};
pub use signatures::SignatureEngine;
