//! ## taktvakt-engine::context
//! **Everything the workloads share, constructed once per run**
//!
//! Replaces process globals: the buffer pool, the directory, metrics, the
//! status indicator and the quiescence flag are created here and cloned into
//! each workload before the sequencer starts.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use taktvakt_config::TaktvaktConfig;
use taktvakt_core::{BufferPool, Shutdown};
use taktvakt_detection::Directory;
use taktvakt_telemetry::MetricsRecorder;
use tracing::{debug, warn};

use crate::error::EngineError;

/// Two-state indicator flipped by the status service.
#[derive(Debug, Clone, Default)]
pub struct StatusIndicator {
    on: Arc<AtomicBool>,
    toggles: Arc<AtomicU64>,
}

impl StatusIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the indicator and returns the new state.
    pub fn toggle(&self) -> bool {
        self.toggles.fetch_add(1, Ordering::Relaxed);
        !self.on.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Acquire)
    }

    pub fn toggles(&self) -> u64 {
        self.toggles.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<TaktvaktConfig>,
    pub pool: BufferPool,
    pub metrics: MetricsRecorder,
    pub directory: Arc<Directory>,
    pub status: StatusIndicator,
    pub shutdown: Shutdown,
}

impl PipelineContext {
    pub fn new(config: TaktvaktConfig, shutdown: Shutdown) -> Result<Self, EngineError> {
        config.check_consistency()?;
        for (service, core) in config.missing_cores() {
            warn!(service, core, "Configured core not present on this machine");
        }
        if let Some((timeout_us, period_us)) = config.control_timeout_over_period() {
            warn!(
                timeout_us,
                period_us,
                "Control read timeout is not below the CONTROL period"
            );
        }

        let pool = BufferPool::new(config.pipeline.pool_capacity, config.pipeline.frame_size)?;
        let directory = Directory::seeded(
            config.detection.directory_capacity,
            &config.detection.directory,
        )?;
        debug!(
            pool_capacity = pool.capacity(),
            frame_size = pool.frame_size(),
            directory_capacity = directory.capacity(),
            "Pipeline context created"
        );

        Ok(Self {
            config: Arc::new(config),
            pool,
            metrics: MetricsRecorder::new()?,
            directory: Arc::new(directory),
            status: StatusIndicator::new(),
            shutdown,
        })
    }
}
