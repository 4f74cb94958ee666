//! What a polling stage does between empty polls.

use std::thread;
use std::time::Duration;

use taktvakt_config::{IdleStrategy, PipelineConfig};

#[derive(Debug, Clone, Copy)]
pub struct Idler {
    strategy: IdleStrategy,
    sleep: Duration,
}

impl Idler {
    pub fn new(strategy: IdleStrategy, sleep: Duration) -> Self {
        Self { strategy, sleep }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.idle_strategy,
            Duration::from_micros(config.idle_sleep_us),
        )
    }

    #[inline]
    pub fn idle(&self) {
        match self.strategy {
            IdleStrategy::Spin => std::hint::spin_loop(),
            IdleStrategy::Yield => thread::yield_now(),
            IdleStrategy::Sleep => thread::sleep(self.sleep),
        }
    }
}
