use std::path::Path;
use std::time::{Duration, Instant};

use taktvakt_config::{IdleStrategy, ServiceConfig, TaktvaktConfig};

/// Small pool, no timing logs, sleeping pollers, everything on core 0.
pub fn test_config(dir: &Path) -> TaktvaktConfig {
    let mut config = TaktvaktConfig::default();
    config.sequencer.timing_log_dir = None;
    config.pipeline.pool_capacity = 64;
    config.pipeline.frame_size = 256;
    config.pipeline.packet_ring_capacity = 16;
    config.pipeline.result_ring_capacity = 16;
    config.pipeline.idle_strategy = IdleStrategy::Sleep;
    config.pipeline.idle_sleep_us = 100;
    config.services.rx = ServiceConfig::run_once(0, 10);
    config.services.detect = ServiceConfig::run_once(0, 10);
    config.services.control = ServiceConfig::periodic(0, 10, 2);
    config.services.logger = ServiceConfig::periodic(0, 10, 2);
    config.services.status = ServiceConfig::periodic(0, 10, 10);
    config.control.bind = "127.0.0.1:0".into();
    config.control.read_timeout_ms = 500;
    config.detection.reply_bind = "127.0.0.1:0".into();
    config.logging.packet_log = dir.join("packet_logger.csv");
    config
}

pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
