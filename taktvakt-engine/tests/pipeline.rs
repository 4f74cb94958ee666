mod common;

use std::fs;
use std::time::Duration;

use taktvakt_capture::ScriptedDevice;
use taktvakt_config::ServiceConfig;
use taktvakt_core::Shutdown;
use taktvakt_detection::{Classification, MemoryReplySink};
use taktvakt_engine::{PipelineContext, Runtime, PACKET_LOG_HEADER};
use taktvakt_protocols::{FrameBuilder, MacAddr};

use common::{test_config, wait_for};

fn mac(n: u8) -> MacAddr {
    MacAddr([0x02, 0, 0, 0, 0xAA, n])
}

fn idle_runtime(context: PipelineContext) -> Runtime {
    let device = ScriptedDevice::new(context.pool.clone(), Vec::<Vec<u8>>::new());
    Runtime::new(
        context,
        Box::new(device),
        Box::new(MemoryReplySink::new()),
    )
    .unwrap()
}

#[test]
fn three_icmp_two_udp_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.control.enabled = false;
    let context = PipelineContext::new(config, Shutdown::new()).unwrap();

    let frames: Vec<_> = (0..5u8)
        .map(|n| {
            let builder = FrameBuilder::new().macs(mac(n), MacAddr::BROADCAST);
            if n % 2 == 0 {
                builder.icmp_echo(u16::from(n), b"ping")
            } else {
                builder.udp(40000, 9000, b"hello")
            }
        })
        .collect();
    let device = ScriptedDevice::new(context.pool.clone(), frames);
    let pool = context.pool.clone();

    let mut runtime = Runtime::new(
        context,
        Box::new(device),
        Box::new(MemoryReplySink::new()),
    )
    .unwrap();
    runtime.start().unwrap();
    let logged = wait_for(Duration::from_secs(5), || runtime.recent().len() == 5);
    let summary = runtime.stop();
    assert!(logged, "only {} records logged", runtime.recent().len());

    let records = runtime.recent().snapshot();
    let sources: Vec<MacAddr> = records.iter().map(|r| r.source).collect();
    assert_eq!(sources, (0..5).map(mac).collect::<Vec<_>>());

    let count = |class: Classification| {
        records
            .iter()
            .filter(|r| r.classification == class)
            .count()
    };
    assert_eq!(count(Classification::Threat), 3);
    assert_eq!(count(Classification::Safe), 2);
    assert!(records
        .iter()
        .all(|r| r.detect_delay_ms >= 0.0 && r.log_delay_ms >= 0.0));

    assert_eq!(summary.received, 5);
    assert_eq!(summary.logged, 5);
    assert_eq!(summary.rx_dropped + summary.detect_dropped, 0);
    assert_eq!(pool.available(), pool.capacity());
    assert_eq!(pool.stats().allocations(), pool.stats().releases());

    let log = fs::read_to_string(dir.path().join("packet_logger.csv")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], PACKET_LOG_HEADER);
    assert!(lines[1].contains(",02:00:00:00:aa:00,ff:ff:ff:ff:ff:ff,Threat,"));
    assert!(lines[2].contains(",Safe,"));
}

#[test]
fn results_queued_at_stop_are_still_logged() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.control.enabled = false;
    // The logger gets at most its first release before the stop.
    config.services.logger = ServiceConfig::periodic(0, 10, 500);
    let context = PipelineContext::new(config, Shutdown::new()).unwrap();
    let metrics = context.metrics.clone();
    let pool = context.pool.clone();

    let frames: Vec<_> = (0..5u8)
        .map(|n| {
            FrameBuilder::new()
                .macs(mac(n), MacAddr::BROADCAST)
                .udp(40000, 9000, b"queued")
        })
        .collect();
    let device = ScriptedDevice::new(context.pool.clone(), frames);
    let mut runtime = Runtime::new(
        context,
        Box::new(device),
        Box::new(MemoryReplySink::new()),
    )
    .unwrap();
    runtime.start().unwrap();

    let detected = wait_for(Duration::from_secs(5), || {
        metrics.classified.with_label_values(&["safe"]).get() == 5
    });
    let summary = runtime.stop();
    assert!(detected);

    assert_eq!(summary.received, 5);
    assert_eq!(
        summary.received,
        summary.logged + summary.rx_dropped + summary.detect_dropped
    );
    assert_eq!(summary.logged, 5);
    assert_eq!(runtime.recent().len(), 5);
    assert_eq!(pool.available(), pool.capacity());

    let log = fs::read_to_string(dir.path().join("packet_logger.csv")).unwrap();
    assert_eq!(log.lines().count(), 6);
}

#[test]
fn reports_for_every_service_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.control.enabled = false;
    let context = PipelineContext::new(config, Shutdown::new()).unwrap();
    let status = context.status.clone();

    let mut runtime = idle_runtime(context);
    let summary = runtime.run(Some(Duration::from_millis(100))).unwrap();

    let names: Vec<&str> = summary.reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["RX", "DETECT", "LOGGER", "STATUS"]);
    assert_eq!(summary.report("RX").unwrap().invocations, 1);
    assert!(summary.report("LOGGER").unwrap().invocations > 1);
    assert!(status.toggles() >= 1);

    // A second stop hands back the same summary.
    assert_eq!(runtime.stop().reports.len(), 4);
}

#[test]
fn shutdown_flag_ends_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.control.enabled = false;
    let shutdown = Shutdown::new();
    let context = PipelineContext::new(config, shutdown.clone()).unwrap();
    let mut runtime = idle_runtime(context);

    let trigger = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        shutdown.trigger();
    });
    let summary = runtime.run(None).unwrap();
    trigger.join().unwrap();
    assert_eq!(summary.received, 0);
}
