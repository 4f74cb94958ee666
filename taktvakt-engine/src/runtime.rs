//! ## taktvakt-engine::runtime
//! **Builds the pipeline from configuration and runs it under the sequencer**
//!
//! Service registration order is RX, DETECT, CONTROL (when enabled), LOGGER,
//! STATUS. Setup errors surface before any thread is released; once running,
//! the pipeline only counts and logs.
//!
//! On stop, results still queued between the stages are detected and logged
//! on the stopping thread, so every received packet ends up either logged or
//! counted as dropped.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use taktvakt_capture::{open_device, Device};
use taktvakt_config::{ServiceConfig, TaktvaktConfig};
use taktvakt_core::{BoundedQueue, PacketBuffer, Shutdown};
use taktvakt_detection::{Classifier, ReplySink, UdpReplySink};
use parking_lot::Mutex;
use taktvakt_sequencer::{Period, RunControl, Sequencer, ServiceReport, Workload};
use tracing::{info, instrument};

use crate::context::PipelineContext;
use crate::control::ControlServer;
use crate::error::EngineError;
use crate::idle::Idler;
use crate::packet_log::{PacketLog, RecentRecords};
use crate::pipeline::DetectionResult;
use crate::workloads::{DetectWorkload, LogWorkload, RxWorkload, StatusWorkload};

const WAIT_POLL: Duration = Duration::from_millis(10);

/// Pipeline counters and per-service statistics of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub received: u64,
    pub rx_dropped: u64,
    pub pool_exhausted: u64,
    pub detect_dropped: u64,
    pub logged: u64,
    pub reports: Vec<ServiceReport>,
}

impl RunSummary {
    pub fn report(&self, service: &str) -> Option<&ServiceReport> {
        self.reports.iter().find(|report| report.name == service)
    }
}

pub struct Runtime {
    context: PipelineContext,
    sequencer: Sequencer,
    detect: Arc<Mutex<DetectWorkload>>,
    logger: Arc<Mutex<LogWorkload>>,
    recent: RecentRecords,
    control_addr: Option<SocketAddr>,
    summary: Option<RunSummary>,
}

impl Runtime {
    /// Opens the configured device and a UDP reply socket, then builds.
    pub fn from_config(config: TaktvaktConfig, shutdown: Shutdown) -> Result<Self, EngineError> {
        let context = PipelineContext::new(config, shutdown)?;
        let device = open_device(&context.config.capture, context.pool.clone())?;
        let replies = UdpReplySink::bind(&context.config.detection.reply_bind)?;
        Self::new(context, device, Box::new(replies))
    }

    /// Wires rings and workloads and registers every service. Nothing runs
    /// until [`Runtime::start`].
    pub fn new(
        context: PipelineContext,
        device: Box<dyn Device>,
        replies: Box<dyn ReplySink>,
    ) -> Result<Self, EngineError> {
        let config = &context.config;
        let pipeline = &config.pipeline;
        let idler = Idler::from_config(pipeline);

        let (packet_tx, packet_rx) =
            BoundedQueue::<PacketBuffer>::with_capacity(pipeline.packet_ring_capacity)?.split();
        let (result_tx, result_rx) =
            BoundedQueue::<DetectionResult>::with_capacity(pipeline.result_ring_capacity)?.split();

        let rx = RxWorkload::new(
            device,
            packet_tx,
            context.metrics.clone(),
            pipeline.burst_size,
            idler,
        );
        let detect = Arc::new(Mutex::new(DetectWorkload::new(
            packet_rx,
            result_tx,
            Classifier::new(&config.detection)?,
            context.directory.clone(),
            replies,
            context.metrics.clone(),
            idler,
        )));
        let control = if config.control.enabled {
            Some(ControlServer::bind(
                &config.control,
                context.directory.clone(),
                context.metrics.clone(),
            )?)
        } else {
            None
        };
        let control_addr = control
            .as_ref()
            .and_then(|server| server.local_addr().ok());
        let recent = RecentRecords::new(config.logging.recent_capacity);
        let logger = Arc::new(Mutex::new(LogWorkload::new(
            result_rx,
            pipeline.log_batch,
            PacketLog::open(&config.logging.packet_log)?,
            recent.clone(),
            context.metrics.clone(),
        )));
        let status = StatusWorkload::new(context.status.clone(), context.metrics.clone());

        let services = &config.services;
        let mut sequencer = Sequencer::new(config.sequencer.clone(), context.shutdown.clone())?;
        register(&mut sequencer, "RX", &services.rx, rx)?;
        register(&mut sequencer, "DETECT", &services.detect, Shared(Arc::clone(&detect)))?;
        if let Some(control) = control {
            register(&mut sequencer, "CONTROL", &services.control, control)?;
        }
        register(&mut sequencer, "LOGGER", &services.logger, Shared(Arc::clone(&logger)))?;
        register(&mut sequencer, "STATUS", &services.status, status)?;

        Ok(Self {
            context,
            sequencer,
            detect,
            logger,
            recent,
            control_addr,
            summary: None,
        })
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn recent(&self) -> &RecentRecords {
        &self.recent
    }

    /// Address the control plane listens on, if enabled.
    pub fn control_addr(&self) -> Option<SocketAddr> {
        self.control_addr
    }

    pub fn start(&mut self) -> Result<(), EngineError> {
        self.sequencer.start_services()?;
        info!(
            services = ?self.sequencer.service_names().collect::<Vec<_>>(),
            "Pipeline running"
        );
        Ok(())
    }

    /// Starts, waits for the quiescence flag or `duration`, then stops.
    #[instrument(skip(self))]
    pub fn run(&mut self, duration: Option<Duration>) -> Result<RunSummary, EngineError> {
        self.start()?;
        let deadline = duration.map(|d| Instant::now() + d);
        while !self.context.shutdown.is_triggered() {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                info!("Run duration elapsed");
                self.context.shutdown.trigger();
                break;
            }
            thread::sleep(WAIT_POLL);
        }
        Ok(self.stop())
    }

    /// Stops every service and reports. Later calls return the first summary.
    pub fn stop(&mut self) -> RunSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }

        let reports = self.sequencer.stop_services();
        let flushed = self.flush_queued();
        if flushed > 0 {
            info!(flushed, "Logged results queued at shutdown");
        }
        let metrics = &self.context.metrics;
        for report in &reports {
            if report.deadline_misses > 0 {
                metrics.add_deadline_misses(&report.name, report.deadline_misses);
            }
        }

        let summary = RunSummary {
            received: metrics.packets_received.get(),
            rx_dropped: metrics.rx_dropped.get(),
            pool_exhausted: metrics.pool_exhausted.get(),
            detect_dropped: metrics.detect_dropped.get(),
            logged: metrics.packets_logged.get(),
            reports,
        };
        info!(
            received = summary.received,
            dropped = summary.rx_dropped,
            pool_exhausted = summary.pool_exhausted,
            "RX statistics"
        );
        info!(
            detect_dropped = summary.detect_dropped,
            logged = summary.logged,
            "Pipeline stopped"
        );
        self.summary = Some(summary.clone());
        summary
    }

    /// Runs detection and logging until both rings are empty. Only called
    /// once every service thread has been joined.
    fn flush_queued(&self) -> usize {
        let mut detect = self.detect.lock();
        let mut logger = self.logger.lock();
        let mut flushed = 0;
        loop {
            let detected = detect.process_next();
            let logged = logger.drain_batch();
            flushed += logged;
            if !detected && logged == 0 {
                return flushed;
            }
        }
    }
}

/// A workload the runtime keeps a handle to after the service thread exits.
struct Shared<W>(Arc<Mutex<W>>);

impl<W: Workload> Workload for Shared<W> {
    fn run(&mut self, control: &RunControl) {
        self.0.lock().run(control);
    }
}

fn register<W: Workload + 'static>(
    sequencer: &mut Sequencer,
    name: &str,
    service: &ServiceConfig,
    workload: W,
) -> Result<(), EngineError> {
    sequencer.add_service(
        name,
        service.core,
        service.priority,
        Period::from(service.period_ticks),
        workload,
    )?;
    Ok(())
}
