//! ## taktvakt-telemetry::logging
//! **Structured logging with tracing and OpenTelemetry attributes**
//!
//! Every crate logs through `tracing` macros; [`EventLogger::init`] installs
//! the process-wide fmt subscriber. Worker threads are named after their
//! service, so thread names are part of every line.

use opentelemetry::KeyValue;
use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. `RUST_LOG` overrides the default `info`.
    ///
    /// A second call is a no-op.
    pub fn init() {
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::ENTER)
            .try_init();
    }

    /// Emits a security-relevant event (threat seen, directory changed).
    ///
    /// Synchronous: called from worker threads inside the pipeline.
    #[inline]
    pub fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!(
            "security_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );
        let _entered = span.enter();
        tracing::info!(metadata = ?metadata, "Security event occurred");
    }
}
