//! ## taktvakt-engine::control
//! **Control-plane responder: view and edit the directory over HTTP**
//!
//! Periodic and non-blocking: each release accepts at most one connection,
//! serves one request on it and closes it.
//!
//! - `GET /metrics`: Prometheus text format
//! - `GET` (any other path): the directory as an HTML form
//! - `POST`: `name%d=..&interest%d=..` overwrites slot `%d`, then `303`
//! - anything else: `400`

pub mod http;

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use taktvakt_config::ControlConfig;
use taktvakt_detection::Directory;
use taktvakt_sequencer::{RunControl, Workload};
use taktvakt_telemetry::{EventLogger, MetricsRecorder};
use tracing::{debug, warn};

use crate::error::EngineError;
use http::{Method, Parse, Request, MAX_REQUEST_LEN};

pub struct ControlServer {
    listener: TcpListener,
    directory: Arc<Directory>,
    metrics: MetricsRecorder,
    read_timeout: Duration,
}

impl ControlServer {
    pub fn bind(
        config: &ControlConfig,
        directory: Arc<Directory>,
        metrics: MetricsRecorder,
    ) -> Result<Self, EngineError> {
        let bind_err = |source| EngineError::Bind {
            addr: config.bind.clone(),
            source,
        };
        let listener = TcpListener::bind(&config.bind).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        Ok(Self {
            listener,
            directory,
            metrics,
            read_timeout: Duration::from_millis(config.read_timeout_ms),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves at most one pending connection. Returns whether one was accepted.
    pub fn poll_once(&mut self) -> bool {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = self.serve(stream) {
                    debug!(%peer, error = %e, "Control connection failed");
                }
                true
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => false,
            Err(e) => {
                warn!(error = %e, "Control listener accept failed");
                false
            }
        }
    }

    fn serve(&self, mut stream: TcpStream) -> io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.read_timeout))?;

        let response = match read_request(&mut stream, self.read_timeout)? {
            Parse::Complete(request) => self.respond(&request),
            Parse::Incomplete | Parse::Invalid => {
                debug!("Malformed control request");
                http::bad_request()
            }
        };
        stream.write_all(response.as_bytes())?;
        stream.flush()?;
        stream.shutdown(std::net::Shutdown::Both)
    }

    fn respond(&self, request: &Request) -> String {
        match (&request.method, request.path.as_str()) {
            (Method::Get, "/metrics") => match self.metrics.gather_metrics() {
                Ok(text) => http::ok("text/plain; version=0.0.4", &text),
                Err(e) => {
                    warn!(error = %e, "Failed to render metrics");
                    http::internal_error()
                }
            },
            (Method::Get, _) => http::ok(
                "text/html",
                &http::render_directory(&self.directory.snapshot()),
            ),
            (Method::Post, _) => {
                self.apply_form(&request.body);
                http::see_other("/")
            }
            (Method::Other(method), path) => {
                debug!(method = %method, path, "Unsupported control request");
                http::bad_request()
            }
        }
    }

    fn apply_form(&self, body: &str) {
        for (slot, key, value) in http::parse_form(body, self.directory.capacity()) {
            match self.directory.update_slot(slot, &key, &value) {
                Ok(()) => EventLogger::log_event(
                    "directory_updated",
                    vec![
                        KeyValue::new("slot", slot as i64),
                        KeyValue::new("key", key),
                    ],
                ),
                Err(e) => warn!(error = %e, "Directory update rejected"),
            }
        }
    }
}

/// Reads until a full request is buffered, the peer closes, or the timeout
/// runs out.
fn read_request(stream: &mut TcpStream, timeout: Duration) -> io::Result<Parse> {
    let deadline = Instant::now() + timeout;
    let mut raw = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        let n = match stream.read(&mut chunk) {
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(Parse::Incomplete)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        raw.extend_from_slice(&chunk[..n]);
        raw.truncate(MAX_REQUEST_LEN);

        let parsed = http::parse_request(&raw);
        if parsed != Parse::Incomplete || n == 0 || Instant::now() >= deadline {
            return Ok(parsed);
        }
    }
}

impl Workload for ControlServer {
    fn run(&mut self, _control: &RunControl) {
        self.poll_once();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taktvakt_config::DirectorySeed;
    use tracing_test::traced_test;

    fn server() -> ControlServer {
        let config = ControlConfig {
            enabled: true,
            bind: "127.0.0.1:0".into(),
            read_timeout_ms: 500,
        };
        let directory = Directory::seeded(
            4,
            &[DirectorySeed {
                key: "Parth".into(),
                value: "Dancing".into(),
            }],
        )
        .unwrap();
        ControlServer::bind(&config, Arc::new(directory), MetricsRecorder::new().unwrap())
            .unwrap()
    }

    fn exchange(server: &mut ControlServer, request: &str) -> String {
        let mut client = TcpStream::connect(server.local_addr().unwrap()).unwrap();
        client.write_all(request.as_bytes()).unwrap();

        let start = Instant::now();
        while !server.poll_once() {
            assert!(start.elapsed() < Duration::from_secs(5), "no connection accepted");
            std::thread::sleep(Duration::from_millis(1));
        }
        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn nothing_pending_returns_immediately() {
        let mut server = server();
        assert!(!server.poll_once());
    }

    #[test]
    fn get_renders_directory() {
        let mut server = server();
        let response = exchange(&mut server, "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n");
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("value=\"Parth\""));
        assert!(response.contains("name=\"interest3\""));
    }

    #[traced_test]
    #[test]
    fn post_updates_slot_and_redirects() {
        let mut server = server();
        let body = "name1=Alice&interest1=Chess";
        let request = format!(
            "POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        let response = exchange(&mut server, &request);

        assert!(response.starts_with("HTTP/1.1 303 See Other"));
        assert!(response.contains("Location: /"));
        assert_eq!(server.directory.lookup("Alice").as_deref(), Some("Chess"));
        assert_eq!(server.directory.lookup("Parth").as_deref(), Some("Dancing"));
        assert!(logs_contain("Security event occurred"));
    }

    #[test]
    fn metrics_endpoint() {
        let mut server = server();
        server.metrics.packets_received.inc_by(3);
        let response = exchange(&mut server, "GET /metrics HTTP/1.1\r\n\r\n");
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("taktvakt_packets_received_total 3"));
    }

    #[test]
    fn other_methods_rejected() {
        let mut server = server();
        let response = exchange(&mut server, "DELETE / HTTP/1.1\r\n\r\n");
        assert!(response.starts_with("HTTP/1.1 400 Bad Request"));
    }

    #[test]
    fn bind_failure_reported() {
        let taken = server();
        let config = ControlConfig {
            enabled: true,
            bind: taken.local_addr().unwrap().to_string(),
            read_timeout_ms: 50,
        };
        assert!(matches!(
            ControlServer::bind(&config, Arc::new(Directory::new(1)), MetricsRecorder::new().unwrap()),
            Err(EngineError::Bind { .. })
        ));
    }
}
