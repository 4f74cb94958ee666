//! Outbound directory replies.
//!
//! Best effort: a failed send is reported to the caller, who logs and counts
//! it. Nothing is retried.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::DetectionError;

pub trait ReplySink: Send {
    fn send_reply(&mut self, to: SocketAddr, payload: &[u8]) -> io::Result<()>;
}

/// Replies over a non-blocking UDP socket.
pub struct UdpReplySink {
    socket: UdpSocket,
}

impl UdpReplySink {
    pub fn bind(addr: &str) -> Result<Self, DetectionError> {
        let bind_err = |source| DetectionError::Bind {
            addr: addr.to_owned(),
            source,
        };
        let socket = UdpSocket::bind(addr).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl ReplySink for UdpReplySink {
    fn send_reply(&mut self, to: SocketAddr, payload: &[u8]) -> io::Result<()> {
        let sent = self.socket.send_to(payload, to)?;
        if sent != payload.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send: {sent} of {} bytes", payload.len()),
            ));
        }
        Ok(())
    }
}

/// Collects replies in memory; clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemoryReplySink {
    sent: Arc<Mutex<Vec<(SocketAddr, Vec<u8>)>>>,
}

impl MemoryReplySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        self.sent.lock().clone()
    }
}

impl ReplySink for MemoryReplySink {
    fn send_reply(&mut self, to: SocketAddr, payload: &[u8]) -> io::Result<()> {
        self.sent.lock().push((to, payload.to_vec()));
        Ok(())
    }
}

/// `key=value` reply body.
pub fn format_reply(key: &str, value: &str) -> String {
    format!("{key}={value}")
}
