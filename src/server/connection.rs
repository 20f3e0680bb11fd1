//! Per-client connection state
//!
//! A `ConnectionHandle` is shared between the session task that owns the
//! socket, the connection manager's heartbeat and every transaction the
//! client submits. Writes go through an unbounded channel drained by the
//! session's writer, so sending never blocks and never fails loudly.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use super::protocol::ServerMessage;

/// Frame queued for the session writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    /// Close the socket without a reply
    Terminate,
}

#[derive(Debug)]
pub struct ConnectionHandle {
    id: u64,
    remote: SocketAddr,
    outbound: mpsc::UnboundedSender<Outbound>,
    alive: AtomicBool,
    open: AtomicBool,
}

impl ConnectionHandle {
    /// Create a live, open connection and the receiver its writer drains
    pub fn new(id: u64, remote: SocketAddr) -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let handle = Arc::new(Self {
            id,
            remote,
            outbound,
            alive: AtomicBool::new(true),
            open: AtomicBool::new(true),
        });
        (handle, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.outbound.is_closed()
    }

    /// Queue a text frame; returns false if the connection is gone
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        if !self.is_open() {
            return false;
        }
        self.outbound.send(Outbound::Text(text.into())).is_ok()
    }

    /// Serialize and queue a message; a closed connection makes this a no-op
    pub fn send(&self, message: &ServerMessage) -> bool {
        match message.to_json() {
            Ok(json) => self.send_text(json),
            Err(e) => {
                error!("({}) Failed to serialize message: {}", self.remote, e);
                false
            }
        }
    }

    /// Forcibly close the connection
    pub fn terminate(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            debug!("({}) Terminating connection", self.remote);
            let _ = self.outbound.send(Outbound::Terminate);
        }
    }

    /// Record that the session ended on its own
    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Liveness reply received
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Clear the alive flag, returning whether it was set
    pub fn take_alive(&self) -> bool {
        self.alive.swap(false, Ordering::SeqCst)
    }
}
