//! Connection manager
//!
//! Tracks every open duplex session, throttles inbound traffic per remote
//! address, turns search requests into transactions on the named provider
//! and runs the heartbeat that terminates clients which stop answering the
//! liveness probe.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::app::provider::ProviderRegistry;
use crate::app::transaction::Transaction;
use crate::constants::{heartbeat, limits};

use super::connection::{ConnectionHandle, Outbound};
use super::protocol::{parse_client_message, truncate_for_log, ClientMessage, SearchRequest, ServerMessage};
use super::rate_limit::IdentityLimiter;

/// What happened to one inbound text frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageDisposition {
    /// Over the message quota; the connection was terminated
    Throttled,
    /// Liveness reply recorded
    Pong,
    /// Not JSON; logged and dropped
    Malformed,
    /// Valid JSON without an actionable search, or an unknown provider
    Ignored,
    /// Search handed to a provider
    Dispatched { transaction_id: u64 },
}

/// Counts from one heartbeat sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub probed: usize,
    pub terminated: usize,
}

#[derive(Debug)]
pub struct ConnectionManager {
    connections: Mutex<HashMap<u64, Arc<ConnectionHandle>>>,
    next_id: AtomicU64,
    providers: ProviderRegistry,
    upgrade_limiter: IdentityLimiter,
    message_limiter: IdentityLimiter,
    heartbeat_interval: Duration,
}

impl ConnectionManager {
    pub fn new(
        providers: ProviderRegistry,
        upgrade_limiter: IdentityLimiter,
        message_limiter: IdentityLimiter,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            providers,
            upgrade_limiter,
            message_limiter,
            heartbeat_interval,
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Consume one upgrade point for `ip`
    pub fn allow_upgrade(&self, ip: IpAddr) -> bool {
        self.upgrade_limiter.check(ip)
    }

    /// Track a newly established session
    ///
    /// The connection starts alive. The returned receiver carries every
    /// frame queued for the client and must be drained by the session
    /// writer.
    pub fn register(&self, remote: SocketAddr) -> (Arc<ConnectionHandle>, mpsc::UnboundedReceiver<Outbound>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (conn, outbound) = ConnectionHandle::new(id, remote);
        self.lock().insert(id, Arc::clone(&conn));
        info!("({}) Connected", remote);
        (conn, outbound)
    }

    /// Forget a session after its socket closed
    pub fn unregister(&self, conn: &ConnectionHandle) {
        conn.mark_closed();
        if self.lock().remove(&conn.id()).is_some() {
            info!("({}) Disconnected", conn.remote());
        }
    }

    pub fn connection_count(&self) -> usize {
        self.lock().len()
    }

    pub fn get(&self, id: u64) -> Option<Arc<ConnectionHandle>> {
        self.lock().get(&id).cloned()
    }

    /// Handle one inbound text frame from `conn`
    ///
    /// Every frame first consumes a point from the sender's message quota;
    /// exceeding it terminates the connection without a reply. Searches for
    /// a known provider are enqueued on a background task, after the client
    /// is told how many searches wait ahead of it.
    pub fn handle_text(&self, conn: &Arc<ConnectionHandle>, text: &str) -> MessageDisposition {
        let remote = conn.remote();
        if !self.message_limiter.check(remote.ip()) {
            error!("({}) Message rate limit exceeded, terminating", remote);
            conn.terminate();
            return MessageDisposition::Throttled;
        }

        match parse_client_message(text) {
            Ok(ClientMessage::Pong) => {
                debug!("({}) pong", remote);
                conn.mark_alive();
                MessageDisposition::Pong
            }
            Ok(ClientMessage::Search(request)) => {
                info!("({}) Received query: search", remote);
                self.dispatch(conn, request)
            }
            Ok(ClientMessage::Ignored { query }) => {
                info!(
                    "({}) Received query: {}",
                    remote,
                    query.as_deref().unwrap_or("<none>")
                );
                MessageDisposition::Ignored
            }
            Err(_) => {
                info!(
                    "({}) Unknown message received: {}",
                    remote,
                    truncate_for_log(text, limits::LOG_TRUNCATE_CHARS)
                );
                MessageDisposition::Malformed
            }
        }
    }

    fn dispatch(&self, conn: &Arc<ConnectionHandle>, request: SearchRequest) -> MessageDisposition {
        let Some(provider) = self.providers.get(&request.source_name) else {
            debug!(
                "({}) Unknown provider '{}', ignoring",
                conn.remote(),
                request.source_name
            );
            return MessageDisposition::Ignored;
        };

        let transaction = Arc::new(Transaction::new(Arc::clone(conn)));
        transaction.set_image_url(request.image_url);
        transaction.set_provider(provider.name());
        let transaction_id = transaction.id();

        transaction.send(&ServerMessage::queue_position(provider.queue().len()));

        tokio::spawn(async move {
            if let Err(e) = provider.enqueue(Arc::clone(&transaction)).await {
                error!(
                    provider = %provider.name(),
                    transaction = transaction.id(),
                    "Failed to enqueue search: {}",
                    e
                );
                transaction.send(&ServerMessage::failure());
            }
        });

        MessageDisposition::Dispatched { transaction_id }
    }

    /// Probe every open connection once
    ///
    /// A connection that has not answered since the previous sweep is
    /// terminated; every other one has its alive flag cleared and receives
    /// the probe. Idle limiter state is pruned afterwards.
    pub fn sweep(&self) -> SweepReport {
        let connections: Vec<Arc<ConnectionHandle>> = self.lock().values().cloned().collect();
        let mut report = SweepReport::default();

        for conn in connections.iter().filter(|conn| conn.is_open()) {
            if conn.take_alive() {
                debug!("Sending ping to {}", conn.remote());
                conn.send_text(heartbeat::PROBE);
                report.probed += 1;
            } else {
                info!("Terminating {} (Cause: did not answer ping)", conn.remote());
                conn.terminate();
                report.terminated += 1;
            }
        }

        self.upgrade_limiter.prune();
        self.message_limiter.prune();
        report
    }

    /// Run [`sweep`](Self::sweep) on the heartbeat interval until shutdown
    pub fn spawn_heartbeat(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.heartbeat_interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.sweep();
                        debug!(
                            "Heartbeat: {} probed, {} terminated",
                            report.probed, report.terminated
                        );
                    }
                    _ = shutdown.recv() => {
                        info!("Heartbeat stopped");
                        return;
                    }
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Arc<ConnectionHandle>>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
