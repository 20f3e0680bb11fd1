//! Per-request context tying a client connection to one search
//!
//! A transaction is created for every accepted search request, handed to
//! the chosen provider and dropped once its result has been delivered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::app::hash::ContentHash;
use crate::server::connection::ConnectionHandle;
use crate::server::protocol::ServerMessage;

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Mutable fields filled in as the request moves through the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionData {
    pub image_url: Option<String>,
    pub content_hash: Option<ContentHash>,
    pub provider: Option<String>,
}

#[derive(Debug)]
pub struct Transaction {
    id: u64,
    connection: Arc<ConnectionHandle>,
    data: RwLock<TransactionData>,
}

impl Transaction {
    pub fn new(connection: Arc<ConnectionHandle>) -> Self {
        Self {
            id: NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
            connection,
            data: RwLock::new(TransactionData::default()),
        }
    }

    /// Process-unique id used in log lines
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn connection(&self) -> &Arc<ConnectionHandle> {
        &self.connection
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_open()
    }

    /// Write one message to the client
    ///
    /// Never fails: if the connection is already closed the message is
    /// dropped and the caller carries on.
    pub fn send(&self, message: &ServerMessage) {
        if !self.connection.send(message) {
            debug!(
                transaction = self.id,
                remote = %self.connection.remote(),
                "Connection closed, message dropped"
            );
        }
    }

    pub fn data(&self) -> TransactionData {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn image_url(&self) -> Option<String> {
        self.data().image_url
    }

    pub fn content_hash(&self) -> Option<ContentHash> {
        self.data().content_hash
    }

    pub fn provider(&self) -> Option<String> {
        self.data().provider
    }

    pub fn set_image_url(&self, url: impl Into<String>) {
        self.write().image_url = Some(url.into());
    }

    pub fn set_content_hash(&self, hash: ContentHash) {
        self.write().content_hash = Some(hash);
    }

    pub fn set_provider(&self, name: impl Into<String>) {
        self.write().provider = Some(name.into());
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, TransactionData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}
