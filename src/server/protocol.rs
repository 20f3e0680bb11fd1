//! JSON messages exchanged over the duplex session
//!
//! Outbound frames are `{"query": "...", "data": ...}` objects. Inbound
//! frames are either the literal liveness reply or such an object; only the
//! `search` query is acted upon.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::models::Product;
use crate::constants::{heartbeat, status};

/// Message sent to a client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "query", content = "data", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Human-readable progress or failure text
    Status(String),
    /// Products matched for the client's image
    Search(Vec<Product>),
}

impl ServerMessage {
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status(text.into())
    }

    pub fn search(products: Vec<Product>) -> Self {
        Self::Search(products)
    }

    /// Report how many searches wait ahead of the client
    pub fn queue_position(position: usize) -> Self {
        Self::Status(format!("Queuing request: Your position is {}...", position))
    }

    pub fn failure() -> Self {
        Self::Status(status::FAILURE.to_string())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A validated search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub image_url: String,
    pub source_name: String,
}

/// What an inbound text frame turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Reply to the liveness probe
    Pong,
    Search(SearchRequest),
    /// Well-formed JSON that carries nothing actionable
    Ignored { query: Option<String> },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    query: Option<Value>,
    #[serde(default)]
    data: Value,
}

/// Classify an inbound text frame
///
/// # Errors
///
/// Returns the JSON error if the frame is neither the liveness reply nor a
/// JSON object.
pub fn parse_client_message(text: &str) -> serde_json::Result<ClientMessage> {
    if text == heartbeat::REPLY {
        return Ok(ClientMessage::Pong);
    }

    let envelope: Envelope = serde_json::from_str(text)?;
    let query = envelope.query.and_then(|q| q.as_str().map(str::to_string));

    if query.as_deref() == Some("search") {
        let image_url = envelope.data.get("imageURL").and_then(Value::as_str);
        let source_name = envelope.data.get("sourceName").and_then(Value::as_str);
        if let (Some(image_url), Some(source_name)) = (image_url, source_name) {
            return Ok(ClientMessage::Search(SearchRequest {
                image_url: image_url.to_string(),
                source_name: source_name.to_string(),
            }));
        }
    }

    Ok(ClientMessage::Ignored { query })
}

/// Shorten a payload for a log line
///
/// Payloads of `limit` or more characters become the first `limit`
/// characters followed by the original size.
pub fn truncate_for_log(payload: &str, limit: usize) -> String {
    let size = payload.chars().count();
    if size >= limit {
        let head: String = payload.chars().take(limit).collect();
        format!("{} (truncated: original size: {})", head, size)
    } else {
        payload.to_string()
    }
}
