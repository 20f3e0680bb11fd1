//! Client-facing gateway
//!
//! Clients connect over a duplex session, submit searches and receive
//! progress statuses and results as JSON frames. A plain HTTP endpoint
//! exposes the current exchange rate.
//!
//! # Module Organization
//!
//! - [`protocol`] - Wire messages
//! - [`connection`] - Per-client handle shared with transactions
//! - [`rate_limit`] - Per-address throttling
//! - [`manager`] - Dispatch and heartbeat
//! - [`session`] - Socket read/write loop
//! - [`routes`] - Axum router
//! - [`listener`] - Accept loop with connection resets
//! - [`signals`] - Shutdown on Ctrl+C and SIGTERM

pub mod connection;
pub mod listener;
pub mod manager;
pub mod protocol;
pub mod rate_limit;
pub mod routes;
pub mod session;
pub mod signals;

pub use connection::{ConnectionHandle, Outbound};
pub use manager::{ConnectionManager, MessageDisposition, SweepReport};
pub use protocol::{ClientMessage, SearchRequest, ServerMessage};
pub use rate_limit::IdentityLimiter;
pub use routes::{router, GatewayState};
pub use signals::{create_shutdown_channel, SignalHandler};
