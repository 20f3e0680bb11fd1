//! Source Finder Library
//!
//! A reverse image product search gateway. Clients submit a product photo
//! over a duplex session; the gateway searches it on 1688 or taobao, one
//! request at a time per provider, caches the results by image content and
//! converts prices to the client's currency.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;
pub mod server;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
