//! Search providers
//!
//! A provider is one scraping target: an exclusively owned
//! [`ProviderBackend`] behind a single-flight [`TaskQueue`](crate::app::queue::TaskQueue)
//! and the shared result cache. Providers are created once at startup, kept
//! in a [`ProviderRegistry`] and looked up by name for every search.
//!
//! - [`backend`] - The scraping seam
//! - [`core`] - Bootstrap, cache-checked enqueue and task execution
//! - [`html`] - Backend driving an image search site over HTTP
//! - [`profile`] - Site profiles for the built-in providers
//! - [`extract`] - Result page parsing
//! - [`registry`] - Name-keyed dispatch map

pub mod backend;
pub mod config;
pub mod core;
pub mod extract;
pub mod html;
pub mod profile;
pub mod registry;

#[cfg(test)]
mod tests;

pub use backend::ProviderBackend;
pub use config::ProvidersConfig;
pub use core::{Provider, ProviderState, TaskOutcome};
pub use html::HtmlSearchBackend;
pub use profile::{SiteOverride, SiteProfile};
pub use registry::ProviderRegistry;
