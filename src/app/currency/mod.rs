//! Exchange rate used to convert provider prices for clients
//!
//! - [`rate`] - The published rate tuple
//! - [`source`] - Where factors come from
//! - [`service`] - Shared, periodically refreshed rate

pub mod config;
pub mod rate;
pub mod service;
pub mod source;

pub use config::{CurrencyConfig, RateSourceKind};
pub use rate::Rate;
pub use service::{parse_price, CurrencyRateService};
pub use source::{FixedRateSource, GoogleRateSource, RateSource};
