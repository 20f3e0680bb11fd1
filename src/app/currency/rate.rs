//! Exchange rate snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversion factor between two currencies
///
/// Serialized as `{"from","to","rate","lastUpdated"}`; `rate` and
/// `lastUpdated` are null until the first successful refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
    pub from: String,
    pub to: String,
    pub rate: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Rate {
    /// A pair with no factor established yet
    pub fn unset(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            rate: None,
            last_updated: None,
        }
    }
}
