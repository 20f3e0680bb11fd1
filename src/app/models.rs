//! Product data returned to clients and stored in the result cache

use serde::{Deserialize, Serialize};

/// Prices of a product in the provider's currency and the client's
///
/// The field names are part of the wire protocol: `chinese` holds the price
/// scraped from the provider, `brazilian` the converted price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductCurrency {
    pub chinese: Option<String>,
    pub brazilian: Option<String>,
}

/// A product matched by a provider search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Listing title
    pub name: String,
    /// Thumbnail image URL
    pub src: String,
    /// Listing URL
    pub url: String,
    pub currency: ProductCurrency,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        src: impl Into<String>,
        url: impl Into<String>,
        chinese_price: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            src: src.into(),
            url: url.into(),
            currency: ProductCurrency {
                chinese: chinese_price,
                brazilian: None,
            },
        }
    }
}
