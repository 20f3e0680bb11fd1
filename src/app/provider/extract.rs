//! Reading result pages
//!
//! Pure functions over HTML text so that parsing can be tested without a
//! network.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::app::models::Product;
use crate::errors::{ProviderError, ProviderResult};

use super::profile::SiteProfile;

/// Where and how the session submits images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub url: Url,
    pub field: String,
}

/// Field name used when neither the profile nor the page names one
pub const DEFAULT_UPLOAD_FIELD: &str = "file";

/// Compile a profile selector
pub fn compile(selector: &str) -> ProviderResult<Selector> {
    Selector::parse(selector).map_err(|_| ProviderError::InvalidSelector {
        selector: selector.to_string(),
    })
}

/// Keep only digits, `.` and `,` of a scraped price
///
/// Every other character is removed, wherever it appears.
pub fn clean_price(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect()
}

/// URL inside an inline `background-image: url(...)` declaration
pub fn background_image_url(style: &str) -> Option<String> {
    let declaration = style
        .split(';')
        .find(|decl| decl.trim_start().starts_with("background"))?;
    let start = declaration.find("url(")? + "url(".len();
    let end = start + declaration[start..].find(')')?;
    let url = declaration[start..end]
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');
    (!url.is_empty()).then(|| url.to_string())
}

/// Check that the landing page is ready and work out the upload target
///
/// # Errors
///
/// Returns `ProviderError::ElementNotFound` if the ready selector matches
/// nothing, or if no upload URL is configured and no enclosing form exists.
pub fn find_upload_target(html: &str, profile: &SiteProfile, base: &Url) -> ProviderResult<UploadTarget> {
    let ready = compile(&profile.ready_selector)?;
    let document = Html::parse_document(html);
    let element = document
        .select(&ready)
        .next()
        .ok_or_else(|| ProviderError::ElementNotFound {
            selector: profile.ready_selector.clone(),
        })?;

    let field = profile
        .upload_field
        .clone()
        .or_else(|| element.value().attr("name").map(str::to_string))
        .unwrap_or_else(|| DEFAULT_UPLOAD_FIELD.to_string());

    if let Some(upload_url) = &profile.upload_url {
        let url = resolve(base, upload_url).ok_or_else(|| ProviderError::ElementNotFound {
            selector: format!("upload url {}", upload_url),
        })?;
        return Ok(UploadTarget { url, field });
    }

    let form = element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "form")
        .ok_or_else(|| ProviderError::ElementNotFound {
            selector: format!("form enclosing {}", profile.ready_selector),
        })?;

    let action = form.value().attr("action").unwrap_or_default();
    let url = if action.is_empty() {
        base.clone()
    } else {
        resolve(base, action).ok_or_else(|| ProviderError::ElementNotFound {
            selector: format!("form action {}", action),
        })?
    };

    Ok(UploadTarget { url, field })
}

/// Read every result card on a results page
///
/// Cards without a title or link are skipped.
pub fn parse_products(html: &str, profile: &SiteProfile, base: &Url) -> ProviderResult<Vec<Product>> {
    let card_sel = compile(&profile.card_selector)?;
    let title_sel = compile(&profile.title_selector)?;
    let image_sel = compile(&profile.image_selector)?;
    let link_sel = profile.link_selector.as_deref().map(compile).transpose()?;
    let price_sel = profile.price_selector.as_deref().map(compile).transpose()?;

    let document = Html::parse_document(html);
    let mut products = Vec::new();

    for (index, card) in document.select(&card_sel).enumerate() {
        let name = card.select(&title_sel).next().and_then(|title| match &profile.title_attr {
            Some(attr) => title.value().attr(attr).map(|v| v.trim().to_string()),
            None => Some(element_text(&title)),
        });

        let href = match &link_sel {
            Some(sel) => card.select(sel).next().and_then(|a| a.value().attr("href")),
            None => card.value().attr("href"),
        };

        let (Some(name), Some(href)) = (name, href) else {
            debug!("[{}] Skipping incomplete card {}", profile.name, index);
            continue;
        };

        let src = card
            .select(&image_sel)
            .next()
            .and_then(|img| match &profile.image_attr {
                Some(attr) => img.value().attr(attr).map(str::to_string),
                None => img.value().attr("style").and_then(background_image_url),
            })
            .unwrap_or_default();

        let price = price_sel
            .as_ref()
            .and_then(|sel| card.select(sel).next())
            .map(|el| clean_price(&element_text(&el)));

        let url = resolve(base, href)
            .map(String::from)
            .unwrap_or_else(|| href.to_string());

        products.push(Product::new(name, src, url, price));
    }

    Ok(products)
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn resolve(base: &Url, href: &str) -> Option<Url> {
    base.join(href).ok()
}
