//! Site profiles driving the HTML search backend
//!
//! A profile names the pages a provider session visits and the CSS
//! selectors used to read result cards. The built-in profiles can be
//! overridden field by field from configuration.

use serde::{Deserialize, Serialize};

use crate::constants::providers;

/// Everything the HTML backend needs to know about one target site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub name: String,
    /// Page opened when the session is loaded
    pub landing_url: String,
    /// Element that must be present before the session counts as ready
    pub ready_selector: String,
    /// Image upload endpoint; discovered from the landing page when unset
    pub upload_url: Option<String>,
    /// Multipart field carrying the image; the file input's name when unset
    pub upload_field: Option<String>,
    /// One element per result card
    pub card_selector: String,
    pub title_selector: String,
    /// Read the title from this attribute instead of the element text
    pub title_attr: Option<String>,
    pub image_selector: String,
    /// Read the thumbnail from this attribute instead of the inline
    /// `background-image` style
    pub image_attr: Option<String>,
    /// Link inside the card; the card's own `href` when unset
    pub link_selector: Option<String>,
    pub price_selector: Option<String>,
}

impl SiteProfile {
    /// Profile for the 1688 image search
    pub fn alibaba_1688() -> Self {
        Self {
            name: providers::ALIBABA_1688.to_string(),
            landing_url: "https://s.1688.com/youyuan/index.htm".to_string(),
            ready_selector: r#".space-image-upload input[type="file"]"#.to_string(),
            upload_url: None,
            upload_field: None,
            card_selector: "#sm-offer-list .space-offer-card-box".to_string(),
            title_selector: ".title".to_string(),
            title_attr: None,
            image_selector: ".img".to_string(),
            image_attr: None,
            link_selector: Some(".mojar-element-image a".to_string()),
            price_selector: Some(".price".to_string()),
        }
    }

    /// Profile for taobao listings found through a web image search
    pub fn taobao() -> Self {
        Self {
            name: providers::TAOBAO.to_string(),
            landing_url: "https://www.google.com/search?q=site:taobao.com&tbm=isch".to_string(),
            ready_selector: "form".to_string(),
            upload_url: Some("https://www.google.com/searchbyimage/upload".to_string()),
            upload_field: Some("encoded_image".to_string()),
            card_selector: r#"a[href*="taobao.com"]"#.to_string(),
            title_selector: "img".to_string(),
            title_attr: Some("alt".to_string()),
            image_selector: "img".to_string(),
            image_attr: Some("src".to_string()),
            link_selector: None,
            price_selector: None,
        }
    }

    /// Built-in profile for `name`, if any
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            providers::ALIBABA_1688 => Some(Self::alibaba_1688()),
            providers::TAOBAO => Some(Self::taobao()),
            _ => None,
        }
    }
}

/// Field-by-field replacement for a site profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteOverride {
    pub landing_url: Option<String>,
    pub ready_selector: Option<String>,
    pub upload_url: Option<String>,
    pub upload_field: Option<String>,
    pub card_selector: Option<String>,
    pub title_selector: Option<String>,
    pub title_attr: Option<String>,
    pub image_selector: Option<String>,
    pub image_attr: Option<String>,
    pub link_selector: Option<String>,
    pub price_selector: Option<String>,
}

impl SiteOverride {
    /// Apply the set fields on top of `profile`
    pub fn apply(&self, mut profile: SiteProfile) -> SiteProfile {
        fn set(target: &mut String, value: &Option<String>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
        fn set_opt(target: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                *target = value.clone();
            }
        }

        set(&mut profile.landing_url, &self.landing_url);
        set(&mut profile.ready_selector, &self.ready_selector);
        set_opt(&mut profile.upload_url, &self.upload_url);
        set_opt(&mut profile.upload_field, &self.upload_field);
        set(&mut profile.card_selector, &self.card_selector);
        set(&mut profile.title_selector, &self.title_selector);
        set_opt(&mut profile.title_attr, &self.title_attr);
        set(&mut profile.image_selector, &self.image_selector);
        set_opt(&mut profile.image_attr, &self.image_attr);
        set_opt(&mut profile.link_selector, &self.link_selector);
        set_opt(&mut profile.price_selector, &self.price_selector);
        profile
    }

    /// Build a profile for a site with no built-in, if every required
    /// field is set
    pub fn into_profile(&self, name: &str) -> Option<SiteProfile> {
        Some(SiteProfile {
            name: name.to_string(),
            landing_url: self.landing_url.clone()?,
            ready_selector: self.ready_selector.clone()?,
            upload_url: self.upload_url.clone(),
            upload_field: self.upload_field.clone(),
            card_selector: self.card_selector.clone()?,
            title_selector: self.title_selector.clone()?,
            title_attr: self.title_attr.clone(),
            image_selector: self.image_selector.clone()?,
            image_attr: self.image_attr.clone(),
            link_selector: self.link_selector.clone(),
            price_selector: self.price_selector.clone(),
        })
    }
}
