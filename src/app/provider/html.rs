//! HTML search backend
//!
//! Drives an image search site over plain HTTP: the landing page is loaded
//! once to establish session cookies and find the upload form, then every
//! search uploads the client's image and reads the result cards.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};
use url::Url;

use crate::app::client::HttpHandler;
use crate::app::context::AppContext;
use crate::app::models::Product;
use crate::app::transaction::Transaction;
use crate::constants::status;
use crate::errors::{FetchError, ProviderError, ProviderResult};
use crate::server::protocol::ServerMessage;

use super::backend::ProviderBackend;
use super::extract::{compile, find_upload_target, parse_products, UploadTarget};
use super::profile::SiteProfile;

/// File name presented with uploaded images
const UPLOAD_FILE_NAME: &str = "image.jpg";

#[derive(Debug)]
pub struct HtmlSearchBackend {
    profile: SiteProfile,
    http: Arc<HttpHandler>,
    /// Set once the landing page has been loaded
    upload: Option<UploadTarget>,
}

impl HtmlSearchBackend {
    /// Create a backend for `profile`
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::InvalidSelector` if any profile selector does
    /// not parse.
    pub fn new(profile: SiteProfile, http: Arc<HttpHandler>) -> ProviderResult<Self> {
        compile(&profile.ready_selector)?;
        compile(&profile.card_selector)?;
        compile(&profile.title_selector)?;
        compile(&profile.image_selector)?;
        if let Some(selector) = &profile.link_selector {
            compile(selector)?;
        }
        if let Some(selector) = &profile.price_selector {
            compile(selector)?;
        }

        Ok(Self {
            profile,
            http,
            upload: None,
        })
    }

    fn parse_url(url: &str) -> ProviderResult<Url> {
        Url::parse(url).map_err(|e| {
            FetchError::InvalidUrl {
                url: url.to_string(),
                error: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl ProviderBackend for HtmlSearchBackend {
    async fn load_resource(&mut self) -> ProviderResult<()> {
        let landing = Self::parse_url(&self.profile.landing_url)?;
        debug!("[{}] Opening {}", self.profile.name, landing);

        let page = self.http.get_page(&landing).await?;
        let target = find_upload_target(&page, &self.profile, &landing)?;

        info!(
            "[{}] Session ready, uploads go to {} ({})",
            self.profile.name, target.url, target.field
        );
        self.upload = Some(target);
        Ok(())
    }

    async fn fetch_results(
        &mut self,
        transaction: &Transaction,
        context: &AppContext,
    ) -> ProviderResult<Vec<Product>> {
        let name = &self.profile.name;
        let target = self.upload.clone().ok_or_else(|| ProviderError::ElementNotFound {
            selector: self.profile.ready_selector.clone(),
        })?;
        let image_url = transaction
            .image_url()
            .ok_or(ProviderError::MissingImage {
                transaction_id: transaction.id(),
            })?;

        transaction.send(&ServerMessage::status(status::DOWNLOADING));
        info!("[{}] Downloading image {}...", name, image_url);
        let image = context.images.fetch(&image_url).await?;

        info!("[{}] Uploading image to {} search engine...", name, name);
        transaction.send(&ServerMessage::status(format!(
            "Uploading image to {} search engine...",
            name
        )));

        let form = Form::new().part(
            target.field.clone(),
            Part::bytes(image.to_vec()).file_name(UPLOAD_FILE_NAME),
        );

        self.http.acquire().await;
        let response = self
            .http
            .client()
            .post(target.url.as_str())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::UnexpectedStatus {
                status: response.status().as_u16(),
                url: target.url.to_string(),
            });
        }

        let results_url = response.url().clone();
        let body = response.text().await?;
        let products = parse_products(&body, &self.profile, &results_url)?;
        debug!("[{}] Parsed {} result cards", name, products.len());
        Ok(products)
    }
}
