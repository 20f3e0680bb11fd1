//! Name-keyed provider registry used for dispatch

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::app::client::HttpHandler;
use crate::app::context::AppContext;
use crate::errors::ProviderResult;

use super::config::ProvidersConfig;
use super::core::Provider;
use super::html::HtmlSearchBackend;

#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one HTML-backed provider per enabled site
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if a site has no usable profile or a profile
    /// selector does not parse.
    pub fn from_config(
        config: &ProvidersConfig,
        context: Arc<AppContext>,
        http: Arc<HttpHandler>,
    ) -> ProviderResult<Self> {
        let mut registry = Self::new();
        for profile in config.profiles()? {
            let name = profile.name.clone();
            let backend = HtmlSearchBackend::new(profile, Arc::clone(&http))?;
            registry.register(Provider::new(
                name,
                Box::new(backend),
                Arc::clone(&context),
                config.retry_delay,
            ));
        }
        Ok(registry)
    }

    /// Add a provider, replacing any with the same name
    pub fn register(&mut self, provider: Provider) -> Arc<Provider> {
        let provider = Arc::new(provider);
        self.providers
            .insert(provider.name().to_string(), Arc::clone(&provider));
        provider
    }

    pub fn get(&self, name: &str) -> Option<Arc<Provider>> {
        self.providers.get(name).cloned()
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Start every provider's bootstrap in its own task
    pub fn spawn_bootstrap(&self) -> Vec<JoinHandle<()>> {
        self.providers
            .values()
            .map(|provider| {
                let provider = Arc::clone(provider);
                info!("[{}] Scheduling bootstrap", provider.name());
                tokio::spawn(async move { provider.bootstrap().await })
            })
            .collect()
    }
}
