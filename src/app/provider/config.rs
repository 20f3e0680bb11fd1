//! Provider configuration

use std::collections::BTreeMap;
use std::time::Duration;

use crate::constants::providers;
use crate::errors::{ProviderError, ProviderResult};

use super::profile::{SiteOverride, SiteProfile};

#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    /// Delay between bootstrap attempts
    pub retry_delay: Duration,
    /// Providers started by `serve`, by name
    pub enabled: Vec<String>,
    /// Per-site profile overrides keyed by provider name
    pub sites: BTreeMap<String, SiteOverride>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            retry_delay: providers::BOOTSTRAP_RETRY_DELAY,
            enabled: vec![
                providers::ALIBABA_1688.to_string(),
                providers::TAOBAO.to_string(),
            ],
            sites: BTreeMap::new(),
        }
    }
}

impl ProvidersConfig {
    /// Resolve the site profile of every enabled provider
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::UnknownProfile` for an enabled name that has
    /// neither a built-in profile nor a complete override.
    pub fn profiles(&self) -> ProviderResult<Vec<SiteProfile>> {
        self.enabled
            .iter()
            .map(|name| {
                let site = self.sites.get(name);
                match (SiteProfile::builtin(name), site) {
                    (Some(profile), Some(site)) => Some(site.apply(profile)),
                    (Some(profile), None) => Some(profile),
                    (None, Some(site)) => site.into_profile(name),
                    (None, None) => None,
                }
                .ok_or_else(|| ProviderError::UnknownProfile { name: name.clone() })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profiles() {
        let profiles = ProvidersConfig::default().profiles().unwrap();
        let names: Vec<_> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["1688", "taobao"]);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = ProvidersConfig {
            enabled: vec!["ebay".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            config.profiles(),
            Err(ProviderError::UnknownProfile { name }) if name == "ebay"
        ));
    }
}
