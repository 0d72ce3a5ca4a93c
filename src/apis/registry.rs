use crate::apis::profiles::SiteProfile;
use crate::common::constants::{MOBILESENTRIX_REGEX_SITE, MOBILESENTRIX_SITE};
use crate::common::error::{Result, ScraperError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Factory function for the built-in site profiles
pub fn create_profile(site_name: &str) -> Option<SiteProfile> {
    match site_name {
        MOBILESENTRIX_SITE => Some(SiteProfile::mobilesentrix()),
        MOBILESENTRIX_REGEX_SITE => Some(SiteProfile::mobilesentrix_regex()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct SitesFile {
    #[serde(default)]
    site: Vec<SiteProfile>,
}

/// Known site profiles: the built-ins plus any loaded from a TOML file
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, SiteProfile>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileRegistry {
    pub fn builtin() -> Self {
        let profiles = crate::common::constants::get_supported_sites()
            .into_iter()
            .filter_map(create_profile)
            .map(|p| (p.name.clone(), p))
            .collect();
        Self { profiles }
    }

    /// Built-ins overlaid with the `[[site]]` entries of a TOML file
    pub fn load(sites_config: Option<&Path>) -> Result<Self> {
        let mut registry = Self::builtin();
        if let Some(path) = sites_config {
            let content = fs::read_to_string(path).map_err(|e| {
                ScraperError::Config(format!("Failed to read sites file '{}': {e}", path.display()))
            })?;
            let added = registry.merge_toml(&content)?;
            info!("Loaded {} site profile(s) from {}", added, path.display());
        }
        Ok(registry)
    }

    /// Add or replace profiles from TOML text, returning how many were read
    pub fn merge_toml(&mut self, content: &str) -> Result<usize> {
        let file: SitesFile = toml::from_str(content)?;
        let count = file.site.len();
        for profile in file.site {
            if profile.name.trim().is_empty() || profile.base_url.trim().is_empty() {
                return Err(ScraperError::Config(
                    "site profiles need a name and a base_url".to_string(),
                ));
            }
            self.profiles.insert(profile.name.clone(), profile);
        }
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<&SiteProfile> {
        self.profiles.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &SiteProfile> {
        self.profiles.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::ExtractionStrategy;

    #[test]
    fn test_builtin_profiles() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.names(), vec!["mobilesentrix", "mobilesentrix_regex"]);
        assert_eq!(
            registry.get("mobilesentrix_regex").unwrap().strategy,
            ExtractionStrategy::Regex
        );
        assert!(create_profile("unknown").is_none());
    }

    #[test]
    fn test_toml_profiles_take_defaults() {
        let mut registry = ProfileRegistry::builtin();
        let added = registry
            .merge_toml(
                r#"
                [[site]]
                name = "partsdepot"
                base_url = "https://parts.example/"
                product_card_selectors = ["div.tile"]
                max_pages_per_category = 5
                "#,
            )
            .unwrap();
        assert_eq!(added, 1);

        let site = registry.get("partsdepot").unwrap();
        assert_eq!(site.product_card_selectors, vec!["div.tile".to_string()]);
        assert_eq!(site.max_pages_per_category, 5);
        assert_eq!(site.strategy, ExtractionStrategy::Css);
        assert!(!site.price_selectors.is_empty());
    }

    #[test]
    fn test_toml_profile_needs_base_url() {
        let mut registry = ProfileRegistry::builtin();
        let err = registry.merge_toml("[[site]]\nname = \"broken\"\n").unwrap_err();
        assert!(matches!(err, ScraperError::Config(_)));
    }
}
