//! Site configuration for the locsite page converter.
//!
//! Parses the site's `settings.toml` with serde:
//!
//! ```toml
//! [general]
//! siteurl = "https://example.com"
//! defaultlocale = "en"
//!
//! [locale_overrides]
//! "legal/terms" = "legal/shared"
//! ```
//!
//! The `[locale_overrides]` table redirects a page to another page's locale
//! file, so several pages can share one set of translations.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Locale used when `general.defaultlocale` is absent.
const DEFAULT_LOCALE: &str = "en";

/// Error returned when configuration cannot be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML source is malformed or has unexpected types.
    #[error("invalid site configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Site configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SiteConfig {
    /// General site settings.
    pub general: GeneralConfig,
    /// Page id -> locale file redirects.
    pub locale_overrides: BTreeMap<String, String>,
}

/// The `[general]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Public site URL, if configured.
    pub siteurl: Option<String>,
    /// Locale whose page content is the translation source of truth.
    pub defaultlocale: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            siteurl: None,
            defaultlocale: DEFAULT_LOCALE.to_owned(),
        }
    }
}

impl SiteConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// The default locale for the site.
    #[must_use]
    pub fn default_locale(&self) -> &str {
        &self.general.defaultlocale
    }

    /// The configured site URL, if any.
    #[must_use]
    pub fn site_url(&self) -> Option<&str> {
        self.general.siteurl.as_deref()
    }

    /// Locale file used for a page, honoring `[locale_overrides]`.
    #[must_use]
    pub fn locale_file_for<'a>(&'a self, page: &'a str) -> &'a str {
        self.locale_overrides
            .get(page)
            .map_or(page, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = SiteConfig::from_toml_str("").unwrap();

        assert_eq!(config.default_locale(), "en");
        assert_eq!(config.site_url(), None);
        assert!(config.locale_overrides.is_empty());
    }

    #[test]
    fn test_general_section() {
        let config = SiteConfig::from_toml_str(
            "[general]\nsiteurl = \"https://example.com\"\ndefaultlocale = \"de\"\n",
        )
        .unwrap();

        assert_eq!(config.site_url(), Some("https://example.com"));
        assert_eq!(config.default_locale(), "de");
    }

    #[test]
    fn test_locale_override() {
        let config = SiteConfig::from_toml_str(
            "[locale_overrides]\n\"legal/terms\" = \"legal/shared\"\n",
        )
        .unwrap();

        assert_eq!(config.locale_file_for("legal/terms"), "legal/shared");
        assert_eq!(config.locale_file_for("index"), "index");
    }

    #[test]
    fn test_invalid_toml() {
        let result = SiteConfig::from_toml_str("[general\nsiteurl = 1");

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
