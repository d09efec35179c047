//! Source trait and error type.

use std::collections::HashMap;

use loc_config::{ConfigError, SiteConfig};

/// Mapping from placeholder id to translated text for one (locale, file)
/// pair.
pub type LocaleTable = HashMap<String, String>;

/// Error returned by [`Source`] operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A named resource does not exist in the backend.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Resource category ("page", "locale", "include", "template",
        /// "file").
        kind: &'static str,
        /// The name that was requested.
        name: String,
    },
    /// The site configuration exists but cannot be parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Backend-specific read failure.
    #[error("failed to read {name}: {message}")]
    Backend {
        /// The name that was requested.
        name: String,
        /// Backend diagnostic.
        message: String,
    },
}

impl SourceError {
    /// Create a not-found error for a resource category and name.
    #[must_use]
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

/// Read access to the site's pages, locales, templates and includes.
///
/// The conversion pipeline holds a `dyn Source` and never touches the
/// underlying layout; backends decide how names map to storage.
pub trait Source: Send + Sync {
    /// Read a page's raw content in the given format.
    fn read_page(&self, page: &str, format: &str) -> Result<String, SourceError>;

    /// Whether a page exists in the given format.
    fn has_page(&self, page: &str, format: &str) -> bool;

    /// Read the locale table for one (locale, file) pair.
    fn read_locale(&self, locale: &str, file: &str) -> Result<LocaleTable, SourceError>;

    /// Whether a locale file exists for a locale.
    fn has_locale(&self, locale: &str, file: &str) -> bool;

    /// All locales the site carries translations for.
    fn list_locales(&self) -> Result<Vec<String>, SourceError>;

    /// Read and parse the site configuration.
    fn read_config(&self) -> Result<SiteConfig, SourceError>;

    /// Read a page template by name.
    fn read_template(&self, name: &str) -> Result<String, SourceError>;

    /// Whether an include fragment exists in the given format.
    fn has_include(&self, name: &str, format: &str) -> bool;

    /// Read an include fragment's raw content in the given format.
    fn read_include(&self, name: &str, format: &str) -> Result<String, SourceError>;

    /// List file names under a backend directory.
    fn list_files(&self, dir: &str) -> Result<Vec<String>, SourceError>;

    /// Read an arbitrary backend file (template loader support).
    fn read_file(&self, path: &str) -> Result<String, SourceError>;

    /// Resolve a link target for a locale.
    ///
    /// Returns the locale the link actually points at and, when the target
    /// is known to the backend, the rewritten URL. `None` leaves the
    /// original URL untouched.
    fn resolve_link(&self, url: &str, locale: &str) -> (String, Option<String>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = SourceError::not_found("page", "guide");

        assert_eq!(err.to_string(), "page not found: guide");
    }

    #[test]
    fn test_backend_display() {
        let err = SourceError::Backend {
            name: "index".to_owned(),
            message: "connection reset".to_owned(),
        };

        assert_eq!(err.to_string(), "failed to read index: connection reset");
    }

    #[test]
    fn test_source_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SourceError>();
    }
}
