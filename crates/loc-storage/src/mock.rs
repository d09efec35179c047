//! Mock source implementation for testing.
//!
//! Provides [`MockSource`] for unit testing the conversion pipeline
//! without a real backend.

use std::collections::HashMap;

use loc_config::SiteConfig;

use crate::source::{LocaleTable, Source, SourceError};

/// In-memory source for testing.
///
/// Stores pages, locale tables, templates and includes in memory. Use the
/// builder methods to configure the mock with test data.
///
/// # Example
///
/// ```
/// use loc_storage::{MockSource, Source};
///
/// let source = MockSource::new()
///     .with_page("index", "md", "# {{ title[page title] Hello }}")
///     .with_locale("de", "index", [("title", "Hallo")]);
///
/// assert!(source.has_page("index", "md"));
/// assert!(source.has_locale("de", "index"));
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    pages: HashMap<(String, String), String>,
    locales: HashMap<(String, String), LocaleTable>,
    templates: HashMap<String, String>,
    includes: HashMap<(String, String), String>,
    files: HashMap<String, String>,
    links: HashMap<String, (String, Option<String>)>,
    config: String,
}

impl MockSource {
    /// Create a new empty mock source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page in a format.
    #[must_use]
    pub fn with_page(
        mut self,
        page: impl Into<String>,
        format: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        self.pages
            .insert((page.into(), format.into()), content.into());
        self
    }

    /// Add a locale table for one (locale, file) pair.
    #[must_use]
    pub fn with_locale<K, V>(
        mut self,
        locale: impl Into<String>,
        file: impl Into<String>,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let table = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.locales.insert((locale.into(), file.into()), table);
        self
    }

    /// Add a page template.
    #[must_use]
    pub fn with_template(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let content = content.into();
        self.files.insert(format!("{name}.tmpl"), content.clone());
        self.templates.insert(name, content);
        self
    }

    /// Add an include fragment in a format.
    #[must_use]
    pub fn with_include(
        mut self,
        name: impl Into<String>,
        format: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        self.includes
            .insert((name.into(), format.into()), content.into());
        self
    }

    /// Add an arbitrary backend file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Register a link resolution: `url` resolves to `new_url` in `locale`.
    #[must_use]
    pub fn with_link(
        mut self,
        url: impl Into<String>,
        locale: impl Into<String>,
        new_url: impl Into<String>,
    ) -> Self {
        self.links
            .insert(url.into(), (locale.into(), Some(new_url.into())));
        self
    }

    /// Set the raw TOML site configuration.
    #[must_use]
    pub fn with_config(mut self, toml: impl Into<String>) -> Self {
        self.config = toml.into();
        self
    }
}

impl Source for MockSource {
    fn read_page(&self, page: &str, format: &str) -> Result<String, SourceError> {
        self.pages
            .get(&(page.to_owned(), format.to_owned()))
            .cloned()
            .ok_or_else(|| SourceError::not_found("page", page))
    }

    fn has_page(&self, page: &str, format: &str) -> bool {
        self.pages
            .contains_key(&(page.to_owned(), format.to_owned()))
    }

    fn read_locale(&self, locale: &str, file: &str) -> Result<LocaleTable, SourceError> {
        self.locales
            .get(&(locale.to_owned(), file.to_owned()))
            .cloned()
            .ok_or_else(|| SourceError::not_found("locale", format!("{locale}/{file}")))
    }

    fn has_locale(&self, locale: &str, file: &str) -> bool {
        self.locales
            .contains_key(&(locale.to_owned(), file.to_owned()))
    }

    fn list_locales(&self) -> Result<Vec<String>, SourceError> {
        let mut locales: Vec<String> = self
            .locales
            .keys()
            .map(|(locale, _)| locale.clone())
            .collect();
        locales.sort();
        locales.dedup();
        Ok(locales)
    }

    fn read_config(&self) -> Result<SiteConfig, SourceError> {
        Ok(SiteConfig::from_toml_str(&self.config)?)
    }

    fn read_template(&self, name: &str) -> Result<String, SourceError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::not_found("template", name))
    }

    fn has_include(&self, name: &str, format: &str) -> bool {
        self.includes
            .contains_key(&(name.to_owned(), format.to_owned()))
    }

    fn read_include(&self, name: &str, format: &str) -> Result<String, SourceError> {
        self.includes
            .get(&(name.to_owned(), format.to_owned()))
            .cloned()
            .ok_or_else(|| SourceError::not_found("include", name))
    }

    fn list_files(&self, dir: &str) -> Result<Vec<String>, SourceError> {
        let prefix = format!("{dir}/");
        let mut names: Vec<String> = self
            .files
            .keys()
            .filter_map(|path| path.strip_prefix(&prefix))
            .map(str::to_owned)
            .collect();
        names.sort();
        Ok(names)
    }

    fn read_file(&self, path: &str) -> Result<String, SourceError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::not_found("file", path))
    }

    fn resolve_link(&self, url: &str, locale: &str) -> (String, Option<String>) {
        match self.links.get(url) {
            Some((target_locale, new_url)) => (target_locale.clone(), new_url.clone()),
            None => (locale.to_owned(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_new_empty() {
        let source = MockSource::new();

        assert!(!source.has_page("index", "md"));
        assert!(source.list_locales().unwrap().is_empty());
    }

    #[test]
    fn test_pages() {
        let source = MockSource::new().with_page("index", "md", "# Hello");

        assert!(source.has_page("index", "md"));
        assert!(!source.has_page("index", "html"));
        assert_eq!(source.read_page("index", "md").unwrap(), "# Hello");
    }

    #[test]
    fn test_read_missing_page() {
        let source = MockSource::new();

        let err = source.read_page("missing", "md").unwrap_err();

        assert!(matches!(err, SourceError::NotFound { kind: "page", .. }));
    }

    #[test]
    fn test_locales() {
        let source = MockSource::new()
            .with_locale("de", "index", [("title", "Hallo")])
            .with_locale("fr", "index", [("title", "Bonjour")]);

        assert_eq!(
            source.list_locales().unwrap(),
            vec!["de".to_owned(), "fr".to_owned()]
        );
        let table = source.read_locale("de", "index").unwrap();
        assert_eq!(table.get("title"), Some(&"Hallo".to_owned()));
    }

    #[test]
    fn test_config() {
        let source = MockSource::new().with_config("[general]\ndefaultlocale = \"de\"\n");

        let config = source.read_config().unwrap();

        assert_eq!(config.default_locale(), "de");
    }

    #[test]
    fn test_template_registered_as_file() {
        let source = MockSource::new().with_template("default", "{{ body }}");

        assert_eq!(source.read_template("default").unwrap(), "{{ body }}");
        assert_eq!(source.read_file("default.tmpl").unwrap(), "{{ body }}");
    }

    #[test]
    fn test_list_files() {
        let source = MockSource::new()
            .with_file("snippets/a.html", "a")
            .with_file("snippets/b.html", "b")
            .with_file("other/c.html", "c");

        assert_eq!(
            source.list_files("snippets").unwrap(),
            vec!["a.html".to_owned(), "b.html".to_owned()]
        );
    }

    #[test]
    fn test_resolve_link() {
        let source = MockSource::new().with_link("/p", "de", "/de/p");

        assert_eq!(
            source.resolve_link("/p", "en"),
            ("de".to_owned(), Some("/de/p".to_owned()))
        );
        assert_eq!(source.resolve_link("/q", "en"), ("en".to_owned(), None));
    }
}
