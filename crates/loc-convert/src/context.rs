//! Shared conversion state.
//!
//! A [`ConvertContext`] is created once per page conversion and shared by
//! every nested include and template invocation of that page. All fields
//! are either immutable for the page's lifetime (source handle, locales,
//! config, locale table) or deliberately shared mutable channels
//! ([`ConvertContext::set_var`], [`ConvertContext::export_binding`]) that
//! let earlier stages pass computed values forward.
//!
//! The content being converted is *not* part of the context: it is an
//! explicit parameter of the convert functions, so each nested include
//! works on its own content without any restore step.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use minijinja::Value;

use loc_config::SiteConfig;
use loc_storage::{LocaleTable, Source};

use crate::error::ConvertError;
use crate::format::Format;
use crate::localize::Localizer;
use crate::template::TemplatePlugins;

/// Maximum nesting of includes and page-content lookups.
pub const MAX_CONVERT_DEPTH: usize = 10;

/// One frame of the nested-conversion call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEntry {
    /// Include name or page id.
    pub name: String,
    /// Format the content is converted in.
    pub format: Format,
}

impl StackEntry {
    /// Create a stack entry.
    #[must_use]
    pub fn new(name: impl Into<String>, format: Format) -> Self {
        Self {
            name: name.into(),
            format,
        }
    }
}

/// Fully assembled parameters of a converted page.
///
/// Returned by a [`PageLoader`] for nested page-content lookups.
#[derive(Debug, Clone, Default)]
pub struct PageParams {
    /// Page id.
    pub page: String,
    /// Locale the page was converted for.
    pub locale: String,
    /// Template name selected for the page.
    pub template: String,
    /// Configured site URL, if any.
    pub site_url: Option<String>,
    /// Locales the page is available in, sorted.
    pub available_locales: Vec<String>,
    /// Extracted `<head>` content.
    pub head: String,
    /// Page body HTML.
    pub body: String,
    /// Front-matter variables collected during conversion.
    pub vars: BTreeMap<String, String>,
    /// Values exported by template evaluation.
    pub bindings: BTreeMap<String, Value>,
}

/// Collaborator assembling a full nested page on behalf of the template
/// adapter's `get_page_content`.
pub trait PageLoader: Send + Sync {
    /// Load and convert `page` for `locale`.
    ///
    /// `stack` is the caller's conversion call stack; implementations
    /// must thread it through so cycles are detected.
    fn load(
        &self,
        page: &str,
        locale: &str,
        stack: &[StackEntry],
    ) -> Result<PageParams, ConvertError>;
}

/// Shared state of one page conversion.
#[derive(Clone)]
pub struct ConvertContext {
    /// Storage backend.
    pub source: Arc<dyn Source>,
    /// Page id being converted.
    pub page: String,
    /// Active locale.
    pub locale: String,
    /// The site's default locale.
    pub default_locale: String,
    /// Site URL for this conversion, if configured.
    pub site_url: Option<String>,
    /// Parsed site configuration.
    pub config: Arc<SiteConfig>,
    /// Translation table for (locale, locale file).
    pub locale_table: Arc<LocaleTable>,
    vars: Arc<RwLock<BTreeMap<String, String>>>,
    bindings: Arc<RwLock<BTreeMap<String, Value>>>,
    page_loader: Option<Arc<dyn PageLoader>>,
    plugins: TemplatePlugins,
    stack: Vec<StackEntry>,
}

impl std::fmt::Debug for ConvertContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertContext")
            .field("page", &self.page)
            .field("locale", &self.locale)
            .field("default_locale", &self.default_locale)
            .field("site_url", &self.site_url)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

impl ConvertContext {
    /// Create the context for one page conversion.
    #[must_use]
    pub fn new(
        source: Arc<dyn Source>,
        page: impl Into<String>,
        locale: impl Into<String>,
        config: SiteConfig,
        locale_table: LocaleTable,
    ) -> Self {
        let default_locale = config.default_locale().to_owned();
        let site_url = config.site_url().map(str::to_owned);
        Self {
            source,
            page: page.into(),
            locale: locale.into(),
            default_locale,
            site_url,
            config: Arc::new(config),
            locale_table: Arc::new(locale_table),
            vars: Arc::new(RwLock::new(BTreeMap::new())),
            bindings: Arc::new(RwLock::new(BTreeMap::new())),
            page_loader: None,
            plugins: TemplatePlugins::default(),
            stack: Vec::new(),
        }
    }

    /// Override the site URL.
    #[must_use]
    pub fn with_site_url(mut self, site_url: impl Into<String>) -> Self {
        self.site_url = Some(site_url.into());
        self
    }

    /// Attach the page loader used by `get_page_content`.
    #[must_use]
    pub fn with_page_loader(mut self, loader: Arc<dyn PageLoader>) -> Self {
        self.page_loader = Some(loader);
        self
    }

    /// Attach custom template filters and globals.
    #[must_use]
    pub fn with_plugins(mut self, plugins: TemplatePlugins) -> Self {
        self.plugins = plugins;
        self
    }

    /// Seed the call stack from an outer conversion.
    #[must_use]
    pub fn with_stack(mut self, stack: Vec<StackEntry>) -> Self {
        self.stack = stack;
        self
    }

    /// Derive the context for a nested conversion.
    ///
    /// Shares every field with the parent and pushes `entry` onto the
    /// call stack. Fails fast on a repeated entry or excessive depth.
    pub fn nested(&self, entry: StackEntry) -> Result<Self, ConvertError> {
        if self.stack.contains(&entry) {
            return Err(ConvertError::CycleDetected {
                name: entry.name,
                page: self.page.clone(),
            });
        }
        if self.stack.len() >= MAX_CONVERT_DEPTH {
            return Err(ConvertError::DepthExceeded {
                page: self.page.clone(),
            });
        }
        let mut child = self.clone();
        child.stack.push(entry);
        Ok(child)
    }

    /// The nested-conversion call stack.
    #[must_use]
    pub fn stack(&self) -> &[StackEntry] {
        &self.stack
    }

    /// Store a front-matter variable, visible to the whole conversion.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_var(&self, name: impl Into<String>, value: impl Into<String>) {
        self.vars
            .write()
            .unwrap()
            .insert(name.into(), value.into());
    }

    /// Read a front-matter variable.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<String> {
        self.vars.read().unwrap().get(name).cloned()
    }

    /// Snapshot of all front-matter variables.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn vars(&self) -> BTreeMap<String, String> {
        self.vars.read().unwrap().clone()
    }

    /// Export a template-computed binding, visible to later stages.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn export_binding(&self, name: impl Into<String>, value: Value) {
        self.bindings.write().unwrap().insert(name.into(), value);
    }

    /// Snapshot of all exported bindings.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn bindings(&self) -> BTreeMap<String, Value> {
        self.bindings.read().unwrap().clone()
    }

    pub(crate) fn page_loader(&self) -> Option<&Arc<dyn PageLoader>> {
        self.page_loader.as_ref()
    }

    pub(crate) fn plugins(&self) -> &TemplatePlugins {
        &self.plugins
    }

    pub(crate) fn localizer(&self) -> Localizer<'_> {
        Localizer {
            page: &self.page,
            locale: &self.locale,
            default_locale: &self.default_locale,
            table: &self.locale_table,
        }
    }
}
