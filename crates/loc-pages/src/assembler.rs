//! Assembling a page's full parameter set.

use std::sync::Arc;

use minijinja::Value;
use tracing::debug;

use loc_convert::{
    ConvertContext, ConvertError, Format, PageLoader, PageParams, StackEntry, TemplatePlugins,
    convert_fragment, convert_page,
};
use loc_storage::{LocaleTable, Source};

/// Template used when a page's front matter names none.
const DEFAULT_TEMPLATE: &str = "default";

/// Converts whole pages against one storage backend.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use loc_pages::PageAssembler;
/// use loc_storage::MockSource;
///
/// let source = Arc::new(
///     MockSource::new()
///         .with_page("index", "md", "# {{ title[t] Hello }}")
///         .with_template("default", "{{ body | safe }}"),
/// );
/// let html = PageAssembler::new(source).process_page("en", "index", None).unwrap();
/// assert!(html.contains("Hello"));
/// ```
#[derive(Clone)]
pub struct PageAssembler {
    source: Arc<dyn Source>,
    site_url_override: Option<String>,
    plugins: TemplatePlugins,
}

impl PageAssembler {
    /// Create an assembler for a storage backend.
    #[must_use]
    pub fn new(source: Arc<dyn Source>) -> Self {
        Self {
            source,
            site_url_override: None,
            plugins: TemplatePlugins::default(),
        }
    }

    /// Override the configured site URL (e.g. for preview builds).
    #[must_use]
    pub fn with_site_url_override(mut self, site_url: impl Into<String>) -> Self {
        self.site_url_override = Some(site_url.into());
        self
    }

    /// Attach custom template filters and globals.
    #[must_use]
    pub fn with_plugins(mut self, plugins: TemplatePlugins) -> Self {
        self.plugins = plugins;
        self
    }

    /// Convert a page and assemble its full parameter set.
    ///
    /// `format` is the canonical format name; when `None`, formats are
    /// probed in [`Format::ALL`] order and Markdown is assumed as a
    /// fallback so a missing page fails with a friendly error.
    pub fn page_params(
        &self,
        locale: &str,
        page: &str,
        format: Option<&str>,
    ) -> Result<PageParams, ConvertError> {
        self.page_params_with_stack(locale, page, format, &[])
    }

    /// Convert a page and render its template around the result.
    pub fn process_page(
        &self,
        locale: &str,
        page: &str,
        format: Option<&str>,
    ) -> Result<String, ConvertError> {
        let params = self.page_params(locale, page, format)?;
        let template_data = self.source.read_template(&params.template)?;
        debug!(page, template = %params.template, "rendering page template");

        let config = self.source.read_config()?;
        let locale_file = config.locale_file_for(page).to_owned();
        let locale_table = self.read_locale_table(locale, &locale_file);
        let ctx = ConvertContext::new(
            Arc::clone(&self.source),
            page,
            locale,
            config,
            locale_table,
        )
        .with_plugins(self.plugins.clone())
        .with_page_loader(Arc::new(self.clone()))
        .with_stack(vec![StackEntry::new(page, Format::Template)]);
        if let Some(url) = &params.site_url {
            ctx.export_binding("site_url", Value::from(url.clone()));
        }
        for (name, value) in params.bindings {
            ctx.export_binding(name, value);
        }
        for (name, value) in params.vars {
            ctx.set_var(name, value);
        }
        ctx.export_binding("head", Value::from(params.head));
        ctx.export_binding("body", Value::from(params.body));
        ctx.export_binding(
            "available_locales",
            Value::from(params.available_locales),
        );

        convert_fragment(&ctx, Format::Template, &template_data)
    }

    fn page_params_with_stack(
        &self,
        locale: &str,
        page: &str,
        format: Option<&str>,
        stack: &[StackEntry],
    ) -> Result<PageParams, ConvertError> {
        let format = match format {
            Some(name) => Format::from_name(name).ok_or_else(|| ConvertError::UnknownFormat {
                page: page.to_owned(),
                format: name.to_owned(),
            })?,
            None => self.guess_format(page),
        };
        debug!(page, locale, format = format.name(), "assembling page");

        let content = self.source.read_page(page, format.name())?;
        let config = self.source.read_config()?;
        let locale_file = config.locale_file_for(page).to_owned();
        let locale_table = self.read_locale_table(locale, &locale_file);

        let default_locale = config.default_locale().to_owned();
        let mut available_locales: Vec<String> = self
            .source
            .list_locales()?
            .into_iter()
            .filter(|candidate| self.source.has_locale(candidate, &locale_file))
            .collect();
        if !available_locales.contains(&default_locale) {
            available_locales.push(default_locale);
        }
        available_locales.sort();

        let mut ctx = ConvertContext::new(
            Arc::clone(&self.source),
            page,
            locale,
            config,
            locale_table,
        )
        .with_plugins(self.plugins.clone())
        .with_page_loader(Arc::new(self.clone()))
        .with_stack(stack.to_vec());
        if let Some(url) = &self.site_url_override {
            ctx = ctx.with_site_url(url.clone());
        }
        let ctx = ctx.nested(StackEntry::new(page, format))?;
        ctx.export_binding(
            "available_locales",
            Value::from(available_locales.clone()),
        );

        let html = convert_page(&ctx, format, &content)?;
        let template = ctx
            .var("template")
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_owned());

        Ok(PageParams {
            page: page.to_owned(),
            locale: locale.to_owned(),
            template,
            site_url: ctx.site_url.clone(),
            available_locales,
            head: html.head,
            body: html.body,
            vars: ctx.vars(),
            bindings: ctx.bindings(),
        })
    }

    /// Probe formats in priority order, defaulting to Markdown.
    fn guess_format(&self, page: &str) -> Format {
        Format::ALL
            .into_iter()
            .find(|format| self.source.has_page(page, format.name()))
            .unwrap_or(Format::Markdown)
    }

    /// Read a locale table, treating a missing file as empty.
    fn read_locale_table(&self, locale: &str, file: &str) -> LocaleTable {
        if self.source.has_locale(locale, file) {
            self.source.read_locale(locale, file).unwrap_or_default()
        } else {
            LocaleTable::new()
        }
    }
}

impl PageLoader for PageAssembler {
    fn load(
        &self,
        page: &str,
        locale: &str,
        stack: &[StackEntry],
    ) -> Result<PageParams, ConvertError> {
        self.page_params_with_stack(locale, page, None, stack)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use loc_storage::MockSource;

    use super::*;

    fn assembler(source: MockSource) -> PageAssembler {
        PageAssembler::new(Arc::new(source))
    }

    #[test]
    fn test_page_params_markdown_page() {
        let source = MockSource::new()
            .with_page("index", "md", "# {{ title[t] Hello }}")
            .with_locale("de", "index", [("title", "Hallo")])
            .with_config("[general]\ndefaultlocale = \"en\"\n");

        let params = assembler(source).page_params("de", "index", None).unwrap();

        assert_eq!(params.page, "index");
        assert_eq!(params.locale, "de");
        assert_eq!(params.template, "default");
        assert!(params.body.contains("<h1>Hallo</h1>"));
        assert_eq!(
            params.available_locales,
            vec!["de".to_owned(), "en".to_owned()]
        );
    }

    #[test]
    fn test_format_guessing_prefers_earlier_format() {
        let source = MockSource::new()
            .with_page("mixed", "html", "raw")
            .with_page("mixed", "md", "markdown");

        let params = assembler(source).page_params("en", "mixed", None).unwrap();

        assert_eq!(params.body, "raw");
    }

    #[test]
    fn test_explicit_format() {
        let source = MockSource::new()
            .with_page("mixed", "html", "raw")
            .with_page("mixed", "md", "markdown");

        let params = assembler(source)
            .page_params("en", "mixed", Some("md"))
            .unwrap();

        assert!(params.body.contains("markdown"));
    }

    #[test]
    fn test_unknown_format_fails() {
        let source = MockSource::new().with_page("index", "md", "x");

        let err = assembler(source)
            .page_params("en", "index", Some("rst"))
            .unwrap_err();

        match err {
            ConvertError::UnknownFormat { page, format } => {
                assert_eq!(page, "index");
                assert_eq!(format, "rst");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_page_defaults_to_markdown_error() {
        let source = MockSource::new();

        let err = assembler(source).page_params("en", "ghost", None).unwrap_err();

        assert!(matches!(err, ConvertError::Source(_)));
    }

    #[test]
    fn test_locale_override_selects_other_file() {
        let source = MockSource::new()
            .with_page("legal/terms", "html", "{{ s[c] Default }}")
            .with_locale("de", "legal/shared", [("s", "Geteilt")])
            .with_config("[locale_overrides]\n\"legal/terms\" = \"legal/shared\"\n");

        let params = assembler(source)
            .page_params("de", "legal/terms", None)
            .unwrap();

        assert_eq!(params.body, "Geteilt");
    }

    #[test]
    fn test_front_matter_selects_template() {
        let source = MockSource::new()
            .with_page("index", "html", "template = minimal\ncontent")
            .with_template("minimal", "[{{ body | safe }}]");

        let asm = assembler(source);
        let params = asm.page_params("en", "index", None).unwrap();
        assert_eq!(params.template, "minimal");

        let html = asm.process_page("en", "index", None).unwrap();
        assert_eq!(html, "[content]");
    }

    #[test]
    fn test_process_page_renders_head_and_body() {
        let source = MockSource::new()
            .with_page(
                "index",
                "html",
                "<head><title>T</title></head><p>hello</p>",
            )
            .with_template(
                "default",
                "<html><head>{{ head | safe }}</head><body>{{ body | safe }}</body></html>",
            );

        let html = assembler(source).process_page("en", "index", None).unwrap();

        assert_eq!(
            html,
            "<html><head><title>T</title></head><body><p>hello</p></body></html>"
        );
    }

    #[test]
    fn test_process_page_sees_available_locales() {
        let source = MockSource::new()
            .with_page("index", "html", "x")
            .with_locale("de", "index", [("t", "v")])
            .with_locale("fr", "index", [("t", "v")])
            .with_template("default", "{{ available_locales | join(\",\") }}");

        let html = assembler(source).process_page("de", "index", None).unwrap();

        assert_eq!(html, "de,en,fr");
    }

    #[test]
    fn test_get_page_content_pulls_other_page() {
        let source = MockSource::new()
            .with_page("snippet", "html", "<p>from snippet</p>")
            .with_page(
                "index",
                "tmpl",
                "{% set inner = get_page_content(\"snippet\") %}[{{ inner.body | safe }}]",
            )
            .with_template("default", "{{ body | safe }}");

        let html = assembler(source).process_page("en", "index", None).unwrap();

        assert_eq!(html, "[<p>from snippet</p>]");
    }

    #[test]
    fn test_get_page_content_cycle_detected() {
        let source = MockSource::new()
            .with_page(
                "loop",
                "tmpl",
                "{{ get_page_content(\"loop\").body | safe }}",
            )
            .with_template("default", "{{ body | safe }}");

        let err = assembler(source).page_params("en", "loop", None).unwrap_err();

        match err {
            ConvertError::Template { source, .. } => {
                assert!(source.to_string().contains("cycle"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_site_url_override_beats_config() {
        let source = MockSource::new()
            .with_page("index", "html", "x")
            .with_config("[general]\nsiteurl = \"https://example.com\"\n");

        let params = PageAssembler::new(Arc::new(source))
            .with_site_url_override("http://localhost:8080")
            .page_params("en", "index", None)
            .unwrap();

        assert_eq!(params.site_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_template_bindings_flow_to_page_template() {
        let source = MockSource::new()
            .with_page("index", "tmpl", "{% set headline = \"Big News\" %}<p>body</p>")
            .with_template("default", "{{ headline }}|{{ body | safe }}");

        let html = assembler(source).process_page("en", "index", None).unwrap();

        assert_eq!(html, "Big News|<p>body</p>");
    }
}
