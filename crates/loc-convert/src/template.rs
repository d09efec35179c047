//! Template evaluation and the adapter surface it calls back into.
//!
//! Templates are evaluated by minijinja with HTML auto-escape. The
//! adapter wires up the filters `translate`, `linkify` and `toclist` and
//! the globals `get_string` and `get_page_content`; values the template
//! sets at top level are exported back into the shared context so later
//! stages and sibling templates can read them.
//!
//! Custom filters and globals are registered statically through
//! [`TemplatePlugins`]; no code is ever loaded from storage content.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

use minijinja::value::{Kwargs, Rest, Value};
use minijinja::{AutoEscape, Environment, ErrorKind};
use tracing::debug;

use loc_storage::{LocaleTable, Source};

use crate::context::{ConvertContext, PageLoader, StackEntry};
use crate::error::ConvertError;
use crate::escape::{escape_html, html_escapes};
use crate::links::process_links;
use crate::localize::Localizer;
use crate::toc::toclist;

/// A custom filter or global callable.
///
/// Receives the raw argument list (for filters, the piped value first)
/// and returns the replacement value.
pub type TemplateCallable =
    Arc<dyn Fn(&[Value]) -> Result<Value, minijinja::Error> + Send + Sync>;

/// Statically registered custom filters and globals for template
/// evaluation.
#[derive(Clone, Default)]
pub struct TemplatePlugins {
    filters: Vec<(String, TemplateCallable)>,
    functions: Vec<(String, TemplateCallable)>,
}

impl TemplatePlugins {
    /// Create an empty plugin set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom filter.
    #[must_use]
    pub fn with_filter(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Result<Value, minijinja::Error> + Send + Sync + 'static,
    ) -> Self {
        self.filters.push((name.into(), Arc::new(f)));
        self
    }

    /// Register a custom global function.
    #[must_use]
    pub fn with_function(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Result<Value, minijinja::Error> + Send + Sync + 'static,
    ) -> Self {
        self.functions.push((name.into(), Arc::new(f)));
        self
    }

    fn register(&self, env: &mut Environment<'_>) {
        for (name, f) in &self.filters {
            let f = Arc::clone(f);
            env.add_filter(name.clone(), move |args: Rest<Value>| f(&args.0));
        }
        for (name, f) in &self.functions {
            let f = Arc::clone(f);
            env.add_function(name.clone(), move |args: Rest<Value>| f(&args.0));
        }
    }
}

/// Evaluate template source against the conversion context.
///
/// Returns the rendered HTML with links rewritten; top-level template
/// variables (not starting with `_`) are merged into the context's
/// bindings.
pub(crate) fn template_to_html(
    ctx: &ConvertContext,
    source_text: &str,
) -> Result<String, ConvertError> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::Html);

    {
        let loader_source = Arc::clone(&ctx.source);
        env.set_loader(move |name| match loader_source.read_file(&format!("{name}.tmpl")) {
            Ok(text) => Ok(Some(text)),
            Err(_) => Ok(None),
        });
    }

    let adapter = Adapter::new(ctx);
    env.add_filter("translate", {
        let adapter = adapter.clone();
        move |default: &str, name: &str, _comment: Option<&str>| adapter.translate(default, name)
    });
    env.add_filter("linkify", {
        let adapter = adapter.clone();
        move |page: &str, locale: Option<&str>, kwargs: Kwargs| {
            adapter.linkify(page, locale, &kwargs)
        }
    });
    env.add_filter("toclist", |content: &str| {
        Value::from_serialize(toclist(content))
    });
    env.add_function("get_string", {
        let adapter = adapter.clone();
        move |name: &str, page: &str| adapter.get_string(name, page)
    });
    env.add_function("get_page_content", {
        let adapter = adapter.clone();
        move |page: &str, locale: Option<&str>| adapter.get_page_content(page, locale)
    });
    ctx.plugins().register(&mut env);

    let template_error = |source: minijinja::Error| ConvertError::Template {
        page: ctx.page.clone(),
        source,
    };

    let template = env.template_from_str(source_text).map_err(template_error)?;
    let (rendered, state) = template
        .render_and_return_state(render_context(ctx))
        .map_err(template_error)?;

    for name in state.exports() {
        if name.starts_with('_') {
            continue;
        }
        if let Some(value) = state.lookup(name) {
            debug!(binding = name, "exporting template binding");
            ctx.export_binding(name, value);
        }
    }

    Ok(process_links(&rendered, &*ctx.source, &ctx.locale))
}

/// The root value templates are rendered against: exported bindings and
/// front-matter vars first, then the context's own fields (which win on
/// name collision).
fn render_context(ctx: &ConvertContext) -> Value {
    let mut root: BTreeMap<String, Value> = ctx.bindings();
    for (name, value) in ctx.vars() {
        root.insert(name, Value::from(value));
    }
    root.insert("page".to_owned(), Value::from(ctx.page.clone()));
    root.insert("locale".to_owned(), Value::from(ctx.locale.clone()));
    root.insert(
        "defaultlocale".to_owned(),
        Value::from(ctx.default_locale.clone()),
    );
    root.insert(
        "site_url".to_owned(),
        ctx.site_url.clone().map_or_else(|| Value::from(()), Value::from),
    );
    root.into_iter().collect()
}

/// Snapshot of the context pieces the template callbacks need.
///
/// Filters outlive the borrow of the context, so this owns (or
/// `Arc`-shares) everything it touches.
#[derive(Clone)]
struct Adapter {
    source: Arc<dyn Source>,
    page: String,
    locale: String,
    default_locale: String,
    locale_table: Arc<LocaleTable>,
    page_loader: Option<Arc<dyn PageLoader>>,
    stack: Vec<StackEntry>,
}

impl Adapter {
    fn new(ctx: &ConvertContext) -> Self {
        Self {
            source: Arc::clone(&ctx.source),
            page: ctx.page.clone(),
            locale: ctx.locale.clone(),
            default_locale: ctx.default_locale.clone(),
            locale_table: Arc::clone(&ctx.locale_table),
            page_loader: ctx.page_loader().map(Arc::clone),
            stack: ctx.stack().to_vec(),
        }
    }

    fn localizer(&self) -> Localizer<'_> {
        Localizer {
            page: &self.page,
            locale: &self.locale,
            default_locale: &self.default_locale,
            table: &self.locale_table,
        }
    }

    /// `{{ "default" | translate("id") }}`: localize against the current
    /// page's table. The translator comment is accepted and ignored.
    fn translate(&self, default: &str, name: &str) -> Result<Value, minijinja::Error> {
        let html = self
            .localizer()
            .localize_string(name, default, html_escapes())
            .map_err(into_template_error)?;
        Ok(Value::from_safe_string(html))
    }

    /// `get_string("id", "page")`: localize a string from another page's
    /// locale file, with full markup and attribute handling.
    fn get_string(&self, name: &str, page: &str) -> Result<Value, minijinja::Error> {
        let table = self
            .source
            .read_locale(&self.locale, page)
            .map_err(|err| {
                minijinja::Error::new(ErrorKind::InvalidOperation, err.to_string())
            })?;
        let default = table.get(name).ok_or_else(|| {
            minijinja::Error::new(
                ErrorKind::InvalidOperation,
                format!("no string {name} in locale file {page}"),
            )
        })?;
        let localizer = Localizer {
            page,
            locale: &self.locale,
            default_locale: &self.default_locale,
            table: &table,
        };
        let html = localizer
            .localize_string(name, default, html_escapes())
            .map_err(into_template_error)?;
        Ok(Value::from_safe_string(html))
    }

    /// `get_page_content("page")`: fully convert another page and expose
    /// its parameters as a map.
    fn get_page_content(
        &self,
        page: &str,
        locale: Option<&str>,
    ) -> Result<Value, minijinja::Error> {
        let loader = self.page_loader.as_ref().ok_or_else(|| {
            minijinja::Error::new(
                ErrorKind::InvalidOperation,
                "get_page_content requires a page loader",
            )
        })?;
        let locale = locale.unwrap_or(&self.locale);
        let params = loader
            .load(page, locale, &self.stack)
            .map_err(into_template_error)?;

        let mut map: BTreeMap<String, Value> = params.bindings;
        for (name, value) in params.vars {
            map.insert(name, Value::from(value));
        }
        map.insert("page".to_owned(), Value::from(params.page));
        map.insert("locale".to_owned(), Value::from(params.locale));
        map.insert("template".to_owned(), Value::from(params.template));
        map.insert("head".to_owned(), Value::from(params.head));
        map.insert("body".to_owned(), Value::from(params.body));
        map.insert(
            "available_locales".to_owned(),
            Value::from(params.available_locales),
        );
        map.insert(
            "site_url".to_owned(),
            params.site_url.map_or_else(|| Value::from(()), Value::from),
        );
        Ok(map.into_iter().collect())
    }

    /// `{{ "page" | linkify }}`: synthesize an opening `<a>` tag with
    /// resolved href, hreflang, and any extra attributes.
    fn linkify(
        &self,
        page: &str,
        locale: Option<&str>,
        kwargs: &Kwargs,
    ) -> Result<Value, minijinja::Error> {
        let locale = locale.unwrap_or(&self.locale);
        let (link_locale, url) = self.source.resolve_link(page, locale);
        let url = url.unwrap_or_else(|| page.to_owned());

        let mut html = String::from("<a");
        write!(html, " href=\"{}\"", escape_html(&url)).unwrap();
        write!(html, " hreflang=\"{}\"", escape_html(&link_locale)).unwrap();
        for key in kwargs.args() {
            let value: Value = kwargs.get(key)?;
            let text = value
                .as_str()
                .map_or_else(|| value.to_string(), str::to_owned);
            write!(html, " {key}=\"{}\"", escape_html(&text)).unwrap();
        }
        kwargs.assert_all_used()?;
        html.push('>');
        Ok(Value::from_safe_string(html))
    }
}

fn into_template_error(err: ConvertError) -> minijinja::Error {
    minijinja::Error::new(ErrorKind::InvalidOperation, err.to_string())
}
