//! Conversion pipeline orchestration.
//!
//! Every format follows the same shape: produce HTML from the source
//! text (with placeholder substitution and link rewriting), then resolve
//! include directives. A top-level page conversion additionally splits
//! `<head>` content away from the body; nested conversions (includes,
//! template data) return the HTML alone.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::context::ConvertContext;
use crate::error::ConvertError;
use crate::escape::{html_escapes, markdown_escapes};
use crate::format::Format;
use crate::includes::resolve_includes;
use crate::links::process_links;
use crate::localize::identity;
use crate::markdown::MarkdownTransform;
use crate::template::template_to_html;

/// Result of converting a page's primary content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHtml {
    /// Content of all `<head>` blocks, concatenated.
    pub head: String,
    /// The remaining document body.
    pub body: String,
}

/// Convert a page's primary content, splitting head from body.
pub fn convert_page(
    ctx: &ConvertContext,
    format: Format,
    source_text: &str,
) -> Result<PageHtml, ConvertError> {
    let html = convert_inner(ctx, format, source_text)?;
    Ok(split_head(&html))
}

/// Convert nested content (an include or template data) to HTML.
pub fn convert_fragment(
    ctx: &ConvertContext,
    format: Format,
    source_text: &str,
) -> Result<String, ConvertError> {
    convert_inner(ctx, format, source_text)
}

fn convert_inner(
    ctx: &ConvertContext,
    format: Format,
    source_text: &str,
) -> Result<String, ConvertError> {
    debug!(
        page = %ctx.page,
        locale = %ctx.locale,
        format = format.name(),
        depth = ctx.stack().len(),
        "converting"
    );
    let content = strip_front_matter(ctx, source_text);
    let html = match format {
        Format::Html => {
            let html = ctx
                .localizer()
                .insert_localized_strings(&content, html_escapes(), &identity)?;
            process_links(&html, &*ctx.source, &ctx.locale)
        }
        Format::Markdown => {
            let markdown = MarkdownTransform::new();
            let html = ctx.localizer().insert_localized_strings(
                &content,
                markdown_escapes(),
                &|s| markdown.convert_inline(s),
            )?;
            let html = markdown.convert(&html);
            let html = collapse_numeric_references(&html);
            process_links(&html, &*ctx.source, &ctx.locale)
        }
        Format::Template => template_to_html(ctx, &content)?,
    };
    resolve_includes(&html, ctx, format)
}

static FRONT_MATTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([\w-]+)\s*=(.*)$").expect("valid pattern"));

/// Strip leading `name = value` lines into the shared vars map.
fn strip_front_matter(ctx: &ConvertContext, source: &str) -> String {
    let mut rest = source;
    loop {
        let (line, tail) = rest.split_once('\n').unwrap_or((rest, ""));
        let Some(caps) = FRONT_MATTER_RE.captures(line) else {
            break;
        };
        ctx.set_var(&caps[1], caps[2].trim());
        rest = tail;
    }
    rest.to_owned()
}

static NUMERIC_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(\d+);").expect("valid pattern"));

/// Collapse numeric character references the Markdown pass left behind,
/// keeping only those that are semantically required HTML escapes.
fn collapse_numeric_references(html: &str) -> String {
    NUMERIC_REF_RE
        .replace_all(html, |caps: &Captures<'_>| {
            let reference = &caps[0];
            match caps[1].parse::<u32>().ok().and_then(char::from_u32) {
                Some(c) if !html_escapes().contains_key(&c) => c.to_string(),
                _ => reference.to_owned(),
            }
        })
        .into_owned()
}

static HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<head>(.*?)</head>").expect("valid pattern"));

/// Extract every `<head>...</head>` block from the document.
fn split_head(html: &str) -> PageHtml {
    let mut head = String::new();
    let body = HEAD_RE.replace_all(html, |caps: &Captures<'_>| {
        head.push_str(&caps[1]);
        String::new()
    });
    PageHtml {
        head,
        body: body.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use loc_config::SiteConfig;
    use loc_storage::{LocaleTable, MockSource};

    use super::*;

    fn context_with(source: MockSource, locale: &str, table: &[(&str, &str)]) -> ConvertContext {
        let table: LocaleTable = table
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ConvertContext::new(
            Arc::new(source),
            "index",
            locale,
            SiteConfig::default(),
            table,
        )
    }

    #[test]
    fn test_raw_conversion() {
        let ctx = context_with(MockSource::new(), "de", &[("title", "Hallo")]);

        let html = convert_page(&ctx, Format::Html, "<h1>{{ title[t] Hello }}</h1>").unwrap();

        assert_eq!(html.head, "");
        assert_eq!(html.body, "<h1>Hallo</h1>");
    }

    #[test]
    fn test_raw_links_rewritten() {
        let source = MockSource::new().with_link("/p", "de", "/de/p");
        let ctx = context_with(source, "de", &[]);

        let html = convert_page(&ctx, Format::Html, r#"<a href="/p">x</a>"#).unwrap();

        assert_eq!(html.body, r#"<a href="/de/p" hreflang="de">x</a>"#);
    }

    #[test]
    fn test_head_split() {
        let ctx = context_with(MockSource::new(), "en", &[]);

        let html = convert_page(
            &ctx,
            Format::Html,
            "<head><title>T</title></head><p>body</p>",
        )
        .unwrap();

        assert_eq!(html.head, "<title>T</title>");
        assert_eq!(html.body, "<p>body</p>");
    }

    #[test]
    fn test_fragment_keeps_head() {
        let ctx = context_with(MockSource::new(), "en", &[]);

        let html = convert_fragment(
            &ctx,
            Format::Html,
            "<head><title>T</title></head><p>body</p>",
        )
        .unwrap();

        assert_eq!(html, "<head><title>T</title></head><p>body</p>");
    }

    #[test]
    fn test_front_matter_stripped_into_vars() {
        let ctx = context_with(MockSource::new(), "en", &[]);

        let html = convert_page(
            &ctx,
            Format::Html,
            "template = minimal\ntitle=Docs\n<p>content</p>",
        )
        .unwrap();

        assert_eq!(html.body, "<p>content</p>");
        assert_eq!(ctx.var("template"), Some("minimal".to_owned()));
        assert_eq!(ctx.var("title"), Some("Docs".to_owned()));
    }

    #[test]
    fn test_markdown_conversion_with_translation() {
        let ctx = context_with(MockSource::new(), "de", &[("title", "Hallo *Welt*")]);

        let html = convert_page(&ctx, Format::Markdown, "# {{ title[t] Hello }}").unwrap();

        // Markdown punctuation in the translation must not become
        // structure; the escape collapses back to the literal character.
        assert_eq!(html.body.trim(), "<h1>Hallo *Welt*</h1>");
    }

    #[test]
    fn test_markdown_inline_default_rendering() {
        let ctx = context_with(MockSource::new(), "en", &[]);

        let html = convert_page(&ctx, Format::Markdown, "{{ msg[m] some *emphasis* }}").unwrap();

        assert_eq!(html.body.trim(), "<p>some <em>emphasis</em></p>");
    }

    #[test]
    fn test_markdown_include_resolution() {
        let source = MockSource::new().with_include("footer", "html", "<p>foot</p>");
        let ctx = context_with(source, "en", &[]);

        let html = convert_page(&ctx, Format::Markdown, "text\n\n<? include footer ?>").unwrap();

        assert!(html.body.contains("<p>foot</p>"));
    }

    #[test]
    fn test_template_conversion() {
        let ctx = context_with(MockSource::new(), "de", &[("title", "Hallo")]);

        let html = convert_page(
            &ctx,
            Format::Template,
            r#"<h1>{{ "Hello" | translate("title") }}</h1>"#,
        )
        .unwrap();

        assert_eq!(html.body, "<h1>Hallo</h1>");
    }

    #[test]
    fn test_template_bindings_visible_after_conversion() {
        let ctx = context_with(MockSource::new(), "en", &[]);

        convert_fragment(&ctx, Format::Template, "{% set headline = \"Big\" %}ok").unwrap();

        assert!(ctx.bindings().contains_key("headline"));
    }

    #[test]
    fn test_collapse_numeric_references() {
        // 104 is 'h' (collapsible); 39 is '\'' (a required HTML escape).
        assert_eq!(collapse_numeric_references("&#104;i &#39;q&#39;"), "hi &#39;q&#39;");
    }

    #[test]
    fn test_sibling_includes_isolated() {
        // Two includes on one page: each converts its own content; the
        // second must not see the first's text.
        let source = MockSource::new()
            .with_include("one", "html", "1")
            .with_include("two", "html", "2");
        let ctx = context_with(source, "en", &[]);

        let html = convert_page(
            &ctx,
            Format::Html,
            "<? include one ?>/<? include two ?>",
        )
        .unwrap();

        assert_eq!(html.body, "1/2");
    }

    #[test]
    fn test_include_sees_page_locale_table() {
        let source = MockSource::new().with_include("banner", "html", "{{ title[t] Hello }}");
        let ctx = context_with(source, "de", &[("title", "Hallo")]);

        let html = convert_page(&ctx, Format::Html, "[<? include banner ?>]").unwrap();

        assert_eq!(html.body, "[Hallo]");
    }

    #[test]
    fn test_multiple_head_blocks_concatenated() {
        let ctx = context_with(MockSource::new(), "en", &[]);

        let html = convert_page(
            &ctx,
            Format::Html,
            "<head><a>1</a></head>mid<head><b>2</b></head>",
        )
        .unwrap();

        assert_eq!(html.head, "<a>1</a><b>2</b>");
        assert_eq!(html.body, "mid");
    }

    #[test]
    fn test_unknown_source_error_propagates() {
        let ctx = context_with(MockSource::new(), "en", &[]);

        let err = convert_page(&ctx, Format::Html, "<? include nope ?>").unwrap_err();

        assert!(matches!(err, ConvertError::UnresolvedInclude { .. }));
    }

}
