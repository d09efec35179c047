//! The Markdown transform, used as a black box by the pipeline.
//!
//! Wraps pulldown-cmark with GFM options and one extra knob: a list of
//! protected block tags (by default `head`). Protected `<tag>...</tag>`
//! spans are lifted out before parsing and re-inserted verbatim
//! afterwards, so the Markdown engine can never wrap their content in
//! paragraphs, regardless of blank lines inside the span.

use std::fmt::Write;

use pulldown_cmark::{Options, Parser, html};
use regex::Regex;

/// Tags protected from the Markdown pass by default.
const DEFAULT_PROTECTED: [&str; 1] = ["head"];

/// Markdown-to-HTML converter.
pub struct MarkdownTransform {
    protected: Vec<(String, Regex)>,
}

impl MarkdownTransform {
    /// Create a transform with the default protected tags.
    #[must_use]
    pub fn new() -> Self {
        let mut transform = Self {
            protected: Vec::new(),
        };
        for tag in DEFAULT_PROTECTED {
            transform = transform.with_protected_tag(tag);
        }
        transform
    }

    /// Treat `<tag>...</tag>` spans as opaque blocks.
    #[must_use]
    pub fn with_protected_tag(mut self, tag: &str) -> Self {
        let pattern = format!(
            "(?si)<{tag}\\b[^<>]*>.*?</{tag}>",
            tag = regex::escape(tag)
        );
        self.protected
            .push((tag.to_owned(), Regex::new(&pattern).expect("valid pattern")));
        self
    }

    /// Convert a Markdown document to HTML.
    #[must_use]
    pub fn convert(&self, source: &str) -> String {
        let (source, spans) = self.lift_protected(source);
        let parser = Parser::new_ext(&source, options());
        let mut html = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut html, parser);
        restore_protected(html, &spans)
    }

    /// Convert an inline Markdown snippet, stripping a sole wrapping
    /// paragraph so the result can be embedded mid-sentence.
    #[must_use]
    pub fn convert_inline(&self, source: &str) -> String {
        let html = self.convert(source);
        let trimmed = html.trim();
        if let Some(inner) = trimmed
            .strip_prefix("<p>")
            .and_then(|rest| rest.strip_suffix("</p>"))
        {
            if !inner.contains("<p") {
                return inner.trim().to_owned();
            }
        }
        trimmed.to_owned()
    }

    /// Replace protected spans with single-line placeholder comments the
    /// Markdown engine passes through as raw HTML.
    fn lift_protected(&self, source: &str) -> (String, Vec<String>) {
        let mut text = source.to_owned();
        let mut spans = Vec::new();
        for (_, pattern) in &self.protected {
            text = pattern
                .replace_all(&text, |caps: &regex::Captures<'_>| {
                    let mut placeholder = String::new();
                    write!(placeholder, "<!--block{}-->", spans.len()).unwrap();
                    spans.push(caps[0].to_owned());
                    placeholder
                })
                .into_owned();
        }
        (text, spans)
    }
}

impl Default for MarkdownTransform {
    fn default() -> Self {
        Self::new()
    }
}

fn restore_protected(mut html: String, spans: &[String]) -> String {
    for (i, span) in spans.iter().enumerate() {
        html = html.replacen(&format!("<!--block{i}-->"), span, 1);
    }
    html
}

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_GFM
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_basic_conversion() {
        let html = MarkdownTransform::new().convert("# Title\n\nSome **bold** text.");

        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_head_not_paragraph_wrapped() {
        let source = "<head>\n<title>T</title>\n\n<meta name=\"a\" content=\"b\">\n</head>\n\nBody text.";
        let html = MarkdownTransform::new().convert(source);

        assert!(html.contains("<head>\n<title>T</title>\n\n<meta name=\"a\" content=\"b\">\n</head>"));
        assert!(!html.contains("<p><meta"));
        assert!(html.contains("<p>Body text.</p>"));
    }

    #[test]
    fn test_extra_protected_tag() {
        let transform = MarkdownTransform::new().with_protected_tag("aside");
        let html = transform.convert("<aside>\n\nkeep *raw*\n\n</aside>");

        assert!(html.contains("keep *raw*"));
    }

    #[test]
    fn test_convert_inline_strips_sole_paragraph() {
        let html = MarkdownTransform::new().convert_inline("some *emphasis* here");

        assert_eq!(html, "some <em>emphasis</em> here");
    }

    #[test]
    fn test_convert_inline_keeps_multiple_paragraphs() {
        let html = MarkdownTransform::new().convert_inline("one\n\ntwo");

        assert_eq!(html, "<p>one</p>\n<p>two</p>");
    }

    #[test]
    fn test_numeric_references_not_structural() {
        // &#42; is '*': as an entity it must not open emphasis.
        let html = MarkdownTransform::new().convert("a &#42;b&#42; c");

        assert!(!html.contains("<em>"));
    }
}
