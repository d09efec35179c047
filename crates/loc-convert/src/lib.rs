//! Localizable-markup substitution engine and multi-format page
//! conversion pipeline.
//!
//! This crate turns page source written in one of several formats into
//! localized HTML:
//!
//! - [`convert_page`] converts a page's primary content and splits the
//!   result into `<head>` and body parts.
//! - [`convert_fragment`] converts nested content (includes, template
//!   data) to a plain HTML string.
//!
//! Source text may embed translation placeholders of the form
//! `{{ id[comment] default }}`. The default content is restricted to a
//! small whitelist of inline tags (`a`, `em`, `strong`, `code`) plus the
//! non-rendering `fix` tag marking non-translatable spans. Placeholders
//! are resolved against the active locale's table, with tag attributes
//! and fixed spans re-inserted positionally into the translated text.
//!
//! The three formats share the post-steps: include resolution
//! (`<? include name ?>`), locale-aware link rewriting of `href`/`src`
//! attributes, and (for top-level pages) the head/body split.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use loc_convert::{ConvertContext, Format, convert_page};
//! use loc_storage::{MockSource, Source};
//!
//! let source = Arc::new(
//!     MockSource::new().with_locale("de", "index", [("title", "Hallo")]),
//! );
//! let config = source.read_config().unwrap();
//! let table = source.read_locale("de", "index").unwrap();
//! let ctx = ConvertContext::new(source, "index", "de", config, table);
//!
//! let html = convert_page(&ctx, Format::Html, "<h1>{{title[t] Hello}}</h1>").unwrap();
//! assert_eq!(html.body, "<h1>Hallo</h1>");
//! ```

mod context;
mod error;
mod escape;
mod format;
mod includes;
mod links;
mod localize;
mod markdown;
mod markup;
mod pipeline;
mod scanner;
mod template;
mod toc;

pub use context::{
    ConvertContext, MAX_CONVERT_DEPTH, PageLoader, PageParams, StackEntry,
};
pub use error::ConvertError;
pub use escape::{EscapeTable, escape_html, html_escapes, unescape_html};
pub use format::Format;
pub use markdown::MarkdownTransform;
pub use pipeline::{PageHtml, convert_fragment, convert_page};
pub use template::{TemplateCallable, TemplatePlugins};
pub use toc::{TocNode, toclist};
