//! Include directive resolution.
//!
//! An include directive (`<? include name ?>`) is replaced by the fully
//! converted content of the named fragment. Formats are probed in
//! [`Format::ALL`] order; the first format the source has the include in
//! wins, so resolution is deterministic.
//!
//! Markdown output may carry the directive with entity-escaped angle
//! brackets (the Markdown transform escapes literal `<`/`>` in text), so
//! the Markdown variant of the directive accepts either form.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::context::{ConvertContext, StackEntry};
use crate::error::ConvertError;
use crate::format::Format;
use crate::pipeline::convert_fragment;

static PLAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<\?\s*include\s+([^\s<>"]+)\s*\?>"#).expect("valid pattern"));
static MARKDOWN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:<|&lt;)\?\s*include\s+([^\s<>"]+)\s*\?(?:>|&gt;)"#).expect("valid pattern")
});

/// Substitute every include directive in `text`.
pub(crate) fn resolve_includes(
    text: &str,
    ctx: &ConvertContext,
    format: Format,
) -> Result<String, ConvertError> {
    let directive = match format {
        Format::Markdown => &MARKDOWN_RE,
        Format::Html | Format::Template => &PLAIN_RE,
    };

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in directive.captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always present");
        out.push_str(&text[last..whole.start()]);
        out.push_str(&convert_include(&caps[1], ctx)?);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Convert the named include in the first format that has it.
fn convert_include(name: &str, ctx: &ConvertContext) -> Result<String, ConvertError> {
    for format in Format::ALL {
        if !ctx.source.has_include(name, format.name()) {
            continue;
        }
        debug!(include = name, format = format.name(), "resolving include");
        let content = ctx.source.read_include(name, format.name())?;
        let nested = ctx.nested(StackEntry::new(name, format))?;
        return convert_fragment(&nested, format, &content);
    }
    Err(ConvertError::UnresolvedInclude {
        include: name.to_owned(),
        page: ctx.page.clone(),
    })
}
