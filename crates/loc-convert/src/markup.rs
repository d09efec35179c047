//! Restricted-markup extraction for localizable strings.
//!
//! A placeholder's default text may contain only a small whitelist of
//! inline tags plus the special `fix` tag marking non-translatable spans.
//! [`extract`] stream-parses such text into the clean translatable string
//! (with positional `<tag>` and `{n}` markers), the attribute lists of
//! each tag occurrence, and the ordered fixed-span contents.
//!
//! No escaping happens here: the result is a locale string, not final
//! render output. The resolver escapes when the string is inserted into
//! the document.

use std::collections::HashMap;

use crate::error::ConvertError;
use crate::escape::unescape_html;

/// Inline tags permitted in localizable default text, in the fixed order
/// the resolver re-inserts attributes.
pub(crate) const TAG_WHITELIST: [&str; 4] = ["a", "em", "strong", "code"];

/// The non-rendering tag marking a non-translatable span.
const FIX_TAG: &str = "fix";

/// Ordered (name, value) pairs as written on one tag occurrence.
pub(crate) type AttributeList = Vec<(String, String)>;

/// Result of extracting restricted markup from a default string.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ExtractedMarkup {
    /// Translatable text with `<tag>`/`</tag>` and `{n}` markers.
    pub clean: String,
    /// Attribute lists per tag name, in document order.
    pub attrs_by_tag: HashMap<String, Vec<AttributeList>>,
    /// Fixed-span contents, numbered 1..N in encounter order.
    pub fixed_strings: Vec<String>,
}

/// Parse `text` as restricted markup.
///
/// `page` only feeds error messages.
pub(crate) fn extract(text: &str, page: &str) -> Result<ExtractedMarkup, ConvertError> {
    let mut out = ExtractedMarkup::default();
    let mut fixed: Option<String> = None;
    let mut run_start = 0;
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        if !rest.starts_with('<') {
            pos += rest.chars().next().map_or(1, char::len_utf8);
            continue;
        }
        let Some(tag) = parse_tag(rest) else {
            // A lone '<' that doesn't open a tag stays literal text.
            pos += 1;
            continue;
        };
        flush_text(&text[run_start..pos], &mut out, fixed.as_mut());
        let consumed = tag.consumed;
        match tag.kind {
            TagKind::Start => handle_start(tag, &mut out, &mut fixed, page)?,
            TagKind::End => handle_end(&tag, &mut out, &mut fixed),
        }
        pos += consumed;
        run_start = pos;
    }
    flush_text(&text[run_start..], &mut out, fixed.as_mut());

    if let Some(partial) = fixed {
        // Unterminated fix span: keep the accumulated text as a fixed
        // string, mirroring a forgiving stream parse.
        out.fixed_strings.push(partial);
    }
    Ok(out)
}

fn flush_text(run: &str, out: &mut ExtractedMarkup, fixed: Option<&mut String>) {
    if run.is_empty() {
        return;
    }
    let decoded = unescape_html(run);
    match fixed {
        Some(accumulator) => accumulator.push_str(&decoded),
        None => out.clean.push_str(&decoded),
    }
}

fn handle_start(
    tag: ParsedTag,
    out: &mut ExtractedMarkup,
    fixed: &mut Option<String>,
    page: &str,
) -> Result<(), ConvertError> {
    if fixed.is_some() {
        return Err(ConvertError::FixedSpanNesting {
            tag: tag.name,
            page: page.to_owned(),
        });
    }
    if tag.name == FIX_TAG {
        *fixed = Some(String::new());
    } else if TAG_WHITELIST.contains(&tag.name.as_str()) {
        out.attrs_by_tag
            .entry(tag.name.clone())
            .or_default()
            .push(tag.attrs);
        out.clean.push('<');
        out.clean.push_str(&tag.name);
        out.clean.push('>');
    } else {
        return Err(ConvertError::DisallowedTag {
            tag: tag.name,
            page: page.to_owned(),
        });
    }
    Ok(())
}

fn handle_end(tag: &ParsedTag, out: &mut ExtractedMarkup, fixed: &mut Option<String>) {
    if tag.name == FIX_TAG {
        if let Some(content) = fixed.take() {
            out.fixed_strings.push(content);
            out.clean.push_str(&format!("{{{}}}", out.fixed_strings.len()));
        }
    } else {
        out.clean.push_str(&format!("</{}>", tag.name));
    }
}

#[derive(Debug, PartialEq, Eq)]
enum TagKind {
    Start,
    End,
}

#[derive(Debug)]
struct ParsedTag {
    kind: TagKind,
    name: String,
    attrs: AttributeList,
    /// Bytes consumed from the input, including both angle brackets.
    consumed: usize,
}

/// Parse one tag at the start of `s` (which begins with `<`).
fn parse_tag(s: &str) -> Option<ParsedTag> {
    let (kind, mut pos) = if s.starts_with("</") {
        (TagKind::End, 2)
    } else {
        (TagKind::Start, 1)
    };

    let name_start = pos;
    for c in s[pos..].chars() {
        if c.is_ascii_alphanumeric() {
            pos += c.len_utf8();
        } else {
            break;
        }
    }
    if pos == name_start {
        return None;
    }
    let name = s[name_start..pos].to_ascii_lowercase();

    let mut attrs = AttributeList::new();
    loop {
        pos += count_whitespace(&s[pos..]);
        let rest = &s[pos..];
        if rest.starts_with('>') {
            return Some(ParsedTag {
                kind,
                name,
                attrs,
                consumed: pos + 1,
            });
        }
        if rest.starts_with("/>") {
            return Some(ParsedTag {
                kind,
                name,
                attrs,
                consumed: pos + 2,
            });
        }
        if rest.is_empty() || kind == TagKind::End {
            // End tags carry no attributes; anything else is malformed.
            return None;
        }
        let (attr, consumed) = parse_attribute(rest)?;
        attrs.push(attr);
        pos += consumed;
    }
}

/// Parse one `name` or `name=value` attribute at the start of `s`.
fn parse_attribute(s: &str) -> Option<((String, String), usize)> {
    let mut pos = 0;
    for c in s.chars() {
        if c.is_whitespace() || c == '=' || c == '>' || c == '/' {
            break;
        }
        pos += c.len_utf8();
    }
    if pos == 0 {
        return None;
    }
    let name = s[..pos].to_ascii_lowercase();

    pos += count_whitespace(&s[pos..]);
    if !s[pos..].starts_with('=') {
        // Bare attribute without a value.
        return Some(((name, String::new()), pos));
    }
    pos += 1;
    pos += count_whitespace(&s[pos..]);

    let rest = &s[pos..];
    let (raw, consumed) = if let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'')
    {
        let inner = &rest[1..];
        let end = inner.find(quote)?;
        (&inner[..end], end + 2)
    } else {
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '>')
            .unwrap_or(rest.len());
        (&rest[..end], end)
    };
    Some(((name, unescape_html(raw)), pos + consumed))
}

fn count_whitespace(s: &str) -> usize {
    s.chars()
        .take_while(|c| c.is_whitespace())
        .map(char::len_utf8)
        .sum()
}
