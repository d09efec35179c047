//! Character escape tables and HTML entity decoding.
//!
//! Escaping is table-driven: an [`EscapeTable`] maps single characters to
//! replacement strings and characters absent from the table pass through
//! unchanged. The resolver applies a table to translated text late, after
//! fixed-span re-insertion, so locale strings stay un-escaped until they
//! are about to enter the document.

use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Per-character substitution map.
pub type EscapeTable = BTreeMap<char, String>;

/// Characters the Markdown engine treats as structural and must therefore
/// not see literally in substituted text.
const MARKDOWN_RESERVED: [char; 16] = [
    '\\', '`', '*', '_', '{', '}', '[', ']', '(', ')', '>', '#', '+', '-', '.', '!',
];

static HTML_ESCAPES: LazyLock<EscapeTable> = LazyLock::new(|| {
    [
        ('<', "&lt;"),
        ('>', "&gt;"),
        ('&', "&amp;"),
        ('"', "&quot;"),
        ('\'', "&#39;"),
    ]
    .into_iter()
    .map(|(c, entity)| (c, entity.to_owned()))
    .collect()
});

static MARKDOWN_ESCAPES: LazyLock<EscapeTable> = LazyLock::new(|| {
    let mut table: EscapeTable = MARKDOWN_RESERVED
        .into_iter()
        .map(|c| (c, format!("&#{};", c as u32)))
        .collect();
    // HTML entries win on conflict ('>' in particular).
    for (c, entity) in html_escapes() {
        table.insert(*c, entity.clone());
    }
    table
});

/// The HTML escape table: `< > & " '`.
#[must_use]
pub fn html_escapes() -> &'static EscapeTable {
    &HTML_ESCAPES
}

/// Markdown's reserved punctuation mapped to numeric character
/// references, merged with (and overridden by) the HTML escape table.
#[must_use]
pub(crate) fn markdown_escapes() -> &'static EscapeTable {
    &MARKDOWN_ESCAPES
}

/// Apply an escape table to every character of `s`.
#[must_use]
pub(crate) fn escape_with(table: &EscapeTable, s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match table.get(&c) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    out
}

/// HTML-escape a string with the standard table.
#[must_use]
pub fn escape_html(s: &str) -> String {
    escape_with(html_escapes(), s)
}

/// Decode HTML entity and character references to literal characters.
///
/// Handles the named entities produced by [`escape_html`] plus `&apos;`
/// and `&nbsp;`, and decimal/hex character references. Anything that does
/// not parse as a reference is left as-is.
#[must_use]
pub fn unescape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        // A reference is short; anything longer is a stray ampersand.
        let semi = rest.find(';').filter(|&j| j <= 32);
        match semi.and_then(|j| decode_reference(&rest[1..j]).map(|c| (c, j))) {
            Some((c, j)) => {
                out.push(c);
                rest = &rest[j + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode the inside of one `&...;` reference.
fn decode_reference(body: &str) -> Option<char> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}
