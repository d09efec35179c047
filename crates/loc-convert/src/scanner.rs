//! Placeholder syntax scanning.
//!
//! Finds `{{ id[comment] body }}` spans in source text. `id` is
//! `[\w-]+`, the bracketed comment is optional, and `body` runs to the
//! earliest closing `}}`, except that one complete nested `{{...}}`
//! span inside the body is tolerated (a placeholder default may itself
//! contain placeholder syntax, e.g. in attribute values).

/// One placeholder occurrence in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlaceholderMatch<'a> {
    /// Byte offset of the opening `{{`.
    pub start: usize,
    /// Byte offset just past the closing `}}`.
    pub end: usize,
    /// The string id.
    pub id: &'a str,
    /// The bracketed comment, if present. Parsed but unused here; it
    /// feeds upstream translation-extraction tooling.
    pub comment: Option<&'a str>,
    /// The raw default content, untrimmed.
    pub body: &'a str,
}

/// Find the first placeholder at or after byte offset `from`.
///
/// A `{{` that does not parse as a placeholder is skipped, so matches are
/// found left to right and never overlap.
pub(crate) fn find_placeholder(text: &str, from: usize) -> Option<PlaceholderMatch<'_>> {
    let mut search = from;
    while let Some(rel) = text[search..].find("{{") {
        let start = search + rel;
        if let Some(found) = parse_at(text, start) {
            return Some(found);
        }
        search = start + 2;
    }
    None
}

/// Try to parse a placeholder whose `{{` sits at `start`.
fn parse_at(text: &str, start: usize) -> Option<PlaceholderMatch<'_>> {
    let mut pos = start + 2;
    pos += leading_whitespace(&text[pos..]);

    let id_len: usize = text[pos..]
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .map(char::len_utf8)
        .sum();
    if id_len == 0 {
        return None;
    }
    let id = &text[pos..pos + id_len];
    pos += id_len;

    let comment = if text[pos..].starts_with('[') {
        let end = text[pos + 1..].find(']')?;
        let comment = &text[pos + 1..pos + 1 + end];
        pos += end + 2;
        Some(comment)
    } else {
        None
    };

    // At least one whitespace character separates the id/comment from the
    // default content.
    let gap = leading_whitespace(&text[pos..]);
    if gap == 0 {
        return None;
    }
    pos += gap;

    let body_start = pos;
    let body_end = scan_body(text, body_start)?;
    Some(PlaceholderMatch {
        start,
        end: body_end + 2,
        id,
        comment,
        body: &text[body_start..body_end],
    })
}

/// Scan the body from `start`, returning the offset of the closing `}}`.
///
/// The body is matched lazily: it ends at the first `}}` not consumed by
/// a nested `{{...}}` span. Nested spans close at their own first `}}`;
/// only one level of nesting is understood.
fn scan_body(text: &str, start: usize) -> Option<usize> {
    let mut pos = start;
    while pos < text.len() {
        let rest = &text[pos..];
        if rest.starts_with("}}") {
            return Some(pos);
        }
        if rest.starts_with("{{") {
            let close = rest[2..].find("}}")?;
            pos += 2 + close + 2;
            continue;
        }
        pos += rest.chars().next().map_or(1, char::len_utf8);
    }
    None
}

fn leading_whitespace(s: &str) -> usize {
    s.chars()
        .take_while(|c| c.is_whitespace())
        .map(char::len_utf8)
        .sum()
}
