//! Table-of-contents extraction from rendered HTML.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::escape::unescape_html;

/// One heading in the table-of-contents forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocNode {
    /// Heading level (1-9).
    pub level: u8,
    /// The heading's `id` attribute, entity-decoded.
    pub anchor: String,
    /// Heading text, entity-decoded.
    pub title: String,
    /// Headings nested under this one.
    pub children: Vec<TocNode>,
}

static HEADING_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    (1..=9)
        .map(|level| {
            Regex::new(&format!(
                r#"(?s)<h{level}\s[^<>]*\bid="([^<>"]+)"[^<>]*>(.*?)</h{level}>"#
            ))
            .expect("valid pattern")
        })
        .collect()
});

/// Build the table-of-contents forest for an HTML fragment.
///
/// Headings with an `id` attribute are collected in document order and
/// nested by level: each heading becomes a child of the nearest earlier
/// heading with a smaller level.
#[must_use]
pub fn toclist(html: &str) -> Vec<TocNode> {
    let mut flat: Vec<(usize, TocNode)> = Vec::new();
    for (i, heading_re) in HEADING_RES.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let level = (i + 1) as u8;
        for caps in heading_re.captures_iter(html) {
            let start = caps.get(0).expect("group 0 always present").start();
            flat.push((
                start,
                TocNode {
                    level,
                    anchor: unescape_html(&caps[1]),
                    title: unescape_html(&caps[2]),
                    children: Vec::new(),
                },
            ));
        }
    }
    flat.sort_by_key(|(start, _)| *start);

    // Sentinel root at level 0 collects the top-level headings.
    let mut stack = vec![TocNode {
        level: 0,
        anchor: String::new(),
        title: String::new(),
        children: Vec::new(),
    }];
    for (_, node) in flat {
        while stack.last().is_some_and(|top| top.level >= node.level) {
            let done = stack.pop().expect("stack is non-empty");
            stack
                .last_mut()
                .expect("sentinel never popped")
                .children
                .push(done);
        }
        stack.push(node);
    }
    while stack.len() > 1 {
        let done = stack.pop().expect("stack has more than one entry");
        stack
            .last_mut()
            .expect("sentinel never popped")
            .children
            .push(done);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_forest_structure() {
        let html = r#"<h1 id="a">A</h1><h2 id="b">B</h2><h1 id="c">C</h1>"#;

        let toc = toclist(html);

        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].anchor, "a");
        assert_eq!(toc[0].children.len(), 1);
        assert_eq!(toc[0].children[0].anchor, "b");
        assert_eq!(toc[1].anchor, "c");
        assert!(toc[1].children.is_empty());
    }

    #[test]
    fn test_skipped_levels_nest_under_nearest_smaller() {
        let html = r#"<h1 id="a">A</h1><h3 id="b">B</h3><h2 id="c">C</h2>"#;

        let toc = toclist(html);

        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].children.len(), 2);
        assert_eq!(toc[0].children[0].anchor, "b");
        assert_eq!(toc[0].children[1].anchor, "c");
    }

    #[test]
    fn test_headings_without_id_skipped() {
        let html = r#"<h1 id="a">A</h1><h2>no anchor</h2>"#;

        let toc = toclist(html);

        assert_eq!(toc.len(), 1);
        assert!(toc[0].children.is_empty());
    }

    #[test]
    fn test_titles_entity_decoded() {
        let html = r#"<h1 class="x" id="a&amp;b">Q &amp; A</h1>"#;

        let toc = toclist(html);

        assert_eq!(toc[0].anchor, "a&b");
        assert_eq!(toc[0].title, "Q & A");
    }

    #[test]
    fn test_empty_input() {
        assert!(toclist("no headings here").is_empty());
    }
}
