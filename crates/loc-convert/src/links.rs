//! Locale-aware link rewriting.
//!
//! Rewrites the `href` of `<a>` tags and the `src` of `<img>` tags
//! through the source's link resolver. Resolved `href` targets
//! additionally gain an `hreflang` attribute naming the locale the link
//! actually points at.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use loc_storage::Source;

use crate::escape::{escape_html, unescape_html};

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<a\s[^<>]*\bhref=")([^<>"]+)""#).expect("valid pattern"));
static SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<img\s[^<>]*\bsrc=")([^<>"]+)""#).expect("valid pattern"));

/// Rewrite link targets in `html` for `locale`.
pub(crate) fn process_links(html: &str, source: &dyn Source, locale: &str) -> String {
    let html = rewrite(html, &HREF_RE, true, source, locale);
    rewrite(&html, &SRC_RE, false, source, locale)
}

fn rewrite(
    html: &str,
    attr_re: &Regex,
    add_hreflang: bool,
    source: &dyn Source,
    locale: &str,
) -> String {
    attr_re
        .replace_all(html, |caps: &Captures<'_>| {
            let url = unescape_html(&caps[2]);
            let (link_locale, new_url) = source.resolve_link(&url, locale);
            let resolved = new_url.is_some();
            let url = new_url.unwrap_or(url);

            let mut out = format!("{}{}\"", &caps[1], escape_html(&url));
            if resolved && add_hreflang {
                out.push_str(&format!(" hreflang=\"{}\"", escape_html(&link_locale)));
            }
            out
        })
        .into_owned()
}
