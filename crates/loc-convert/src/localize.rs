//! Translation lookup and localized-string reconstruction.
//!
//! [`Localizer::insert_localized_strings`] replaces every placeholder in
//! a text body with its localized rendering. For each placeholder,
//! [`Localizer::localize_string`]:
//!
//! 1. extracts the restricted markup from the default content,
//! 2. picks the translation (or falls back to the clean default),
//! 3. re-inserts fixed spans at their `{n}` markers,
//! 4. escapes the whole string through the active escape table,
//! 5. re-inserts tag attributes at the (now escaped) `<tag>...</tag>`
//!    marker pairs, recursively localizing attribute values.
//!
//! Marker mismatches are tolerated: unused fixed strings are dropped,
//! surplus `{n}` text stays literal, and marker pairs beyond the recorded
//! occurrences become plain attribute-less tags.

use regex::Regex;

use loc_storage::LocaleTable;

use crate::error::ConvertError;
use crate::escape::{EscapeTable, escape_with};
use crate::markup::{self, AttributeList, TAG_WHITELIST};
use crate::scanner::find_placeholder;

/// Callback rendering a placeholder's default body to HTML before
/// localization (the Markdown pipeline converts inline Markdown here;
/// other formats pass text through).
pub(crate) type ToHtml<'a> = dyn Fn(&str) -> String + 'a;

/// Identity [`ToHtml`] callback.
pub(crate) fn identity(s: &str) -> String {
    s.to_owned()
}

/// Localization state for one page conversion.
pub(crate) struct Localizer<'a> {
    /// Page id, for error messages.
    pub page: &'a str,
    /// Active locale.
    pub locale: &'a str,
    /// The site's default locale.
    pub default_locale: &'a str,
    /// Translation table for the active locale.
    pub table: &'a LocaleTable,
}

impl Localizer<'_> {
    /// Replace every placeholder in `text` with its localized rendering.
    pub fn insert_localized_strings(
        &self,
        text: &str,
        escapes: &EscapeTable,
        to_html: &ToHtml<'_>,
    ) -> Result<String, ConvertError> {
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        while let Some(found) = find_placeholder(text, pos) {
            out.push_str(&text[pos..found.start]);
            let default = to_html(found.body.trim());
            out.push_str(&self.localize_string(found.id, default.trim(), escapes)?);
            pos = found.end;
        }
        out.push_str(&text[pos..]);
        Ok(out)
    }

    /// Produce the final localized string for one placeholder.
    pub fn localize_string(
        &self,
        name: &str,
        default: &str,
        escapes: &EscapeTable,
    ) -> Result<String, ConvertError> {
        let markup = markup::extract(default, self.page)?;

        // Translations only apply away from the default locale; the
        // default locale's page content is the source of truth.
        let translated = (self.locale != self.default_locale)
            .then(|| self.table.get(name))
            .flatten();
        let mut result = match translated {
            Some(text) => text.trim().to_owned(),
            None => markup.clean,
        };

        for (i, fixed) in markup.fixed_strings.iter().enumerate() {
            result = result.replacen(&format!("{{{}}}", i + 1), fixed, 1);
        }

        let mut result = escape_with(escapes, &result);

        for tag in TAG_WHITELIST {
            let saved = markup.attrs_by_tag.get(tag).map_or(&[][..], Vec::as_slice);
            let marker = marker_regex(tag, escapes);
            for attrs in saved {
                let rendered = self.render_attributes(attrs, escapes)?;
                result = marker
                    .replacen(&result, 1, |caps: &regex::Captures<'_>| {
                        format!("<{tag}{rendered}>{}</{tag}>", &caps[1])
                    })
                    .into_owned();
            }
            // A translation may use more occurrences than the default
            // recorded; those become plain attribute-less tags.
            result = marker
                .replace_all(&result, |caps: &regex::Captures<'_>| {
                    format!("<{tag}>{}</{tag}>", &caps[1])
                })
                .into_owned();
        }
        Ok(result)
    }

    /// Render one occurrence's attributes as ` k="v" ...`, localizing and
    /// escaping each value.
    fn render_attributes(
        &self,
        attrs: &AttributeList,
        escapes: &EscapeTable,
    ) -> Result<String, ConvertError> {
        let mut out = String::new();
        for (name, value) in attrs {
            // Attribute values may themselves contain placeholder syntax.
            let localized = self.insert_localized_strings(value, escapes, &identity)?;
            out.push(' ');
            out.push_str(&escape_with(escapes, name));
            out.push_str("=\"");
            out.push_str(&escape_with(escapes, &localized));
            out.push('"');
        }
        Ok(out)
    }
}

/// Regex matching one escaped `<tag>...</tag>` marker pair.
fn marker_regex(tag: &str, escapes: &EscapeTable) -> Regex {
    let open = escape_with(escapes, &format!("<{tag}>"));
    let close = escape_with(escapes, &format!("</{tag}>"));
    let pattern = format!(
        "(?s){}([^<>]*?){}",
        regex::escape(&open),
        regex::escape(&close)
    );
    Regex::new(&pattern).expect("marker pattern is valid")
}
