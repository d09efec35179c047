//! The closed set of page source formats.

use std::fmt;

/// A page source format.
///
/// The set is closed and ordered: include resolution and page-format
/// guessing probe [`Format::ALL`] front to back, so resolution order is
/// deterministic across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Raw HTML passed through with placeholder substitution only.
    Html,
    /// Markdown converted through the Markdown transform.
    Markdown,
    /// A template evaluated by the template engine.
    Template,
}

impl Format {
    /// All formats, in resolution priority order.
    pub const ALL: [Self; 3] = [Self::Html, Self::Markdown, Self::Template];

    /// Canonical format name as used by storage backends.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "md",
            Self::Template => "tmpl",
        }
    }

    /// Look up a format by its canonical name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.name() == name)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_order() {
        let names: Vec<&str> = Format::ALL.iter().map(|f| f.name()).collect();

        assert_eq!(names, vec!["html", "md", "tmpl"]);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Format::from_name("md"), Some(Format::Markdown));
        assert_eq!(Format::from_name("tmpl"), Some(Format::Template));
        assert_eq!(Format::from_name("rst"), None);
    }
}
