//! Source abstraction for the locsite page converter.
//!
//! Provides the [`Source`] trait the conversion pipeline reads pages,
//! locale tables, templates and includes through, along with
//! [`SourceError`] for unified error handling across backends.
//!
//! Backends are addressed by logical names, never file paths: a page id
//! (`"guide"`, `"legal/terms"`), a format name (`"html"`, `"md"`,
//! `"tmpl"`), a locale code (`"de"`), or a template name (`"default"`).

#[cfg(feature = "mock")]
mod mock;
mod source;

#[cfg(feature = "mock")]
pub use mock::MockSource;
pub use source::{LocaleTable, Source, SourceError};
