//! Conversion error taxonomy.
//!
//! Every variant is fatal for the page being converted: there is no retry
//! and no partial output. The caller decides whether a failed page aborts
//! the whole site build.

use loc_storage::SourceError;

/// Error raised while converting a page.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// A localizable string used a tag outside the inline whitelist.
    #[error("unexpected HTML tag '{tag}' in localizable string on page {page}")]
    DisallowedTag {
        /// The offending tag name.
        tag: String,
        /// Page being converted.
        page: String,
    },
    /// A tag was opened inside a `<fix>` span.
    #[error("unexpected HTML tag '{tag}' inside a fixed string on page {page}")]
    FixedSpanNesting {
        /// The offending tag name.
        tag: String,
        /// Page being converted.
        page: String,
    },
    /// No registered format satisfies an include directive.
    #[error("failed to resolve include {include} on page {page}")]
    UnresolvedInclude {
        /// The include name from the directive.
        include: String,
        /// Page being converted.
        page: String,
    },
    /// A page was requested in a format that is not registered.
    #[error("page {page} uses unknown format {format}")]
    UnknownFormat {
        /// Page being converted.
        page: String,
        /// The unrecognized format name.
        format: String,
    },
    /// An include or page-content lookup re-entered itself.
    #[error("conversion cycle through {name} on page {page}")]
    CycleDetected {
        /// The include or page name that repeated on the call stack.
        name: String,
        /// Page being converted.
        page: String,
    },
    /// Nested conversions exceeded
    /// [`MAX_CONVERT_DEPTH`](crate::MAX_CONVERT_DEPTH).
    #[error("conversion nesting exceeds the depth limit on page {page}")]
    DepthExceeded {
        /// Page being converted.
        page: String,
    },
    /// Template evaluation failed.
    #[error("template error on page {page}: {source}")]
    Template {
        /// Page being converted.
        page: String,
        /// Underlying template engine error.
        #[source]
        source: minijinja::Error,
    },
    /// The storage backend failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}
