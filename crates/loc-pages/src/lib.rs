//! Page assembly and whole-page processing for locsite.
//!
//! [`PageAssembler`] ties the conversion pipeline to a storage backend:
//! it guesses a page's format, loads config and locale data, converts
//! the page to (head, body), and finally renders the page template
//! around it. It also implements [`PageLoader`], so templates can pull
//! whole other pages in through `get_page_content`.

mod assembler;

pub use assembler::PageAssembler;
