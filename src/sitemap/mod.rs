//! Sitemap output module
//!
//! This module handles:
//! - Formatting `<url>` entries (with the image extension)
//! - Writing per-collection urlset documents
//! - Writing the sitemap index
//! - Concatenating fragment files into one combined sitemap

mod concat;
mod document;
mod entry;
mod index;

pub use concat::{
    combine_fragments, is_junk, list_fragments, CombinedSitemap, COMBINED_FOOTER,
    COMBINED_HEADER,
};
pub use document::{
    sitemap_file_name, write_sitemap, SitemapDocument, WrittenSitemap, URLSET_FOOTER,
    URLSET_HEADER,
};
pub use entry::{encode_image_url, format_lastmod, ChangeFrequency, SitemapEntry};
pub use index::{SitemapIndex, INDEX_FILE_NAME, INDEX_FOOTER, INDEX_HEADER};

/// File name of the static sitemap for pages outside any collection
pub const MISC_FILE_NAME: &str = "sitemap-misc.xml";
