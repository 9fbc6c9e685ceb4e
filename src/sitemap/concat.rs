//! Fragment concatenation
//!
//! Combines a directory of `<url>` fragment files into a single urlset
//! sitemap. All fragments are read before the output is touched, so a read
//! failure never leaves a partial combined file behind.

use crate::{Result, SitemapError};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Opening of the combined sitemap
pub const COMBINED_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\" \
xmlns:image=\"http://www.google.com/schemas/sitemap-image/1.1\">";

/// Closing of the combined sitemap
pub const COMBINED_FOOTER: &str = "</urlset>";

const JUNK_FILES: &[&str] = &[
    "thumbs.db",
    "ehthumbs.db",
    "desktop.ini",
    "npm-debug.log",
    "icon\r",
];

/// Result of a combine step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedSitemap {
    /// Where the combined sitemap was written
    pub path: PathBuf,

    /// Fragment files included, in concatenation order
    pub fragments: Vec<PathBuf>,
}

/// Returns true for files that never hold sitemap content
///
/// Hidden files, editor backups, OS metadata and our own in-progress
/// `.part` files.
pub fn is_junk(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    file_name.starts_with('.')
        || file_name.starts_with("~$")
        || file_name.ends_with('~')
        || lower.ends_with(".part")
        || JUNK_FILES.contains(&lower.as_str())
}

/// Lists the fragment files of a directory in concatenation order
///
/// Order is by file name, which keeps the output deterministic across
/// platforms. `exclude` is skipped if present (the combined output itself
/// when it lives in the same directory).
pub async fn list_fragments(dir: &Path, exclude: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut reader = fs::read_dir(dir)
        .await
        .map_err(|e| SitemapError::io(dir, e))?;

    let exclude_name = exclude
        .filter(|p| p.parent() == Some(dir))
        .and_then(|p| p.file_name())
        .map(|n| n.to_os_string());

    let mut fragments = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| SitemapError::io(dir, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| SitemapError::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }

        let name = entry.file_name();
        if exclude_name.as_deref() == Some(name.as_os_str()) {
            continue;
        }
        if is_junk(&name.to_string_lossy()) {
            tracing::debug!("Ignoring non-content file {}", entry.path().display());
            continue;
        }

        fragments.push(entry.path());
    }

    fragments.sort();
    Ok(fragments)
}

/// Concatenates every fragment in `dir` into one sitemap at `output`
///
/// # Returns
///
/// * `Ok(CombinedSitemap)` - The combined file was written
/// * `Err(SitemapError)` - A fragment could not be read or the output could
///   not be written; no combined file exists in that case
pub async fn combine_fragments(dir: &Path, output: &Path) -> Result<CombinedSitemap> {
    let fragments = list_fragments(dir, Some(output)).await?;

    let mut body = String::from(COMBINED_HEADER);
    for fragment in &fragments {
        let content = fs::read_to_string(fragment)
            .await
            .map_err(|e| SitemapError::io(fragment, e))?;
        body.push_str(&content);
    }
    body.push_str(COMBINED_FOOTER);

    let temp_path = output.with_extension("xml.part");
    if let Err(e) = fs::write(&temp_path, body.as_bytes()).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(SitemapError::io(&temp_path, e));
    }
    fs::rename(&temp_path, output)
        .await
        .map_err(|e| SitemapError::io(output, e))?;

    tracing::info!(
        "Combined {} fragment files into {}",
        fragments.len(),
        output.display()
    );

    Ok(CombinedSitemap {
        path: output.to_path_buf(),
        fragments,
    })
}
