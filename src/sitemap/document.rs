//! Per-collection urlset documents
//!
//! A document is streamed into `<name>.xml.part` and renamed into place only
//! after its footer is written, so a file under its final name is always
//! complete.

use crate::sitemap::entry::SitemapEntry;
use crate::{Result, SitemapError};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Opening of every urlset document (sitemap + image extension namespaces)
pub const URLSET_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n\
<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\" \
xmlns:image=\"http://www.google.com/schemas/sitemap-image/1.1\">\r\n";

/// Closing of every urlset document
pub const URLSET_FOOTER: &str = "</urlset>";

/// Builds the file name of a collection's sitemap, `sitemap-<slug>.xml`
///
/// Only path separators and NUL are replaced, so the name stays inside the
/// output directory. The `sitemap-` prefix keeps a leading `.` in the slug
/// from producing a hidden or parent-directory name.
pub fn sitemap_file_name(slug: &str) -> String {
    let safe: String = slug
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '-',
            c => c,
        })
        .collect();
    format!("sitemap-{}.xml", safe)
}

/// A sealed document on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenSitemap {
    /// Final path of the document
    pub path: PathBuf,

    /// File name, as referenced from the index
    pub file_name: String,

    /// Number of `<url>` entries written
    pub entries: usize,
}

/// A urlset document under construction
pub struct SitemapDocument {
    path: PathBuf,
    temp_path: PathBuf,
    writer: BufWriter<File>,
    entries: usize,
}

impl SitemapDocument {
    /// Creates the document and writes its header
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let temp_path = path.with_extension("xml.part");

        let file = File::create(&temp_path)
            .await
            .map_err(|e| SitemapError::io(&temp_path, e))?;

        let mut document = Self {
            path,
            temp_path,
            writer: BufWriter::new(file),
            entries: 0,
        };

        if let Err(e) = document.write_raw(URLSET_HEADER).await {
            document.abandon().await;
            return Err(e);
        }

        Ok(document)
    }

    /// Appends one entry
    pub async fn append(&mut self, entry: &SitemapEntry) -> Result<()> {
        self.write_raw(&entry.to_xml()).await?;
        self.entries += 1;
        Ok(())
    }

    /// Appends entries in order
    pub async fn append_all(&mut self, entries: &[SitemapEntry]) -> Result<()> {
        for entry in entries {
            self.append(entry).await?;
        }
        Ok(())
    }

    /// Writes the footer, closes the file and moves it to its final name
    ///
    /// On failure the temporary file is removed.
    pub async fn seal(mut self) -> Result<WrittenSitemap> {
        if let Err(e) = self.finish().await {
            self.abandon().await;
            return Err(e);
        }

        fs::rename(&self.temp_path, &self.path)
            .await
            .map_err(|e| SitemapError::io(&self.path, e))?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(WrittenSitemap {
            path: self.path,
            file_name,
            entries: self.entries,
        })
    }

    /// Drops the document, removing the partially written file
    pub async fn abandon(self) {
        drop(self.writer);
        if let Err(e) = fs::remove_file(&self.temp_path).await {
            tracing::debug!(
                "Could not remove partial file {}: {}",
                self.temp_path.display(),
                e
            );
        }
    }

    async fn finish(&mut self) -> Result<()> {
        self.write_raw(URLSET_FOOTER).await?;
        self.writer
            .flush()
            .await
            .map_err(|e| SitemapError::io(&self.temp_path, e))?;
        self.writer
            .get_mut()
            .sync_all()
            .await
            .map_err(|e| SitemapError::io(&self.temp_path, e))
    }

    async fn write_raw(&mut self, text: &str) -> Result<()> {
        self.writer
            .write_all(text.as_bytes())
            .await
            .map_err(|e| SitemapError::io(&self.temp_path, e))
    }
}

/// Writes a complete urlset document in one go
pub async fn write_sitemap(path: &Path, entries: &[SitemapEntry]) -> Result<WrittenSitemap> {
    let mut document = SitemapDocument::create(path).await?;
    if let Err(e) = document.append_all(entries).await {
        document.abandon().await;
        return Err(e);
    }
    document.seal().await
}
