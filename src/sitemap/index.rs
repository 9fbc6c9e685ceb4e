//! Sitemap index document
//!
//! The index is opened once per run, receives one `<sitemap>` reference per
//! sealed collection document, and is sealed after every collection settles.
//! Until sealed it lives under a `.part` name.

use crate::sitemap::document::WrittenSitemap;
use crate::sitemap::entry::format_lastmod;
use crate::{Result, SitemapError};
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use std::path::PathBuf;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Opening of the index document
pub const INDEX_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n\
<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\r\n";

/// Closing of the index document
pub const INDEX_FOOTER: &str = "</sitemapindex>";

/// File name of the index inside the output directory
pub const INDEX_FILE_NAME: &str = "sitemap-index.xml";

/// The sitemap index under construction
pub struct SitemapIndex {
    path: PathBuf,
    temp_path: PathBuf,
    writer: BufWriter<File>,
    /// Public URL the sitemap files are served under (ends with '/')
    sitemap_base_url: String,
    lastmod: String,
    references: Vec<String>,
}

impl SitemapIndex {
    /// Creates the index file and writes its header
    ///
    /// # Arguments
    ///
    /// * `path` - Where the index is written
    /// * `sitemap_base_url` - Public URL prefix of the sitemap files
    /// * `lastmod` - The run timestamp
    pub async fn create(
        path: impl Into<PathBuf>,
        sitemap_base_url: &str,
        lastmod: DateTime<Utc>,
    ) -> Result<Self> {
        let path = path.into();
        let temp_path = path.with_extension("xml.part");
        let file = File::create(&temp_path)
            .await
            .map_err(|e| SitemapError::io(&temp_path, e))?;

        let mut index = Self {
            path,
            temp_path,
            writer: BufWriter::new(file),
            sitemap_base_url: sitemap_base_url.to_string(),
            lastmod: format_lastmod(&lastmod),
            references: Vec::new(),
        };
        if let Err(e) = index.write_raw(INDEX_HEADER).await {
            index.abandon().await;
            return Err(e);
        }
        Ok(index)
    }

    /// Appends a reference to a sealed collection document
    pub async fn add(&mut self, sitemap: &WrittenSitemap) -> Result<()> {
        let loc = format!("{}{}", self.sitemap_base_url, sitemap.file_name);
        let reference = format!(
            "  <sitemap>\r\n    <loc>{}</loc>\r\n    <lastmod>{}</lastmod>\r\n  </sitemap>\r\n",
            escape(loc.as_str()),
            self.lastmod
        );
        self.write_raw(&reference).await?;
        self.references.push(sitemap.file_name.clone());
        Ok(())
    }

    /// File names referenced so far, in arrival order
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Writes the footer and moves the index to its final name
    ///
    /// Returns the referenced file names in arrival order. On failure the
    /// temporary file is removed.
    pub async fn seal(mut self) -> Result<Vec<String>> {
        if let Err(e) = self.finish().await {
            self.abandon().await;
            return Err(e);
        }

        fs::rename(&self.temp_path, &self.path)
            .await
            .map_err(|e| SitemapError::io(&self.path, e))?;
        Ok(self.references)
    }

    /// Drops the index, removing the partially written file
    pub async fn abandon(self) {
        drop(self.writer);
        if let Err(e) = fs::remove_file(&self.temp_path).await {
            tracing::debug!(
                "Could not remove partial index {}: {}",
                self.temp_path.display(),
                e
            );
        }
    }

    async fn finish(&mut self) -> Result<()> {
        self.write_raw(INDEX_FOOTER).await?;
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
