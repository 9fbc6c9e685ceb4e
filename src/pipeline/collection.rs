//! Per-collection work
//!
//! For one collection this module fetches the configuration, pages,
//! showcases and items concurrently, turns every record into a sitemap
//! entry, and writes the collection's sitemap document. A failed fetch
//! only empties its own share of entries.

use crate::honeycomb::{Collection, HoneycombApi, ResourceKind, SubResourceRecord};
use crate::output::FailedFetch;
use crate::sitemap::{
    sitemap_file_name, ChangeFrequency, SitemapDocument, SitemapEntry, WrittenSitemap,
};
use crate::SitemapError;
use chrono::{DateTime, Utc};
use std::path::Path;

/// State shared by every collection task of a run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub api: HoneycombApi,
    /// Public site base URL (ends with '/')
    pub collection_base_url: String,
    /// Timestamp written as `<lastmod>` everywhere
    pub lastmod: DateTime<Utc>,
}

/// Change frequency and priority of a collection's own entry
pub const COLLECTION_POLICY: (ChangeFrequency, f32) = (ChangeFrequency::Daily, 1.0);

/// Change frequency and priority of the "about" page
pub const ABOUT_POLICY: (ChangeFrequency, f32) = (ChangeFrequency::Weekly, 0.5);

/// Change frequency and priority of the browse/search page
pub const SEARCH_POLICY: (ChangeFrequency, f32) = (ChangeFrequency::Weekly, 0.8);

/// Change frequency and priority of a sub-resource entry
pub fn resource_policy(kind: ResourceKind) -> (ChangeFrequency, f32) {
    match kind {
        ResourceKind::Page => (ChangeFrequency::Weekly, 0.5),
        ResourceKind::Showcase => (ChangeFrequency::Weekly, 0.9),
        ResourceKind::Item => (ChangeFrequency::Weekly, 0.5),
    }
}

/// Entries gathered for one collection
#[derive(Debug, Clone)]
pub struct GatheredEntries {
    /// The collection's own entry, always first in its sitemap
    pub collection_entry: SitemapEntry,
    /// Config, page, showcase and item entries, in that order
    pub entries: Vec<SitemapEntry>,
    /// Fetches that failed and contributed nothing
    pub failed_fetches: Vec<FailedFetch>,
}

impl GatheredEntries {
    /// All entries, collection entry first
    pub fn iter(&self) -> impl Iterator<Item = &SitemapEntry> {
        std::iter::once(&self.collection_entry).chain(self.entries.iter())
    }
}

/// Result of writing one collection's sitemap
#[derive(Debug)]
pub struct CollectionOutcome {
    pub slug: String,
    pub result: Result<WrittenSitemap, SitemapError>,
    pub failed_fetches: Vec<FailedFetch>,
}

/// Builds the collection's own entry
pub fn collection_entry(ctx: &RunContext, collection: &Collection) -> SitemapEntry {
    let (frequency, priority) = COLLECTION_POLICY;
    SitemapEntry::new(
        collection.public_url(&ctx.collection_base_url),
        frequency,
        priority,
        ctx.lastmod,
    )
}

/// Maps one sub-resource record to its sitemap entry
///
/// `parent` is the `{id}/{slug}` path of the owning collection.
pub fn record_entry(
    ctx: &RunContext,
    parent: &str,
    kind: ResourceKind,
    record: &SubResourceRecord,
) -> SitemapEntry {
    let mut loc = format!(
        "{}{}/{}/{}",
        ctx.collection_base_url,
        parent,
        kind.path(),
        record.id
    );
    if kind != ResourceKind::Item {
        if let Some(slug) = record.slug.as_deref().filter(|s| !s.is_empty()) {
            loc.push('/');
            loc.push_str(slug);
        }
    }

    let (frequency, priority) = resource_policy(kind);
    let entry = SitemapEntry::new(loc, frequency, priority, ctx.lastmod);

    match (kind, record.image_url()) {
        (ResourceKind::Item, Some(image)) => entry.with_image(image),
        _ => entry,
    }
}

/// Fetches one sub-resource listing and maps it to entries
async fn resource_entries(
    ctx: &RunContext,
    collection: &Collection,
    kind: ResourceKind,
) -> Result<Vec<SitemapEntry>, SitemapError> {
    let listing = ctx.api.fetch_listing(collection, kind).await?;

    // Parent id/slug come from the listing, falling back to the collection
    let parent = format!(
        "{}/{}",
        listing.id.clone().unwrap_or_else(|| collection.id.clone()),
        listing.slug.clone().unwrap_or_else(|| collection.slug.clone())
    );

    // Undecodable records are logged by the decoder and left out
    Ok(listing
        .into_records(kind, &collection.resource_url(kind))
        .records
        .iter()
        .map(|record| record_entry(ctx, &parent, kind, record))
        .collect())
}

/// Fetches the collection configuration and maps it to about/search entries
async fn config_entries(
    ctx: &RunContext,
    collection: &Collection,
    url: &str,
) -> Result<Vec<SitemapEntry>, SitemapError> {
    let config = ctx.api.fetch_config(url).await?;
    let base = collection.public_url(&ctx.collection_base_url);

    let mut entries = Vec::new();
    if config.has_about_page() {
        let (frequency, priority) = ABOUT_POLICY;
        entries.push(SitemapEntry::new(
            format!("{}/about", base),
            frequency,
            priority,
            ctx.lastmod,
        ));
    }
    if config.enable_browse() {
        let (frequency, priority) = SEARCH_POLICY;
        entries.push(SitemapEntry::new(
            format!("{}/search", base),
            frequency,
            priority,
            ctx.lastmod,
        ));
    }
    Ok(entries)
}

/// Converts a fetch result into entries, recording a failure as empty
fn settle(
    collection: &Collection,
    url: String,
    result: Result<Vec<SitemapEntry>, SitemapError>,
    failures: &mut Vec<FailedFetch>,
) -> Vec<SitemapEntry> {
    match result {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Fetch failed for {} ({}): {}", url, collection.slug, e);
            failures.push(FailedFetch {
                collection: collection.slug.clone(),
                url,
                error: e.to_string(),
            });
            Vec::new()
        }
    }
}

/// Gathers every entry of a collection
///
/// The four fetches run concurrently and are all awaited before returning,
/// whatever their outcome.
pub async fn gather_entries(ctx: &RunContext, collection: &Collection) -> GatheredEntries {
    let config_url = collection.metadata_configuration.clone();

    let config_fetch = async {
        match config_url.as_deref() {
            Some(url) => config_entries(ctx, collection, url).await,
            None => Ok(Vec::new()),
        }
    };

    let (config, pages, showcases, items) = tokio::join!(
        config_fetch,
        resource_entries(ctx, collection, ResourceKind::Page),
        resource_entries(ctx, collection, ResourceKind::Showcase),
        resource_entries(ctx, collection, ResourceKind::Item),
    );

    let mut failed_fetches = Vec::new();
    let mut entries = settle(
        collection,
        config_url.unwrap_or_default(),
        config,
        &mut failed_fetches,
    );
    for (kind, result) in ResourceKind::ALL.into_iter().zip([pages, showcases, items]) {
        entries.extend(settle(
            collection,
            collection.resource_url(kind),
            result,
            &mut failed_fetches,
        ));
    }

    GatheredEntries {
        collection_entry: collection_entry(ctx, collection),
        entries,
        failed_fetches,
    }
}

/// Writes the sitemap document of one collection into `dir`
///
/// The header and the collection's own entry are written before any
/// sub-resource is fetched; the footer only after all fetches settled.
pub async fn write_collection(
    ctx: &RunContext,
    collection: &Collection,
    dir: &Path,
) -> CollectionOutcome {
    let path = dir.join(sitemap_file_name(&collection.slug));
    let mut failed_fetches = Vec::new();
    let result = write_document(ctx, collection, &path, &mut failed_fetches).await;

    CollectionOutcome {
        slug: collection.slug.clone(),
        result,
        failed_fetches,
    }
}

async fn write_document(
    ctx: &RunContext,
    collection: &Collection,
    path: &Path,
    failed_fetches: &mut Vec<FailedFetch>,
) -> Result<WrittenSitemap, SitemapError> {
    let mut document = SitemapDocument::create(path).await?;
    if let Err(e) = document.append(&collection_entry(ctx, collection)).await {
        document.abandon().await;
        return Err(e);
    }

    let gathered = gather_entries(ctx, collection).await;
    *failed_fetches = gathered.failed_fetches;

    if let Err(e) = document.append_all(&gathered.entries).await {
        document.abandon().await;
        return Err(e);
    }
    document.seal().await
}
