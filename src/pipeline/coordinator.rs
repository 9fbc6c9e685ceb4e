//! Run coordinator - main sitemap orchestration logic
//!
//! This module contains the run that ties everything together:
//! - Recreating the output directory
//! - Loading robots.txt and the collection list
//! - Launching one bounded task per allowed collection
//! - Appending each finished sitemap to the index as it completes
//! - Sealing the index once every collection has settled

use crate::config::Config;
use crate::honeycomb::{build_http_client, Collection, Decoded, HoneycombApi};
use crate::output::{FailedCollection, RunSummary};
use crate::pipeline::collection::{
    gather_entries, write_collection, CollectionOutcome, RunContext,
};
use crate::robots::RobotsFilter;
use crate::sitemap::{
    combine_fragments, sitemap_file_name, write_sitemap, ChangeFrequency, CombinedSitemap,
    SitemapEntry, SitemapIndex, INDEX_FILE_NAME, MISC_FILE_NAME,
};
use crate::{Result, SitemapError};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Main run coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    ctx: Arc<RunContext>,
    robots: RobotsFilter,
    semaphore: Arc<Semaphore>,
}

impl Coordinator {
    /// Creates a coordinator stamped with the current time
    ///
    /// Builds the HTTP client and loads robots.txt. A robots document that
    /// cannot be loaded is not an error (see [`RobotsFilter::load`]).
    pub async fn new(config: Config) -> Result<Self> {
        Self::with_timestamp(config, Utc::now()).await
    }

    /// Creates a coordinator with a fixed `<lastmod>` timestamp
    pub async fn with_timestamp(config: Config, lastmod: DateTime<Utc>) -> Result<Self> {
        let client = build_http_client(&config)?;
        let robots = RobotsFilter::load(&client, &config.robots).await;

        let ctx = RunContext {
            api: HoneycombApi::new(client, config.source.api_base_url.clone()),
            collection_base_url: config.source.collection_base_url.clone(),
            lastmod,
        };

        let semaphore = Arc::new(Semaphore::new(
            config.crawler.max_concurrent_collections as usize,
        ));

        Ok(Self {
            config: Arc::new(config),
            ctx: Arc::new(ctx),
            robots,
            semaphore,
        })
    }

    /// Public URL prefix the sitemap files are served under
    fn sitemap_base_url(&self) -> String {
        format!("{}sitemap/", self.ctx.collection_base_url)
    }

    /// Fetches the collection list and splits off robots-disallowed ones
    ///
    /// Entries of the list that cannot be decoded are recorded in the
    /// summary and left out.
    async fn allowed_collections(&self, summary: &mut RunSummary) -> Result<Vec<Collection>> {
        let Decoded {
            records: collections,
            invalid,
        } = match self.ctx.api.fetch_collections().await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("Could not list collections: {}", e);
                return Err(e);
            }
        };
        tracing::info!("Found {} collections", collections.len());
        summary.invalid_collections = invalid;

        summary.robots_unavailable = self.robots.is_unavailable();

        let mut allowed = Vec::with_capacity(collections.len());
        for collection in collections {
            let url = collection.public_url(&self.ctx.collection_base_url);
            if self.robots.is_allowed(&url) {
                allowed.push(collection);
            } else {
                tracing::info!("Skipped {} (blocked in robots.txt)", collection.slug);
                summary.skipped.push(collection.slug);
            }
        }
        Ok(allowed)
    }

    /// Runs the sitemap pipeline
    ///
    /// Writes `sitemap-misc.xml`, one `sitemap-<slug>.xml` per allowed
    /// collection and `sitemap-index.xml` into the output directory.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The index was sealed; individual collections
    ///   may still have failed (see [`RunSummary::is_complete`])
    /// * `Err(SitemapError)` - The run could not produce a usable index
    pub async fn generate(&self) -> Result<RunSummary> {
        let output_dir = PathBuf::from(&self.config.output.directory);
        recreate_dir(&output_dir).await?;

        self.write_misc(&output_dir).await?;

        let mut summary = RunSummary::default();
        let collections = self.allowed_collections(&mut summary).await?;
        let collections = claim_file_names(collections, &mut summary);

        let mut index = SitemapIndex::create(
            output_dir.join(INDEX_FILE_NAME),
            &self.sitemap_base_url(),
            self.ctx.lastmod,
        )
        .await?;

        let mut tasks = JoinSet::new();
        for collection in collections {
            let ctx = Arc::clone(&self.ctx);
            let semaphore = Arc::clone(&self.semaphore);
            let dir = output_dir.clone();
            tasks.spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail
                let _permit = semaphore.acquire_owned().await;
                write_collection(&ctx, &collection, &dir).await
            });
        }

        if let Err(e) = drain_into_index(&mut tasks, &mut index, &mut summary).await {
            index.abandon().await;
            return Err(e);
        }

        index.seal().await?;
        tracing::info!("Saved file {}", INDEX_FILE_NAME);

        Ok(summary)
    }

    /// Runs the fragment pipeline
    ///
    /// Writes the entries of each allowed collection, without envelope, to
    /// `sitemap-<n>.xml` in the partials directory. `n` counts completed
    /// collections from zero.
    pub async fn generate_partials(&self) -> Result<RunSummary> {
        let partials_dir = PathBuf::from(&self.config.output.partials_directory);
        recreate_dir(&partials_dir).await?;

        let mut summary = RunSummary::default();
        let collections = self.allowed_collections(&mut summary).await?;

        let mut tasks = JoinSet::new();
        for collection in collections {
            let ctx = Arc::clone(&self.ctx);
            let semaphore = Arc::clone(&self.semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let gathered = gather_entries(&ctx, &collection).await;
                (collection.slug, gathered)
            });
        }

        let mut sequence = 0usize;
        while let Some(joined) = tasks.join_next().await {
            let (slug, gathered) = joined?;
            summary.failed_fetches.extend(gathered.failed_fetches.iter().cloned());

            let fragment: String = gathered.iter().map(SitemapEntry::to_xml).collect();
            let entries = gathered.iter().count();
            let file_name = format!("sitemap-{}.xml", sequence);
            let path = partials_dir.join(&file_name);

            match write_fragment(&path, &fragment).await {
                Ok(()) => {
                    sequence += 1;
                    tracing::info!("Saved fragment {} for {}", file_name, slug);
                    summary.total_entries += entries;
                    summary.written.push(file_name);
                }
                Err(e) => {
                    tracing::error!("Failed to write fragment for {}: {}", slug, e);
                    summary.failed.push(FailedCollection {
                        collection: slug,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(summary)
    }

    /// Writes the static sitemap for pages outside any collection
    async fn write_misc(&self, output_dir: &Path) -> Result<()> {
        let entry = SitemapEntry::new(
            self.ctx.collection_base_url.clone(),
            ChangeFrequency::Monthly,
            1.0,
            self.ctx.lastmod,
        );
        write_sitemap(&output_dir.join(MISC_FILE_NAME), &[entry]).await?;
        tracing::info!("Saved file {}", MISC_FILE_NAME);
        Ok(())
    }
}

/// Collects finished collection tasks, referencing each sitemap in the index
///
/// Completion order; each sitemap is sealed before it is referenced.
async fn drain_into_index(
    tasks: &mut JoinSet<CollectionOutcome>,
    index: &mut SitemapIndex,
    summary: &mut RunSummary,
) -> Result<()> {
    while let Some(joined) = tasks.join_next().await {
        let CollectionOutcome {
            slug,
            result,
            failed_fetches,
        } = joined?;
        summary.failed_fetches.extend(failed_fetches);

        match result {
            Ok(written) => {
                index.add(&written).await?;
                tracing::info!(
                    "Saved file {} ({} entries)",
                    written.file_name,
                    written.entries
                );
                summary.total_entries += written.entries;
                summary.written.push(written.file_name);
            }
            Err(e) => {
                tracing::error!("Failed to write sitemap for {}: {}", slug, e);
                summary.failed.push(FailedCollection {
                    collection: slug,
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Gives each collection its own sitemap file name
///
/// A collection whose file name is already taken by an earlier one is
/// reported as failed instead of being written over it.
fn claim_file_names(collections: Vec<Collection>, summary: &mut RunSummary) -> Vec<Collection> {
    let mut taken = HashSet::new();
    let mut claimed = Vec::with_capacity(collections.len());

    for collection in collections {
        let file_name = sitemap_file_name(&collection.slug);
        if taken.insert(file_name.clone()) {
            claimed.push(collection);
        } else {
            tracing::error!(
                "Collection {} ({}) maps to {}, which another collection already uses",
                collection.slug,
                collection.id,
                file_name
            );
            summary.failed.push(FailedCollection {
                collection: collection.slug,
                error: format!("sitemap file name {} is already in use", file_name),
            });
        }
    }
    claimed
}

/// Deletes a directory if present and creates it empty
async fn recreate_dir(dir: &Path) -> Result<()> {
    if tokio::fs::try_exists(dir).await.unwrap_or(false) {
        tokio::fs::remove_dir_all(dir)
            .await
            .map_err(|e| SitemapError::io(dir, e))?;
        tracing::info!("Deleted old directory: {}", dir.display());
    }

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SitemapError::io(dir, e))?;
    tracing::info!("Created new directory: {}", dir.display());
    Ok(())
}

/// Writes a fragment file, never leaving a partial one under its final name
async fn write_fragment(path: &Path, fragment: &str) -> Result<()> {
    let temp_path = path.with_extension("xml.part");
    if let Err(e) = tokio::fs::write(&temp_path, fragment.as_bytes()).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(SitemapError::io(&temp_path, e));
    }
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| SitemapError::io(path, e))
}

/// Runs the sitemap pipeline
///
/// This function orchestrates the entire run:
///
/// 1. Build the HTTP client and load robots.txt
/// 2. Recreate the output directory and write the misc sitemap
/// 3. Fetch the collection list and drop robots-disallowed collections
/// 4. For each collection (bounded concurrency):
///    a. Write the header and the collection entry
///    b. Fetch config, pages, showcases and items concurrently
///    c. Append every entry, write the footer, move the file into place
/// 5. Append each finished sitemap to the index
/// 6. Seal the index
///
/// # Example
///
/// ```no_run
/// use honeycomb_sitemap::config::Config;
/// use honeycomb_sitemap::pipeline::run_generate;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let summary = run_generate(Config::default()).await?;
/// println!("{}", summary);
/// # Ok(())
/// # }
/// ```
pub async fn run_generate(config: Config) -> Result<RunSummary> {
    let coordinator = Coordinator::new(config).await?;
    coordinator.generate().await
}

/// Runs the fragment pipeline (see [`Coordinator::generate_partials`])
pub async fn run_partials(config: Config) -> Result<RunSummary> {
    let coordinator = Coordinator::new(config).await?;
    coordinator.generate_partials().await
}

/// Concatenates the partials directory into the combined sitemap
pub async fn run_combine(config: &Config) -> Result<CombinedSitemap> {
    let result = combine_fragments(
        Path::new(&config.output.partials_directory),
        Path::new(&config.output.combined_path),
    )
    .await;

    if let Err(e) = &result {
        tracing::error!("Failed to combine fragments: {}", e);
    }
    result
}
