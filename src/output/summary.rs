//! Run summary
//!
//! Tracks what happened to every collection during a run so that partial
//! failures are reported instead of only scrolling past in the log.

use crate::honeycomb::InvalidRecord;
use std::fmt;

/// A sub-resource fetch that failed and was treated as empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFetch {
    /// Slug of the collection the fetch belonged to
    pub collection: String,
    /// The URL that failed
    pub url: String,
    /// Error description
    pub error: String,
}

/// A collection whose sitemap could not be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedCollection {
    pub collection: String,
    pub error: String,
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// File names of sealed sitemaps, in completion order
    pub written: Vec<String>,

    /// Slugs of collections skipped because robots.txt disallows them
    pub skipped: Vec<String>,

    /// Collections whose sitemap could not be written
    pub failed: Vec<FailedCollection>,

    /// Entries of the collection list that could not be decoded
    pub invalid_collections: Vec<InvalidRecord>,

    /// Sub-resource fetches tolerated as empty results
    pub failed_fetches: Vec<FailedFetch>,

    /// Total `<url>` entries written across all sitemaps
    pub total_entries: usize,

    /// Whether robots.txt could not be loaded and filtering was permissive
    pub robots_unavailable: bool,
}

impl RunSummary {
    /// Returns true if every allowed collection was written
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of collections seen
    pub fn total_collections(&self) -> usize {
        self.written.len()
            + self.skipped.len()
            + self.failed.len()
            + self.invalid_collections.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Sitemap Run Summary ===\n")?;
        writeln!(f, "Collections: {}", self.total_collections())?;
        writeln!(f, "  Written: {}", self.written.len())?;
        writeln!(f, "  Skipped (robots.txt): {}", self.skipped.len())?;
        writeln!(f, "  Failed: {}", self.failed.len())?;
        writeln!(f, "  Invalid: {}", self.invalid_collections.len())?;
        writeln!(f, "Entries written: {}", self.total_entries)?;

        if self.robots_unavailable {
            writeln!(f, "\nWarning: robots.txt was unavailable, no collection was filtered")?;
        }

        if !self.skipped.is_empty() {
            writeln!(f, "\nSkipped collections:")?;
            for slug in &self.skipped {
                writeln!(f, "  - {}", slug)?;
            }
        }

        if !self.failed.is_empty() {
            writeln!(f, "\nFailed collections:")?;
            for failure in &self.failed {
                writeln!(f, "  - {}: {}", failure.collection, failure.error)?;
            }
        }

        if !self.invalid_collections.is_empty() {
            writeln!(f, "\nInvalid collection entries:")?;
            for invalid in &self.invalid_collections {
                writeln!(f, "  - #{}: {}", invalid.index, invalid.error)?;
            }
        }

        if !self.failed_fetches.is_empty() {
            writeln!(f, "\nFetches treated as empty ({}):", self.failed_fetches.len())?;
            for failure in &self.failed_fetches {
                writeln!(
                    f,
                    "  - [{}] {}: {}",
                    failure.collection, failure.url, failure.error
                )?;
            }
        }

        Ok(())
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    print!("{}", summary);
}
