//! Pipeline module for sitemap generation
//!
//! This module contains the run logic, including:
//! - Per-collection fetch fan-out and entry mapping
//! - Bounded scheduling of collection tasks
//! - Index sealing once every collection has settled
//! - The fragment and combine variants of the run

mod collection;
mod coordinator;

pub use collection::{
    collection_entry, gather_entries, record_entry, resource_policy, write_collection,
    CollectionOutcome, GatheredEntries, RunContext, ABOUT_POLICY, COLLECTION_POLICY,
    SEARCH_POLICY,
};
pub use coordinator::{run_combine, run_generate, run_partials, Coordinator};
