//! Output module for run reporting
//!
//! This module handles:
//! - Recording which collections were written, skipped or failed
//! - Recording sub-resource fetches tolerated as empty results
//! - Printing the end-of-run summary

pub mod summary;

pub use summary::{print_summary, FailedCollection, FailedFetch, RunSummary};
