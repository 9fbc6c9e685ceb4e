//! Honeycomb-Sitemap: sitemap generator for the honeycomb collections API
//!
//! This crate crawls the collections API, filters collections against
//! robots.txt, and writes one urlset sitemap per collection plus a sitemap
//! index. A second pipeline concatenates fragment files into one sitemap.

pub mod config;
pub mod honeycomb;
pub mod output;
pub mod pipeline;
pub mod robots;
pub mod sitemap;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Honeycomb-Sitemap operations
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Malformed JSON from {url}: {source}")]
    Parse {
        url: String,
        source: serde_json::Error,
    },

    #[error("Robots.txt unavailable at {url}: {reason}")]
    RobotsUnavailable { url: String, reason: String },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SitemapError {
    /// Wraps an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Honeycomb-Sitemap operations
pub type Result<T> = std::result::Result<T, SitemapError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use output::RunSummary;
pub use sitemap::{ChangeFrequency, SitemapEntry};
