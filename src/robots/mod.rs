//! Robots.txt handling module
//!
//! This module provides functionality for fetching and parsing robots.txt, and
//! for deciding whether a collection may appear in the sitemaps.

mod parser;

pub use parser::ParsedRobots;

use crate::config::RobotsConfig;
use crate::honeycomb::fetch_text;
use crate::SitemapError;
use reqwest::Client;

/// Fetches robots.txt from a fixed location
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - Location of the robots.txt document
///
/// # Returns
///
/// * `Ok(ParsedRobots)` - Successfully fetched and parsed robots.txt
/// * `Err(SitemapError::RobotsUnavailable)` - Failed to fetch it
pub async fn fetch_robots(client: &Client, url: &str) -> Result<ParsedRobots, SitemapError> {
    let body = fetch_text(client, url)
        .await
        .map_err(|e| SitemapError::RobotsUnavailable {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    Ok(ParsedRobots::from_content(&body))
}

/// Decides which collections are excluded by robots.txt
#[derive(Debug, Clone)]
pub struct RobotsFilter {
    robots: ParsedRobots,
    user_agent: String,
    unavailable: bool,
}

impl RobotsFilter {
    /// Creates a filter over parsed rules for one crawler user agent
    pub fn new(robots: ParsedRobots, user_agent: impl Into<String>) -> Self {
        Self {
            robots,
            user_agent: user_agent.into(),
            unavailable: false,
        }
    }

    /// A filter that allows everything
    pub fn permissive() -> Self {
        Self::new(ParsedRobots::allow_all(), "*")
    }

    /// Loads the filter described by the configuration
    ///
    /// A robots document that cannot be retrieved does not stop the run:
    /// the failure is logged and the permissive filter is returned.
    pub async fn load(client: &Client, config: &RobotsConfig) -> Self {
        if !config.enabled {
            tracing::info!("Robots.txt filtering disabled");
            return Self::permissive();
        }

        match fetch_robots(client, &config.url).await {
            Ok(robots) => {
                tracing::info!("Loaded robots.txt from {}", config.url);
                Self::new(robots, config.user_agent.clone())
            }
            Err(e) => {
                tracing::warn!("{}; continuing without robots.txt restrictions", e);
                Self {
                    unavailable: true,
                    ..Self::permissive()
                }
            }
        }
    }

    /// Checks if a URL may be listed
    pub fn is_allowed(&self, url: &str) -> bool {
        self.robots.is_allowed(url, &self.user_agent)
    }

    /// Returns true if the filter places no restriction
    pub fn is_permissive(&self) -> bool {
        self.robots.is_permissive()
    }

    /// Returns true if robots.txt was wanted but could not be loaded
    pub fn is_unavailable(&self) -> bool {
        self.unavailable
    }
}
