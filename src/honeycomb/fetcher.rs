//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made during a run, including:
//! - Building the HTTP client with a proper user agent string and timeouts
//! - GET requests for text and JSON bodies
//! - Error classification (network, status, malformed body)

use crate::config::Config;
use crate::{Result, SitemapError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The run configuration (user agent and timeouts)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use honeycomb_sitemap::config::Config;
/// use honeycomb_sitemap::honeycomb::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(Duration::from_secs(config.crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.crawler.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and returns its body as text
///
/// | Condition | Error |
/// |-----------|-------|
/// | Connection refused, timeout, TLS failure | `SitemapError::Fetch` |
/// | Non-2xx status | `SitemapError::Status` |
/// | Body cannot be read | `SitemapError::Fetch` |
pub async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| SitemapError::Fetch {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SitemapError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|source| SitemapError::Fetch {
        url: url.to_string(),
        source,
    })
}

/// Fetches a URL and decodes its body as JSON
///
/// Malformed bodies yield `SitemapError::Parse` carrying the URL.
pub async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    let body = fetch_text(client, url).await?;
    serde_json::from_str(&body).map_err(|source| SitemapError::Parse {
        url: url.to_string(),
        source,
    })
}
