//! Collections API module
//!
//! This module wraps the read-only honeycomb API:
//! - Listing collections
//! - Listing a collection's pages, showcases and items
//! - Reading a collection's metadata configuration

mod fetcher;
mod models;

pub use fetcher::{build_http_client, fetch_json, fetch_text};
pub use models::{
    decode_each, Collection, CollectionConfig, Decoded, InvalidRecord, Listing, Media,
    ResourceKind, SubResourceRecord, IMAGE_OBJECT,
};

use crate::Result;
use reqwest::Client;
use serde_json::Value;

/// Client for the collections API
#[derive(Debug, Clone)]
pub struct HoneycombApi {
    client: Client,
    /// API base URL (ends with '/')
    base_url: String,
}

impl HoneycombApi {
    /// Creates an API client rooted at `base_url`
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// URL of the collection list
    pub fn collections_url(&self) -> String {
        format!("{}v1/collections", self.base_url)
    }

    /// Fetches every collection
    ///
    /// # Returns
    ///
    /// * `Ok(Decoded<Collection>)` - Collections in source order, plus the
    ///   entries that could not be decoded
    /// * `Err(SitemapError)` - Network or status failure, or a body that is
    ///   not a JSON array
    pub async fn fetch_collections(&self) -> Result<Decoded<Collection>> {
        let url = self.collections_url();
        let values: Vec<Value> = fetch_json(&self.client, &url).await?;
        Ok(decode_each(values, &url))
    }

    /// Fetches one sub-resource listing of a collection
    pub async fn fetch_listing(&self, collection: &Collection, kind: ResourceKind) -> Result<Listing> {
        fetch_json(&self.client, &collection.resource_url(kind)).await
    }

    /// Fetches a collection's metadata configuration
    pub async fn fetch_config(&self, url: &str) -> Result<CollectionConfig> {
        fetch_json(&self.client, url).await
    }
}
