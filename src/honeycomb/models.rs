//! Response types of the collections API

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Media type marking an item's media as an image
pub const IMAGE_OBJECT: &str = "ImageObject";

/// A top-level collection, as listed by `GET /v1/collections`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Collection {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    pub slug: String,

    /// API reference of the collection; sub-resources hang off it
    #[serde(rename = "@id")]
    pub api_url: String,

    /// API reference of the collection's metadata configuration
    #[serde(rename = "hasPart/metadataConfiguration", default)]
    pub metadata_configuration: Option<String>,
}

impl Collection {
    /// Site-relative path of the collection, `{id}/{slug}`
    pub fn path(&self) -> String {
        format!("{}/{}", self.id, self.slug)
    }

    /// Public URL of the collection under the site base URL
    pub fn public_url(&self, collection_base_url: &str) -> String {
        format!("{}{}", collection_base_url, self.path())
    }

    /// API URL of one of the collection's sub-resources
    pub fn resource_url(&self, kind: ResourceKind) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), kind.path())
    }
}

/// The sub-resources listed under a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Page,
    Showcase,
    Item,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [Self::Page, Self::Showcase, Self::Item];

    /// Path segment used both by the API and by the public site
    pub fn path(&self) -> &'static str {
        match self {
            Self::Page => "pages",
            Self::Showcase => "showcases",
            Self::Item => "items",
        }
    }
}

/// An array element skipped because it could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRecord {
    /// URL the array was fetched from
    pub url: String,
    /// Position of the element in the array
    pub index: usize,
    pub error: String,
}

/// Records decoded one element at a time from a JSON array
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    /// Elements that decoded, in source order
    pub records: Vec<T>,
    pub invalid: Vec<InvalidRecord>,
}

/// Decodes every element of an array on its own
///
/// An element that does not decode is logged and skipped; its siblings are
/// kept.
pub fn decode_each<T: DeserializeOwned>(values: Vec<Value>, url: &str) -> Decoded<T> {
    let mut records = Vec::with_capacity(values.len());
    let mut invalid = Vec::new();

    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Skipping record {} from {}: {}", index, url, e);
                invalid.push(InvalidRecord {
                    url: url.to_string(),
                    index,
                    error: e.to_string(),
                });
            }
        }
    }

    Decoded { records, invalid }
}

/// Body of `GET {collection}/pages|showcases|items`
///
/// Only the array matching the requested kind is populated. Its elements
/// stay raw until [`Listing::into_records`] so one bad record does not
/// discard the whole listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Listing {
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub id: Option<String>,

    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pages: Vec<Value>,

    #[serde(default)]
    showcases: Vec<Value>,

    #[serde(default)]
    items: Vec<Value>,
}

impl Listing {
    /// Decodes the records of the given kind, in source order
    ///
    /// `url` is where the listing came from, for reporting skipped records.
    pub fn into_records(self, kind: ResourceKind, url: &str) -> Decoded<SubResourceRecord> {
        let values = match kind {
            ResourceKind::Page => self.pages,
            ResourceKind::Showcase => self.showcases,
            ResourceKind::Item => self.items,
        };
        decode_each(values, url)
    }
}

/// A page, showcase or item
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubResourceRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub media: Option<Media>,
}

impl SubResourceRecord {
    /// The record's image URL, if its media is an image
    pub fn image_url(&self) -> Option<&str> {
        let media = self.media.as_ref()?;
        match (&media.url, &media.media_type) {
            (Some(url), Some(media_type)) if media_type == IMAGE_OBJECT && !url.is_empty() => {
                Some(url.as_str())
            }
            _ => None,
        }
    }
}

/// Media attached to an item
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Media {
    #[serde(rename = "@id", default)]
    pub url: Option<String>,

    #[serde(rename = "@type", default)]
    pub media_type: Option<String>,
}

/// Body of a collection's metadata configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct CollectionConfig {
    #[serde(rename = "hasAboutPage", default)]
    has_about_page: Option<bool>,

    #[serde(rename = "enableBrowse", default)]
    enable_browse: Option<bool>,
}

impl CollectionConfig {
    pub fn has_about_page(&self) -> bool {
        self.has_about_page.unwrap_or(false)
    }

    pub fn enable_browse(&self) -> bool {
        self.enable_browse.unwrap_or(false)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Id {
    Text(String),
    Number(serde_json::Number),
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        match id {
            Id::Text(s) => s,
            Id::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Id::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Id>::deserialize(deserializer).map(|id| id.map(String::from))
}
