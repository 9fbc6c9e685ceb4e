//! `<url>` entry formatting
//!
//! Entries are rendered as plain text fragments so they can be streamed into
//! a per-collection document, a fragment file, or a combined sitemap alike.

use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use quick_xml::escape::escape;
use std::fmt;

/// Characters left untouched when encoding an image location.
///
/// Alphanumerics plus the unreserved marks and the reserved characters that
/// carry URI structure. Everything else, `%` included, is escaped.
const IMAGE_URL: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'#');

/// Sitemap `<changefreq>` hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeFrequency {
    Always,
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFrequency {
    /// Returns the value as written in the sitemap schema
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One crawlable page in a sitemap
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    /// Absolute page URL
    pub loc: String,

    /// Update cadence hint
    pub change_frequency: ChangeFrequency,

    /// Relative importance, 0.0 to 1.0
    pub priority: f32,

    /// Last-modified stamp (the run's start time)
    pub lastmod: DateTime<Utc>,

    /// Raw (unencoded) image URL, if the page shows an image
    pub image: Option<String>,
}

impl SitemapEntry {
    /// Creates an entry without an image
    pub fn new(
        loc: impl Into<String>,
        change_frequency: ChangeFrequency,
        priority: f32,
        lastmod: DateTime<Utc>,
    ) -> Self {
        Self {
            loc: loc.into(),
            change_frequency,
            priority: priority.clamp(0.0, 1.0),
            lastmod,
            image: None,
        }
    }

    /// Attaches an image URL to the entry
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Renders the entry as a `<url>` fragment
    pub fn to_xml(&self) -> String {
        let image_markup = match &self.image {
            Some(image) => format!(
                "\r\n    <image:image><image:loc>{}</image:loc></image:image>",
                escape(encode_image_url(image).as_str())
            ),
            None => String::new(),
        };

        format!(
            "  <url>\r\n    <loc>{}</loc>\r\n    <changefreq>{}</changefreq><priority>{:.1}</priority><lastmod>{}</lastmod>{}\r\n  </url>\r\n",
            escape(self.loc.as_str()),
            self.change_frequency,
            self.priority,
            format_lastmod(&self.lastmod),
            image_markup
        )
    }
}

/// Formats a timestamp the way sitemap `<lastmod>` values are written
///
/// RFC 3339, UTC, millisecond precision, `Z` suffix
/// (e.g. `2024-03-01T12:00:00.000Z`).
pub fn format_lastmod(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Percent-encodes an image URL, leaving its structural characters intact
pub fn encode_image_url(raw: &str) -> String {
    utf8_percent_encode(raw, IMAGE_URL).to_string()
}
