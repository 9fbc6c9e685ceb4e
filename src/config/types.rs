use serde::Deserialize;

/// Main configuration structure for Honeycomb-Sitemap
///
/// Every section has defaults, so an empty file (or no file at all) yields
/// a configuration that targets the production collections site.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub robots: RobotsConfig,
    pub output: OutputConfig,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Where collection data comes from and where its public pages live
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the collections API (must end with '/')
    #[serde(rename = "api-base-url")]
    pub api_base_url: String,

    /// Base URL of the public collections site (must end with '/')
    #[serde(rename = "collection-base-url")]
    pub collection_base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://honeycomb.library.nd.edu/".to_string(),
            collection_base_url: "https://collections.library.nd.edu/".to_string(),
        }
    }
}

/// Robots.txt filtering configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RobotsConfig {
    /// Whether collections are checked against robots.txt at all
    pub enabled: bool,

    /// Location of the robots.txt document
    pub url: String,

    /// Crawler user agent the rules are evaluated for
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://raw.githubusercontent.com/ndlib/beehive/master/public/robots.txt"
                .to_string(),
            user_agent: "Googlebot".to_string(),
        }
    }
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the index and per-collection sitemaps
    pub directory: String,

    /// Directory receiving numbered fragment files
    #[serde(rename = "partials-directory")]
    pub partials_directory: String,

    /// Combined sitemap produced from the fragment files
    #[serde(rename = "combined-path")]
    pub combined_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "sitemap".to_string(),
            partials_directory: "partials".to_string(),
            combined_path: "sitemap.xml".to_string(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of collections processed at the same time
    #[serde(rename = "max-concurrent-collections")]
    pub max_concurrent_collections: u32,

    /// Total timeout for a single request (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Connect timeout for a single request (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_collections: 4,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "HoneycombSitemap".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://collections.library.nd.edu/".to_string(),
            contact_email: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the HTTP user agent string
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`, with the
    /// email part omitted when none is configured.
    pub fn header_value(&self) -> String {
        match &self.contact_email {
            Some(email) => format!(
                "{}/{} (+{}; {})",
                self.crawler_name, self.crawler_version, self.contact_url, email
            ),
            None => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, self.contact_url
            ),
        }
    }
}
