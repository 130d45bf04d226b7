use crate::fetch::{FetchMode, WaitCondition};
use serde::Deserialize;

/// Main configuration structure for Catalog-Spider
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default, rename = "spider")]
    pub spiders: Vec<SpiderConfig>,
}

impl Config {
    /// Looks up a spider by name
    pub fn spider(&self, name: &str) -> Option<&SpiderConfig> {
        self.spiders.iter().find(|s| s.name == name)
    }
}

/// Crawler behavior configuration shared by every spider
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of concurrent fetch+extract operations per batch
    #[serde(rename = "batch-limit")]
    pub batch_limit: u32,

    /// Root directory holding one state directory per spider
    #[serde(rename = "state-dir")]
    pub state_dir: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Upper bound for browser wait conditions (seconds)
    #[serde(rename = "navigation-timeout", default = "default_navigation_timeout")]
    pub navigation_timeout: u64,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_navigation_timeout() -> u64 {
    10
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
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
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// One catalog site
#[derive(Debug, Clone, Deserialize)]
pub struct SpiderConfig {
    /// Unique spider name; also the name of its state directory
    pub name: String,

    /// Transport used for every fetch made by this spider
    #[serde(rename = "fetch-mode", default)]
    pub fetch_mode: FetchMode,

    /// Overrides `crawler.batch-limit` for this spider
    #[serde(rename = "batch-limit", default)]
    pub batch_limit: Option<u32>,

    /// Listing groups, each sharing one strategy
    #[serde(default, rename = "listing")]
    pub listings: Vec<ListingConfig>,
}

impl SpiderConfig {
    /// Returns the effective batch limit for this spider
    pub fn effective_batch_limit(&self, crawler: &CrawlerConfig) -> usize {
        self.batch_limit.unwrap_or(crawler.batch_limit) as usize
    }

    /// All listing URLs of this spider, in configuration order
    pub fn listing_urls(&self) -> impl Iterator<Item = &str> {
        self.listings
            .iter()
            .flat_map(|l| l.urls.iter().map(String::as_str))
    }
}

/// A set of listing URLs that share discovery and content rules
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// Listing URLs (seed pages enumerating product links)
    pub urls: Vec<String>,

    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub content: ContentConfig,
}

/// How product links are found on a listing page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiscoveryConfig {
    /// CSS selector matching the product anchors
    pub link_selector: String,

    /// Prefix joined with relative links instead of the listing URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Keep only links containing this substring
    #[serde(default)]
    pub url_contains: Option<String>,

    /// Query parameter carrying the page number
    #[serde(default)]
    pub page_param: Option<String>,

    /// Upper bound on paginated listing pages
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default)]
    pub wait_for: WaitCondition,
}

fn default_max_pages() -> u32 {
    50
}

/// How a product page is turned into a record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContentConfig {
    #[serde(default)]
    pub wait_for: WaitCondition,

    /// Brand used when the page declares none
    #[serde(default)]
    pub brand: Option<String>,

    /// Derive categories from the URL path segments following this prefix
    #[serde(default)]
    pub category_path_prefix: Option<String>,

    /// Selector for extra product images outside the structured block
    #[serde(default)]
    pub image_selector: Option<String>,

    /// Attribute holding the image URL (defaults to `src`)
    #[serde(default)]
    pub image_attr: Option<String>,
}
