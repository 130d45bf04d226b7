//! Fetch strategies: turning a URL into page markup
//!
//! Two interchangeable transports implement [`PageFetcher`]:
//! - [`HttpFetcher`]: a plain request/response fetch over reqwest
//! - `BrowserFetcher`: headless Chromium navigation (cargo feature `browser`)
//!
//! One transport is chosen per spider with [`build_fetcher`]. No caching
//! happens at this layer; resumability is handled by the crawl state.

#[cfg(feature = "browser")]
mod browser;
mod http;

#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;
pub use http::{build_http_client, HttpFetcher};

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::{ConfigError, FetchError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Markup returned by a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// The URL that was requested
    pub url: String,

    /// Raw (or browser-rendered) HTML
    pub html: String,
}

/// Transport selected for a spider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Direct HTTP request/response
    #[default]
    Http,

    /// Headless browser navigation
    Browser,
}

impl FetchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Browser => "browser",
        }
    }
}

/// Condition a browser fetch waits for before capturing markup
///
/// Plain HTTP fetches ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WaitCondition {
    /// Capture as soon as navigation completes
    #[default]
    None,

    /// Wait until an element matching the selector exists
    Selector { selector: String },

    /// Wait until the rendered markup stops growing
    ContentStable {
        #[serde(rename = "interval-ms", default = "default_interval_ms")]
        interval_ms: u64,
    },

    /// Sleep for a fixed duration
    Delay { ms: u64 },

    /// Scroll to the bottom until lazy-loaded content stops growing
    ScrollToBottom {
        #[serde(rename = "interval-ms", default = "default_interval_ms")]
        interval_ms: u64,
    },
}

fn default_interval_ms() -> u64 {
    500
}

/// Capability to fetch renderable page content
///
/// Implementations must enforce their own timeouts: a batch waits for every
/// fetch to settle and has no way to cancel one.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches a URL, honouring the wait condition where the transport can
    async fn fetch(&self, url: &str, wait: &WaitCondition) -> Result<PageContent, FetchError>;

    /// Releases transport resources (browser process, etc.)
    async fn shutdown(&self) {}
}

/// Timeouts applied by the fetchers
#[derive(Debug, Clone, Copy)]
pub struct FetchTimeouts {
    pub request: Duration,
    pub navigation: Duration,
}

impl From<&CrawlerConfig> for FetchTimeouts {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            request: Duration::from_secs(config.request_timeout),
            navigation: Duration::from_secs(config.navigation_timeout),
        }
    }
}

/// Builds the fetcher for a spider's configured transport
///
/// # Returns
///
/// * `Ok(Box<dyn PageFetcher>)` - Ready-to-use fetcher
/// * `Err(ConfigError)` - Transport unavailable in this build or failed to start
pub async fn build_fetcher(
    mode: FetchMode,
    user_agent: &UserAgentConfig,
    timeouts: FetchTimeouts,
) -> Result<Box<dyn PageFetcher>, ConfigError> {
    match mode {
        FetchMode::Http => {
            let fetcher = HttpFetcher::new(user_agent, timeouts).map_err(|e| {
                ConfigError::Validation(format!("Failed to build HTTP client: {}", e))
            })?;
            Ok(Box::new(fetcher))
        }
        #[cfg(feature = "browser")]
        FetchMode::Browser => {
            let fetcher = BrowserFetcher::launch(user_agent, timeouts)
                .await
                .map_err(|e| ConfigError::Validation(format!("Failed to launch browser: {}", e)))?;
            Ok(Box::new(fetcher))
        }
        #[cfg(not(feature = "browser"))]
        FetchMode::Browser => Err(ConfigError::UnsupportedFetchMode(
            mode.as_str().to_string(),
        )),
    }
}
