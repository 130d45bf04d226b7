//! HTTP fetcher implementation
//!
//! This module handles plain request/response fetches, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Error classification into retryable fetch failures

use crate::config::UserAgentConfig;
use crate::fetch::{FetchTimeouts, PageContent, PageFetcher, WaitCondition};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeouts` - Request timeout applied to every fetch
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use catalog_spider::config::UserAgentConfig;
/// use catalog_spider::fetch::{build_http_client, FetchTimeouts};
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "CatalogSpider".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
/// let timeouts = FetchTimeouts {
///     request: Duration::from_secs(30),
///     navigation: Duration::from_secs(10),
/// };
///
/// let client = build_http_client(&config, timeouts).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeouts: FetchTimeouts,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeouts.request)
        .connect_timeout(Duration::from_secs(10).min(timeouts.request))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Lightweight request/response fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a freshly built client
    pub fn new(config: &UserAgentConfig, timeouts: FetchTimeouts) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, timeouts)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    /// Fetches a URL with a single GET request
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | HTTP 2xx | `PageContent` |
    /// | Other status | `FetchError::Status` |
    /// | Timeout | `FetchError::Timeout` |
    /// | Connection / body error | `FetchError::Network` |
    async fn fetch(&self, url: &str, _wait: &WaitCondition) -> Result<PageContent, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(PageContent {
            url: url.to_string(),
            html,
        })
    }
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
