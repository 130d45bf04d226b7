//! Instrumented fetchers and strategies shared by the crawler tests

use crate::fetch::{PageContent, PageFetcher, WaitCondition};
use crate::sites::{ListingStrategy, StrategyRegistry};
use crate::state::ScrapedRecord;
use crate::{ConfigError, FetchError, SpiderError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Echoes the URL back as markup and records peak concurrency
#[derive(Default)]
pub struct TrackingFetcher {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl TrackingFetcher {
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for TrackingFetcher {
    async fn fetch(&self, url: &str, _wait: &WaitCondition) -> Result<PageContent, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(5)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(PageContent {
            url: url.to_string(),
            html: url.to_string(),
        })
    }
}

/// Strategy with canned discovery results and one record per content URL
#[derive(Default)]
pub struct StubStrategy {
    links: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    fatal: HashSet<String>,
    broken_listings: HashSet<String>,
    discover_calls: AtomicUsize,
    scrape_calls: AtomicUsize,
}

impl StubStrategy {
    pub fn with_links(mut self, listing_url: &str, content_urls: &[&str]) -> Self {
        self.links.insert(
            listing_url.to_string(),
            content_urls.iter().map(|u| u.to_string()).collect(),
        );
        self
    }

    /// Scraping this URL fails with a per-URL fetch error
    pub fn failing(mut self, content_url: &str) -> Self {
        self.failing.insert(content_url.to_string());
        self
    }

    /// Scraping this URL fails with a run-ending error
    pub fn fatal(mut self, content_url: &str) -> Self {
        self.fatal.insert(content_url.to_string());
        self
    }

    /// Discovery of this listing URL fails
    pub fn broken_listing(mut self, listing_url: &str) -> Self {
        self.broken_listings.insert(listing_url.to_string());
        self
    }

    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub fn scrape_calls(&self) -> usize {
        self.scrape_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingStrategy for StubStrategy {
    async fn discover(
        &self,
        listing_url: &str,
        fetcher: &dyn PageFetcher,
    ) -> crate::Result<Vec<String>> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        fetcher.fetch(listing_url, &WaitCondition::None).await?;

        if self.broken_listings.contains(listing_url) {
            return Err(FetchError::Timeout {
                url: listing_url.to_string(),
            }
            .into());
        }

        Ok(self.links.get(listing_url).cloned().unwrap_or_default())
    }

    async fn scrape(
        &self,
        content_url: &str,
        fetcher: &dyn PageFetcher,
    ) -> crate::Result<ScrapedRecord> {
        self.scrape_calls.fetch_add(1, Ordering::SeqCst);
        let page = fetcher.fetch(content_url, &WaitCondition::None).await?;

        if self.failing.contains(content_url) {
            return Err(FetchError::Network {
                url: content_url.to_string(),
                message: "connection reset".to_string(),
            }
            .into());
        }
        if self.fatal.contains(content_url) {
            return Err(SpiderError::Config(ConfigError::Validation(
                "strategy misconfigured".to_string(),
            )));
        }

        Ok(ScrapedRecord::new(page.html))
    }
}

/// Registers one strategy under every listing URL
pub fn registry_for(listing_urls: &[&str], strategy: Arc<StubStrategy>) -> StrategyRegistry {
    let mut registry = StrategyRegistry::new();
    for url in listing_urls {
        registry.register(*url, strategy.clone() as Arc<dyn ListingStrategy>);
    }
    registry
}
