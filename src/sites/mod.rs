//! Site strategies keyed by listing URL
//!
//! Every site is a configuration value rather than a type: a listing URL
//! maps to one [`ListingStrategy`] providing discovery (listing page to
//! content URLs) and content scraping (content page to record).

mod configured;

pub use configured::ConfiguredStrategy;

use crate::config::SpiderConfig;
use crate::fetch::PageFetcher;
use crate::state::ScrapedRecord;
use crate::ConfigResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Discovery and content strategy pair for a listing group
#[async_trait]
pub trait ListingStrategy: Send + Sync {
    /// Produces the content URLs enumerated by a listing URL
    async fn discover(
        &self,
        listing_url: &str,
        fetcher: &dyn PageFetcher,
    ) -> crate::Result<Vec<String>>;

    /// Fetches a content URL and turns it into a record
    ///
    /// Fetch and extraction failures are per-URL errors; the scheduler
    /// leaves the URL unscraped and moves on.
    async fn scrape(
        &self,
        content_url: &str,
        fetcher: &dyn PageFetcher,
    ) -> crate::Result<ScrapedRecord>;
}

/// Listing URL -> strategy, in registration order
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    entries: Vec<(String, Arc<dyn ListingStrategy>)>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a strategy, replacing any previous one for the same URL
    pub fn register(&mut self, listing_url: impl Into<String>, strategy: Arc<dyn ListingStrategy>) {
        let listing_url = listing_url.into();
        match self.entries.iter_mut().find(|(url, _)| *url == listing_url) {
            Some(entry) => entry.1 = strategy,
            None => self.entries.push((listing_url, strategy)),
        }
    }

    /// Looks up the strategy for a listing URL
    pub fn get(&self, listing_url: &str) -> Option<Arc<dyn ListingStrategy>> {
        self.entries
            .iter()
            .find(|(url, _)| url == listing_url)
            .map(|(_, strategy)| Arc::clone(strategy))
    }

    /// Registered listing URLs in registration order
    pub fn listing_urls(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(url, _)| url.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("listing_urls", &self.listing_urls().collect::<Vec<_>>())
            .finish()
    }
}

/// Builds the registry for a spider from its listing entries
///
/// All URLs of one `[[spider.listing]]` entry share a single strategy.
pub fn registry_from_config(spider: &SpiderConfig) -> ConfigResult<StrategyRegistry> {
    let mut registry = StrategyRegistry::new();

    for listing in &spider.listings {
        let strategy: Arc<dyn ListingStrategy> = Arc::new(ConfiguredStrategy::from_config(listing)?);
        for url in &listing.urls {
            registry.register(url.clone(), Arc::clone(&strategy));
        }
    }

    tracing::debug!(
        "Registered {} listing URLs for spider '{}'",
        registry.len(),
        spider.name
    );

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    const CONFIG: &str = r#"
[crawler]
batch-limit = 4
state-dir = "./state"

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[[spider]]
name = "acme"

[[spider.listing]]
urls = ["https://acme.test/benches", "https://acme.test/racks"]
[spider.listing.discovery]
link-selector = "a.card"

[[spider.listing]]
urls = ["https://acme.test/bikes"]
[spider.listing.discovery]
link-selector = "a.tile"
"#;

    #[test]
    fn test_registry_from_config() {
        let config = parse_config(CONFIG).unwrap();
        let registry = registry_from_config(&config.spiders[0]).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.listing_urls().collect::<Vec<_>>(),
            vec![
                "https://acme.test/benches",
                "https://acme.test/racks",
                "https://acme.test/bikes"
            ]
        );

        let benches = registry.get("https://acme.test/benches").unwrap();
        let racks = registry.get("https://acme.test/racks").unwrap();
        assert!(Arc::ptr_eq(&benches, &racks));
        assert!(registry.get("https://acme.test/unknown").is_none());
    }

    #[test]
    fn test_register_replaces_existing() {
        let config = parse_config(CONFIG).unwrap();
        let mut registry = registry_from_config(&config.spiders[0]).unwrap();
        let bikes = registry.get("https://acme.test/bikes").unwrap();

        registry.register("https://acme.test/benches", Arc::clone(&bikes));

        assert_eq!(registry.len(), 3);
        assert!(Arc::ptr_eq(
            &registry.get("https://acme.test/benches").unwrap(),
            &bikes
        ));
    }
}
