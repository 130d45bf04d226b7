//! Crawler coordinator - per-spider crawl orchestration
//!
//! This module drives one spider through its phases:
//! - Loading persisted state (or starting empty)
//! - Discovering listing groups when none are cached
//! - Draining unscraped content URLs through the batch scheduler
//! - Reporting a typed result

use crate::crawler::scheduler::BatchScheduler;
use crate::crawler::CrawlResult;
use crate::fetch::PageFetcher;
use crate::sites::StrategyRegistry;
use crate::state::{dedup_preserving_order, CrawlPhase, CrawlState};
use crate::storage::StateStore;
use crate::{Result, SpiderError};
use futures::future::join_all;
use std::time::Instant;

/// Orchestrates a single crawl run for one spider
pub struct Coordinator {
    phase: CrawlPhase,
    state: CrawlState,
    batch_limit: usize,
    registry: StrategyRegistry,
    store: Box<dyn StateStore>,
    new_record_count: usize,
}

impl Coordinator {
    /// Creates a coordinator, loading the spider's persisted state
    ///
    /// # Arguments
    ///
    /// * `spider_name` - Name scoping the persisted state
    /// * `batch_limit` - Maximum concurrent scrapes per batch
    /// * `registry` - Strategies keyed by listing URL
    /// * `store` - State backend
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run, in the `Idle` phase
    /// * `Err(SpiderError)` - Persisted state could not be read
    pub fn new(
        spider_name: &str,
        batch_limit: usize,
        registry: StrategyRegistry,
        store: Box<dyn StateStore>,
    ) -> Result<Self> {
        let state = store.load(spider_name)?;

        tracing::info!(
            "Loaded state for spider '{}': {} listing groups, {} content URLs, {} scraped, {} records",
            spider_name,
            state.listing_groups.len(),
            state.discovered_url_count(),
            state.scraped_urls.len(),
            state.records.len()
        );

        Ok(Self {
            phase: CrawlPhase::Idle,
            state,
            batch_limit,
            registry,
            store,
            new_record_count: 0,
        })
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Runs every remaining phase until `Done`
    pub async fn run(&mut self, fetcher: &dyn PageFetcher) -> Result<CrawlResult> {
        let start_time = Instant::now();
        tracing::info!("Starting crawl for spider '{}'", self.state.spider_name);

        while !self.phase.is_terminal() {
            self.advance(fetcher).await?;
        }

        let result = self.result();
        tracing::info!(
            "Crawl for spider '{}' finished in {:.2}s: {} records ({} new), {} URLs pending",
            self.state.spider_name,
            start_time.elapsed().as_secs_f64(),
            result.record_count,
            result.new_record_count,
            result.pending_url_count
        );

        Ok(result)
    }

    /// Performs the work of the current phase and moves to the next one
    ///
    /// # Returns
    ///
    /// The phase entered
    pub async fn advance(&mut self, fetcher: &dyn PageFetcher) -> Result<CrawlPhase> {
        match self.phase {
            CrawlPhase::Idle => {
                if self.state.has_listing_groups() {
                    tracing::info!(
                        "Using {} cached listing groups, skipping discovery",
                        self.state.listing_groups.len()
                    );
                    self.transition(CrawlPhase::ScrapingContent)?;
                } else {
                    self.transition(CrawlPhase::DiscoveringListings)?;
                }
            }
            CrawlPhase::DiscoveringListings => {
                self.discover_listings(fetcher).await?;
                self.transition(CrawlPhase::ScrapingContent)?;
            }
            CrawlPhase::ScrapingContent => {
                self.scrape_content(fetcher).await?;
                self.transition(CrawlPhase::Done)?;
            }
            CrawlPhase::Done => {}
        }

        Ok(self.phase)
    }

    /// Snapshot of the run so far
    pub fn result(&self) -> CrawlResult {
        CrawlResult {
            spider_name: self.state.spider_name.clone(),
            record_count: self.state.records.len(),
            new_record_count: self.new_record_count,
            pending_url_count: self.state.pending_url_count(),
        }
    }

    fn transition(&mut self, to: CrawlPhase) -> Result<()> {
        if !self.phase.can_transition_to(to) {
            return Err(SpiderError::InvalidTransition {
                from: self.phase,
                to,
            });
        }

        tracing::debug!("Phase {} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Runs every listing group's discovery concurrently
    ///
    /// Nothing is persisted unless every group succeeds.
    async fn discover_listings(&mut self, fetcher: &dyn PageFetcher) -> Result<()> {
        let registry = &self.registry;
        let listing_urls: Vec<&str> = registry.listing_urls().collect();
        tracing::info!("Discovering content URLs for {} listing groups", listing_urls.len());

        let results = join_all(listing_urls.iter().map(|&listing_url| async move {
            let result = match registry.get(listing_url) {
                Some(strategy) => strategy.discover(listing_url, fetcher).await,
                None => Err(SpiderError::MissingStrategy {
                    listing_url: listing_url.to_string(),
                }),
            };
            (listing_url, result)
        }))
        .await;

        let mut discovered = Vec::with_capacity(results.len());
        for (listing_url, result) in results {
            match result {
                Ok(content_urls) => {
                    tracing::info!("Listing {}: {} content URLs", listing_url, content_urls.len());
                    discovered.push((listing_url.to_string(), dedup_preserving_order(content_urls)));
                }
                Err(e) => {
                    tracing::error!("Discovery failed for {}: {}", listing_url, e);
                    return Err(SpiderError::Discovery {
                        listing_url: listing_url.to_string(),
                        source: Box::new(e),
                    });
                }
            }
        }

        self.state.listing_groups.extend(discovered);
        self.store.persist_listing_groups(&self.state)?;
        Ok(())
    }

    async fn scrape_content(&mut self, fetcher: &dyn PageFetcher) -> Result<()> {
        let scheduler =
            BatchScheduler::new(self.batch_limit, &self.registry, fetcher, self.store.as_ref());
        let summary = scheduler.run(&mut self.state).await?;

        self.new_record_count += summary.new_records;
        tracing::info!(
            "Scraped {} URLs in {} batches ({} failed, {} new records)",
            summary.scraped,
            summary.batches,
            summary.failed,
            summary.new_records
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::test_support::{registry_for, StubStrategy, TrackingFetcher};
    use crate::crawler::CrawlOutcome;
    use crate::storage::{JsonStateStore, LISTING_GROUPS_FILE};
    use std::sync::Arc;
    use tempfile::TempDir;

    const BENCHES: &str = "https://acme.test/benches";
    const RACKS: &str = "https://acme.test/racks";

    fn stub() -> StubStrategy {
        StubStrategy::default()
            .with_links(BENCHES, &["https://acme.test/p/1", "https://acme.test/p/2"])
            .with_links(RACKS, &["https://acme.test/p/3"])
    }

    fn coordinator(dir: &TempDir, strategy: Arc<StubStrategy>) -> Coordinator {
        Coordinator::new(
            "acme",
            2,
            registry_for(&[BENCHES, RACKS], strategy),
            Box::new(JsonStateStore::new(dir.path())),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_full_run_from_empty_state() {
        let dir = TempDir::new().unwrap();
        let strategy = Arc::new(stub());
        let mut coordinator = coordinator(&dir, strategy.clone());
        let fetcher = TrackingFetcher::default();

        assert_eq!(coordinator.phase(), CrawlPhase::Idle);
        assert_eq!(
            coordinator.advance(&fetcher).await.unwrap(),
            CrawlPhase::DiscoveringListings
        );
        assert_eq!(
            coordinator.advance(&fetcher).await.unwrap(),
            CrawlPhase::ScrapingContent
        );
        assert_eq!(coordinator.advance(&fetcher).await.unwrap(), CrawlPhase::Done);
        assert_eq!(coordinator.advance(&fetcher).await.unwrap(), CrawlPhase::Done);

        let result = coordinator.result();
        assert_eq!(result.record_count, 3);
        assert_eq!(result.new_record_count, 3);
        assert_eq!(result.pending_url_count, 0);
        assert_eq!(result.outcome(), CrawlOutcome::NewRecords);
        assert_eq!(strategy.discover_calls(), 2);
    }

    #[tokio::test]
    async fn test_cached_listing_groups_skip_discovery() {
        let dir = TempDir::new().unwrap();
        let fetcher = TrackingFetcher::default();
        coordinator(&dir, Arc::new(stub()))
            .run(&fetcher)
            .await
            .unwrap();

        let strategy = Arc::new(stub());
        let mut second = coordinator(&dir, strategy.clone());
        assert_eq!(
            second.advance(&fetcher).await.unwrap(),
            CrawlPhase::ScrapingContent
        );
        second.run(&fetcher).await.unwrap();

        assert_eq!(strategy.discover_calls(), 0);
    }

    #[tokio::test]
    async fn test_rerun_yields_nothing_new() {
        let dir = TempDir::new().unwrap();
        let fetcher = TrackingFetcher::default();
        let first = coordinator(&dir, Arc::new(stub()))
            .run(&fetcher)
            .await
            .unwrap();

        let strategy = Arc::new(stub());
        let second = coordinator(&dir, strategy.clone())
            .run(&fetcher)
            .await
            .unwrap();

        assert_eq!(second.new_record_count, 0);
        assert_eq!(second.record_count, first.record_count);
        assert_eq!(second.outcome(), CrawlOutcome::NothingNew);
        assert_eq!(strategy.scrape_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_urls_retried_on_next_run() {
        let dir = TempDir::new().unwrap();
        let fetcher = TrackingFetcher::default();

        let first = coordinator(&dir, Arc::new(stub().failing("https://acme.test/p/2")))
            .run(&fetcher)
            .await
            .unwrap();
        assert_eq!(first.record_count, 2);
        assert_eq!(first.pending_url_count, 1);

        let strategy = Arc::new(stub());
        let second = coordinator(&dir, strategy.clone())
            .run(&fetcher)
            .await
            .unwrap();

        assert_eq!(strategy.scrape_calls(), 1);
        assert_eq!(second.new_record_count, 1);
        assert_eq!(second.record_count, 3);
        assert_eq!(second.pending_url_count, 0);
    }

    #[tokio::test]
    async fn test_no_data_outcome() {
        let dir = TempDir::new().unwrap();
        let strategy = Arc::new(
            stub()
                .failing("https://acme.test/p/1")
                .failing("https://acme.test/p/2")
                .failing("https://acme.test/p/3"),
        );
        let result = coordinator(&dir, strategy)
            .run(&TrackingFetcher::default())
            .await
            .unwrap();

        assert_eq!(result.record_count, 0);
        assert_eq!(result.outcome(), CrawlOutcome::NoData);
    }

    #[tokio::test]
    async fn test_discovery_failure_persists_nothing() {
        let dir = TempDir::new().unwrap();
        let strategy = Arc::new(stub().broken_listing(RACKS));
        let mut coordinator = coordinator(&dir, strategy.clone());

        let err = coordinator
            .run(&TrackingFetcher::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SpiderError::Discovery { ref listing_url, .. } if listing_url == RACKS
        ));
        assert_eq!(coordinator.phase(), CrawlPhase::DiscoveringListings);
        assert!(!dir.path().join("acme").join(LISTING_GROUPS_FILE).exists());
        assert_eq!(strategy.scrape_calls(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_state_fails_construction() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("acme")).unwrap();
        std::fs::write(dir.path().join("acme").join(LISTING_GROUPS_FILE), "{not json").unwrap();

        let result = Coordinator::new(
            "acme",
            2,
            registry_for(&[BENCHES], Arc::new(stub())),
            Box::new(JsonStateStore::new(dir.path())),
        );

        assert!(matches!(result, Err(SpiderError::Persistence(_))));
    }
}
