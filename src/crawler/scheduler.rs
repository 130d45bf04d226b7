//! Batch scheduler for content scraping
//!
//! This module handles:
//! - Selecting unscraped content URLs in stored order
//! - Running at most `batch_limit` fetch+extract operations at once
//! - Absorbing per-URL failures without aborting the batch
//! - Persisting progress at every batch boundary

use crate::fetch::PageFetcher;
use crate::sites::{ListingStrategy, StrategyRegistry};
use crate::state::CrawlState;
use crate::storage::StateStore;
use crate::{Result, SpiderError};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// A content URL waiting to be scraped
#[derive(Clone)]
pub struct PendingScrape {
    /// Listing group the URL was discovered under
    pub listing_url: String,

    /// The content page to fetch
    pub content_url: String,

    strategy: Arc<dyn ListingStrategy>,
}

impl std::fmt::Debug for PendingScrape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingScrape")
            .field("listing_url", &self.listing_url)
            .field("content_url", &self.content_url)
            .finish()
    }
}

/// Totals for one scheduler run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub batches: usize,
    pub scraped: usize,
    pub failed: usize,
    pub new_records: usize,
}

/// Drains unscraped content URLs in bounded concurrent batches
///
/// Batches run strictly one after another; batch N+1 is not started before
/// batch N has settled and been persisted. All in-memory state is mutated
/// on the calling task once a batch has settled.
pub struct BatchScheduler<'a> {
    batch_limit: usize,
    registry: &'a StrategyRegistry,
    fetcher: &'a dyn PageFetcher,
    store: &'a dyn StateStore,
}

impl<'a> BatchScheduler<'a> {
    /// Creates a scheduler
    ///
    /// A batch limit of zero is treated as one.
    pub fn new(
        batch_limit: usize,
        registry: &'a StrategyRegistry,
        fetcher: &'a dyn PageFetcher,
        store: &'a dyn StateStore,
    ) -> Self {
        Self {
            batch_limit: batch_limit.max(1),
            registry,
            fetcher,
            store,
        }
    }

    /// Lists the URLs still to scrape, one vector per listing group, in stored order
    ///
    /// A URL listed under several groups is scheduled once, under the first.
    /// Groups with nothing left to scrape are omitted.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Vec<PendingScrape>>)` - Work in scheduling order, grouped
    /// * `Err(SpiderError::MissingStrategy)` - A group with pending URLs has no strategy
    pub fn plan(&self, state: &CrawlState) -> Result<Vec<Vec<PendingScrape>>> {
        let mut queued = HashSet::new();
        let mut pending = Vec::new();

        for (listing_url, content_urls) in &state.listing_groups {
            let mut urls = content_urls
                .iter()
                .filter(|url| !state.is_scraped(url))
                .filter(|url| queued.insert(url.as_str()))
                .peekable();

            if urls.peek().is_none() {
                continue;
            }

            let strategy =
                self.registry
                    .get(listing_url)
                    .ok_or_else(|| SpiderError::MissingStrategy {
                        listing_url: listing_url.clone(),
                    })?;

            pending.push(
                urls.map(|content_url| PendingScrape {
                    listing_url: listing_url.clone(),
                    content_url: content_url.clone(),
                    strategy: Arc::clone(&strategy),
                })
                .collect(),
            );
        }

        Ok(pending)
    }

    /// Scrapes every pending URL, persisting after each batch
    ///
    /// Batches never span listing groups: a group's last partial batch runs
    /// and is persisted before the next group starts. Fetch and extraction
    /// failures leave the URL unscraped for the next run. Any other error
    /// stops the run once the current batch's successes have been persisted.
    pub async fn run(&self, state: &mut CrawlState) -> Result<ScrapeSummary> {
        let groups = self.plan(state)?;
        let total_urls: usize = groups.iter().map(Vec::len).sum();
        let total_batches: usize = groups
            .iter()
            .map(|group| group.len().div_ceil(self.batch_limit))
            .sum();
        let mut summary = ScrapeSummary::default();

        if groups.is_empty() {
            tracing::info!("No unscraped content URLs for spider '{}'", state.spider_name);
            return Ok(summary);
        }

        tracing::info!(
            "Scraping {} content URLs from {} listing groups in {} batches of up to {}",
            total_urls,
            groups.len(),
            total_batches,
            self.batch_limit
        );

        let batches = groups
            .iter()
            .flat_map(|group| group.chunks(self.batch_limit));

        for (index, batch) in batches.enumerate() {
            let started = Instant::now();
            let results = join_all(batch.iter().map(|task| async move {
                tracing::debug!("Scraping {}", task.content_url);
                let result = task.strategy.scrape(&task.content_url, self.fetcher).await;
                (task, result)
            }))
            .await;

            let mut fatal = None;
            let mut batch_scraped = 0;
            let mut batch_failed = 0;

            for (task, result) in results {
                match result {
                    Ok(record) => {
                        if !state.records.contains(&record) {
                            state.records.push(record);
                            summary.new_records += 1;
                        }
                        state.scraped_urls.insert(task.content_url.clone());
                        batch_scraped += 1;
                    }
                    Err(e) if e.is_per_url() => {
                        tracing::warn!("Failed to scrape {}: {}", task.content_url, e);
                        batch_failed += 1;
                    }
                    Err(e) => {
                        tracing::error!("Fatal error scraping {}: {}", task.content_url, e);
                        fatal.get_or_insert(e);
                    }
                }
            }

            self.store.persist_progress(state)?;

            summary.batches += 1;
            summary.scraped += batch_scraped;
            summary.failed += batch_failed;

            tracing::info!(
                "Batch {}/{}: {} scraped, {} failed in {:.2}s",
                index + 1,
                total_batches,
                batch_scraped,
                batch_failed,
                started.elapsed().as_secs_f64()
            );

            if let Some(e) = fatal {
                return Err(e);
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::test_support::{registry_for, StubStrategy, TrackingFetcher};
    use crate::storage::JsonStateStore;
    use tempfile::TempDir;

    fn state_with(groups: &[(&str, &[&str])]) -> CrawlState {
        let mut state = CrawlState::empty("acme");
        for (listing, urls) in groups {
            state.listing_groups.insert(
                listing.to_string(),
                urls.iter().map(|u| u.to_string()).collect(),
            );
        }
        state
    }

    fn urls(prefix: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{}/p/{}", prefix, i)).collect()
    }

    #[test]
    fn test_plan_follows_stored_order_and_skips_scraped() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::new(dir.path());
        let strategy = Arc::new(StubStrategy::default());
        let registry = registry_for(&["https://a.test/list", "https://b.test/list"], strategy);
        let fetcher = TrackingFetcher::default();
        let scheduler = BatchScheduler::new(2, &registry, &fetcher, &store);

        let mut state = state_with(&[
            ("https://b.test/list", &["https://b.test/p/1", "https://a.test/p/2"]),
            ("https://a.test/list", &["https://a.test/p/1", "https://a.test/p/2"]),
        ]);
        state.scraped_urls.insert("https://a.test/p/1".to_string());

        let plan: Vec<Vec<String>> = scheduler
            .plan(&state)
            .unwrap()
            .into_iter()
            .map(|group| group.into_iter().map(|p| p.content_url).collect())
            .collect();

        assert_eq!(
            plan,
            vec![vec!["https://a.test/p/2"], vec!["https://b.test/p/1"]]
        );
    }

    #[test]
    fn test_plan_missing_strategy_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::new(dir.path());
        let registry = StrategyRegistry::new();
        let fetcher = TrackingFetcher::default();
        let scheduler = BatchScheduler::new(2, &registry, &fetcher, &store);

        let state = state_with(&[("https://a.test/list", &["https://a.test/p/1"])]);

        assert!(matches!(
            scheduler.plan(&state),
            Err(SpiderError::MissingStrategy { listing_url }) if listing_url == "https://a.test/list"
        ));
    }

    #[test]
    fn test_plan_ignores_fully_scraped_group_without_strategy() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::new(dir.path());
        let registry = StrategyRegistry::new();
        let fetcher = TrackingFetcher::default();
        let scheduler = BatchScheduler::new(2, &registry, &fetcher, &store);

        let mut state = state_with(&[("https://a.test/list", &["https://a.test/p/1"])]);
        state.scraped_urls.insert("https://a.test/p/1".to_string());

        assert!(scheduler.plan(&state).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_batch_limit() {
        for batch_limit in [1, 3, 8] {
            let dir = TempDir::new().unwrap();
            let store = JsonStateStore::new(dir.path());
            let strategy = Arc::new(StubStrategy::default());
            let registry = registry_for(&["https://a.test/list"], strategy);
            let fetcher = TrackingFetcher::default();
            let scheduler = BatchScheduler::new(batch_limit, &registry, &fetcher, &store);

            let mut state = CrawlState::empty("acme");
            state
                .listing_groups
                .insert("https://a.test/list".to_string(), urls("https://a.test", 20));

            let summary = scheduler.run(&mut state).await.unwrap();

            assert_eq!(summary.scraped, 20);
            assert_eq!(summary.batches, 20usize.div_ceil(batch_limit));
            assert!(fetcher.max_in_flight() <= batch_limit);
            assert!(fetcher.max_in_flight() >= 1);
        }
    }

    #[tokio::test]
    async fn test_batches_do_not_span_listing_groups() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::new(dir.path());
        let strategy = Arc::new(StubStrategy::default());
        let registry = registry_for(&["https://a.test/list", "https://b.test/list"], strategy);
        let fetcher = TrackingFetcher::default();
        let scheduler = BatchScheduler::new(4, &registry, &fetcher, &store);

        let mut state = CrawlState::empty("acme");
        state
            .listing_groups
            .insert("https://a.test/list".to_string(), urls("https://a.test", 2));
        state
            .listing_groups
            .insert("https://b.test/list".to_string(), urls("https://b.test", 3));

        let summary = scheduler.run(&mut state).await.unwrap();

        assert_eq!(summary.batches, 2);
        assert_eq!(summary.scraped, 5);
        assert!(fetcher.max_in_flight() <= 3);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_within_batch() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::new(dir.path());
        let strategy = Arc::new(StubStrategy::default().failing("https://a.test/p/2"));
        let registry = registry_for(&["https://a.test/list"], strategy);
        let fetcher = TrackingFetcher::default();
        let scheduler = BatchScheduler::new(5, &registry, &fetcher, &store);

        let mut state = CrawlState::empty("acme");
        state
            .listing_groups
            .insert("https://a.test/list".to_string(), urls("https://a.test", 5));

        let summary = scheduler.run(&mut state).await.unwrap();

        assert_eq!(summary.batches, 1);
        assert_eq!(summary.scraped, 4);
        assert_eq!(summary.failed, 1);
        assert!(!state.is_scraped("https://a.test/p/2"));

        let persisted = store.load("acme").unwrap();
        assert_eq!(persisted.scraped_urls.len(), 4);
        assert_eq!(persisted.records.len(), 4);
        assert!(!persisted.scraped_urls.contains("https://a.test/p/2"));
    }

    #[tokio::test]
    async fn test_progress_persisted_after_every_batch() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::new(dir.path());
        // The fourth URL returns a fatal error, stopping the run after batch two
        let strategy = Arc::new(StubStrategy::default().fatal("https://a.test/p/3"));
        let registry = registry_for(&["https://a.test/list"], strategy);
        let fetcher = TrackingFetcher::default();
        let scheduler = BatchScheduler::new(2, &registry, &fetcher, &store);

        let mut state = CrawlState::empty("acme");
        state
            .listing_groups
            .insert("https://a.test/list".to_string(), urls("https://a.test", 6));

        let result = scheduler.run(&mut state).await;
        assert!(result.is_err());

        let persisted = store.load("acme").unwrap();
        assert_eq!(persisted.scraped_urls.len(), 3);
        assert!(persisted.scraped_urls.contains("https://a.test/p/2"));
        assert!(!persisted.scraped_urls.contains("https://a.test/p/4"));
    }

    #[tokio::test]
    async fn test_empty_plan_runs_no_batches() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::new(dir.path());
        let registry = StrategyRegistry::new();
        let fetcher = TrackingFetcher::default();
        let scheduler = BatchScheduler::new(4, &registry, &fetcher, &store);

        let mut state = CrawlState::empty("acme");
        let summary = scheduler.run(&mut state).await.unwrap();

        assert_eq!(summary, ScrapeSummary::default());
        assert_eq!(fetcher.calls(), 0);
    }
}
