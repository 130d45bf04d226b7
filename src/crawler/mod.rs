//! Crawler module for resumable catalog crawls
//!
//! This module contains the core crawling logic, including:
//! - The per-spider phase state machine (discovery, then scraping)
//! - Bounded, failure-tolerant batch scheduling
//! - The `crawl` entry point used by the CLI

mod coordinator;
mod scheduler;
#[cfg(test)]
mod test_support;

pub use coordinator::Coordinator;
pub use scheduler::{BatchScheduler, PendingScrape, ScrapeSummary};

use crate::config::{Config, SpiderConfig};
use crate::fetch::{build_fetcher, FetchTimeouts};
use crate::sites::registry_from_config;
use crate::storage::open_store;
use crate::Result;

/// Summary of one spider's crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlResult {
    pub spider_name: String,

    /// Records persisted across the spider's whole history
    pub record_count: usize,

    /// Records added by this run
    pub new_record_count: usize,

    /// Discovered content URLs still unscraped (retried next run)
    pub pending_url_count: usize,
}

/// How a finished crawl should be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// This run added records
    NewRecords,

    /// Nothing new this run, but earlier runs produced data
    NothingNew,

    /// No records exist at all for this spider
    NoData,
}

impl CrawlResult {
    pub fn outcome(&self) -> CrawlOutcome {
        if self.new_record_count > 0 {
            CrawlOutcome::NewRecords
        } else if self.record_count > 0 {
            CrawlOutcome::NothingNew
        } else {
            CrawlOutcome::NoData
        }
    }
}

/// Runs a complete crawl for one spider
///
/// This is the main entry point for crawling a site. It will:
/// 1. Build the strategy registry from the spider's listing entries
/// 2. Load the spider's persisted state
/// 3. Start the configured fetch transport
/// 4. Discover listing groups unless cached, then scrape in batches
/// 5. Shut the transport down, whether or not the crawl succeeded
///
/// # Arguments
///
/// * `config` - The full configuration (crawler and user agent sections)
/// * `spider` - The spider to crawl
///
/// # Returns
///
/// * `Ok(CrawlResult)` - Crawl reached `Done`
/// * `Err(SpiderError)` - Configuration, discovery or persistence failure
pub async fn crawl(config: &Config, spider: &SpiderConfig) -> Result<CrawlResult> {
    let registry = registry_from_config(spider)?;
    let store = open_store(&config.crawler);
    let mut coordinator = Coordinator::new(
        &spider.name,
        spider.effective_batch_limit(&config.crawler),
        registry,
        Box::new(store),
    )?;

    tracing::info!(
        "Using {} fetcher for spider '{}'",
        spider.fetch_mode.as_str(),
        spider.name
    );
    let fetcher = build_fetcher(
        spider.fetch_mode,
        &config.user_agent,
        FetchTimeouts::from(&config.crawler),
    )
    .await?;

    let result = coordinator.run(fetcher.as_ref()).await;
    fetcher.shutdown().await;
    result
}
