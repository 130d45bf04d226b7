//! Statistics generation from persisted crawl state
//!
//! This module provides functionality for extracting and displaying
//! per-spider crawl statistics from the state store.

use crate::state::CrawlState;
use crate::storage::StateStore;
use crate::Result;

/// Progress of one listing group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingGroupStatistics {
    pub listing_url: String,
    pub discovered: usize,
    pub pending: usize,
}

/// Crawl statistics summary for one spider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStatistics {
    pub spider_name: String,

    /// Number of listing groups with cached discovery results
    pub listing_groups: usize,

    /// Total content URLs discovered across all groups
    pub discovered_urls: usize,

    /// Content URLs successfully scraped in any run
    pub scraped_urls: usize,

    /// Discovered content URLs not yet scraped
    pub pending_urls: usize,

    /// Accumulated records
    pub records: usize,

    /// Records carrying at least one image link
    pub records_with_images: usize,

    /// Per-group breakdown, in stored order
    pub groups: Vec<ListingGroupStatistics>,
}

impl CrawlStatistics {
    /// Computes statistics from an in-memory state
    pub fn from_state(state: &CrawlState) -> Self {
        let groups = state
            .listing_groups
            .iter()
            .map(|(listing_url, content_urls)| ListingGroupStatistics {
                listing_url: listing_url.clone(),
                discovered: content_urls.len(),
                pending: content_urls
                    .iter()
                    .filter(|url| !state.is_scraped(url))
                    .count(),
            })
            .collect();

        Self {
            spider_name: state.spider_name.clone(),
            listing_groups: state.listing_groups.len(),
            discovered_urls: state.discovered_url_count(),
            scraped_urls: state.scraped_urls.len(),
            pending_urls: state.pending_url_count(),
            records: state.records.len(),
            records_with_images: state
                .records
                .iter()
                .filter(|record| !record.image_links.is_empty())
                .count(),
            groups,
        }
    }
}

/// Loads statistics for a spider from storage
///
/// # Arguments
///
/// * `store` - The state backend to read
/// * `spider_name` - The spider whose state to summarize
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(SpiderError)` - Persisted state could not be read
pub fn load_statistics(store: &dyn StateStore, spider_name: &str) -> Result<CrawlStatistics> {
    let state = store.load(spider_name)?;
    Ok(CrawlStatistics::from_state(&state))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics: {} ===\n", stats.spider_name);

    println!("Overview:");
    println!("  Listing groups: {}", stats.listing_groups);
    println!("  Content URLs discovered: {}", stats.discovered_urls);
    println!("  Content URLs scraped: {}", stats.scraped_urls);
    println!("  Content URLs pending: {}", stats.pending_urls);
    println!("  Records: {}", stats.records);
    println!("  Records with images: {}", stats.records_with_images);
    println!();

    if !stats.groups.is_empty() {
        println!("Listing Groups:");
        for group in &stats.groups {
            println!(
                "  {}: {} discovered, {} pending",
                group.listing_url, group.discovered, group.pending
            );
        }
        println!();
    }

    let completion = if stats.discovered_urls > 0 {
        let done = stats.discovered_urls - stats.pending_urls;
        (done as f64 / stats.discovered_urls as f64) * 100.0
    } else {
        0.0
    };
    println!("Completion: {:.1}%", completion);
}
