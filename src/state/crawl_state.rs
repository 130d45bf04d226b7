use crate::state::ScrapedRecord;
use std::collections::{BTreeMap, BTreeSet};

/// Listing URL -> ordered content URLs discovered under it
///
/// Keyed by listing URL in sorted order, which is also the order the
/// scheduler walks the groups in.
pub type ListingGroups = BTreeMap<String, Vec<String>>;

/// Everything persisted for one spider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlState {
    /// Spider name this state is scoped to
    pub spider_name: String,

    /// Discovered content URLs per listing group
    pub listing_groups: ListingGroups,

    /// Content URLs that were fetched and extracted in any run
    pub scraped_urls: BTreeSet<String>,

    /// All records accumulated across runs
    pub records: Vec<ScrapedRecord>,
}

impl CrawlState {
    /// Creates an empty state for a spider
    pub fn empty(spider_name: impl Into<String>) -> Self {
        Self {
            spider_name: spider_name.into(),
            ..Self::default()
        }
    }

    /// Returns true if listing discovery has already produced data
    pub fn has_listing_groups(&self) -> bool {
        !self.listing_groups.is_empty()
    }

    /// Returns true if the URL was already scraped
    pub fn is_scraped(&self, url: &str) -> bool {
        self.scraped_urls.contains(url)
    }

    /// Total number of discovered content URLs across all groups
    pub fn discovered_url_count(&self) -> usize {
        self.listing_groups.values().map(Vec::len).sum()
    }

    /// Number of discovered content URLs still waiting to be scraped
    pub fn pending_url_count(&self) -> usize {
        self.listing_groups
            .values()
            .flatten()
            .filter(|url| !self.is_scraped(url))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> CrawlState {
        let mut state = CrawlState::empty("acme");
        state.listing_groups.insert(
            "https://acme.test/benches".to_string(),
            vec![
                "https://acme.test/p/1".to_string(),
                "https://acme.test/p/2".to_string(),
            ],
        );
        state.listing_groups.insert(
            "https://acme.test/racks".to_string(),
            vec!["https://acme.test/p/3".to_string()],
        );
        state
    }

    #[test]
    fn test_empty_state() {
        let state = CrawlState::empty("acme");
        assert_eq!(state.spider_name, "acme");
        assert!(!state.has_listing_groups());
        assert_eq!(state.pending_url_count(), 0);
    }

    #[test]
    fn test_pending_counts() {
        let mut state = sample_state();
        assert_eq!(state.discovered_url_count(), 3);
        assert_eq!(state.pending_url_count(), 3);

        state.scraped_urls.insert("https://acme.test/p/2".to_string());
        assert!(state.is_scraped("https://acme.test/p/2"));
        assert_eq!(state.pending_url_count(), 2);
    }

    #[test]
    fn test_nothing_pending_when_everything_scraped() {
        let mut state = sample_state();
        for url in ["p/1", "p/2", "p/3"] {
            state.scraped_urls.insert(format!("https://acme.test/{}", url));
        }
        assert_eq!(state.pending_url_count(), 0);
    }
}
