//! Storage module for persisting crawl state
//!
//! This module handles durable state for each spider, including:
//! - Discovered content URLs per listing group
//! - The set of already-scraped content URLs
//! - Accumulated scraped records
//!
//! Persist calls merge with what is already stored, so state from an
//! interrupted run is additive rather than destructive.

mod json;
mod traits;

pub use json::{JsonStateStore, LISTING_GROUPS_FILE, RECORDS_FILE, SCRAPED_URLS_FILE};
pub use traits::{StateStore, StorageError, StorageResult};

use crate::config::CrawlerConfig;

/// Opens the state store configured for a crawler
pub fn open_store(config: &CrawlerConfig) -> JsonStateStore {
    JsonStateStore::new(&config.state_dir)
}
