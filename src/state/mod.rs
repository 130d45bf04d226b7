//! State module for tracking crawl progress
//!
//! This module provides the in-memory data model for one spider's crawl.
//!
//! # Components
//!
//! - `CrawlPhase`: The orchestrator's phase state machine
//! - `CrawlState`: Listing groups, scraped URL set and accumulated records
//! - `ScrapedRecord`: The canonical product record

mod crawl_state;
mod phase;
mod record;

// Re-export main types
pub use crawl_state::{CrawlState, ListingGroups};
pub use phase::CrawlPhase;
pub use record::{dedup_preserving_order, ScrapedRecord};
