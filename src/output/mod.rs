//! Output module for reporting on persisted crawl state
//!
//! This module handles:
//! - Computing per-spider statistics from the state store
//! - Printing them for the `--stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics, ListingGroupStatistics};
