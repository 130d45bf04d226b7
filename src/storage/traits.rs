//! Storage traits and error types
//!
//! This module defines the trait interface for crawl state backends and
//! associated error types.

use crate::state::CrawlState;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt state document {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for crawl state backends
///
/// State is scoped per spider name. Every persist call merges the in-memory
/// artifact with whatever is already stored rather than overwriting it, so
/// state written by an earlier (possibly crashed) process only ever grows.
pub trait StateStore: Send + Sync {
    /// Loads the persisted state for a spider
    ///
    /// Missing artifacts load as empty defaults. An artifact that exists but
    /// cannot be parsed is an error: guessing would either re-scrape or lose
    /// data silently.
    fn load(&self, spider_name: &str) -> StorageResult<CrawlState>;

    /// Merges and writes the listing-group document
    fn persist_listing_groups(&self, state: &CrawlState) -> StorageResult<()>;

    /// Merges and writes the scraped-URL set
    fn persist_scraped_urls(&self, state: &CrawlState) -> StorageResult<()>;

    /// Merges and writes the record collection
    fn persist_records(&self, state: &CrawlState) -> StorageResult<()>;

    /// Drops the listing-group document so the next run rediscovers
    fn clear_listing_groups(&self, spider_name: &str) -> StorageResult<()>;

    /// Persists scrape progress at a batch boundary
    ///
    /// Records are written before the scraped-URL set: a crash in between
    /// leaves URLs to be scraped again, never marked without their record.
    fn persist_progress(&self, state: &CrawlState) -> StorageResult<()> {
        self.persist_records(state)?;
        self.persist_scraped_urls(state)
    }
}
