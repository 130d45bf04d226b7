//! Catalog-Spider: a resumable product catalog crawler
//!
//! This crate discovers product pages under configured listing URLs, extracts
//! structured product records from each page, and persists its progress so an
//! interrupted or repeated run never reprocesses completed work.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod sites;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalog-Spider operations
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction error for {url}: {source}")]
    Extraction {
        url: String,
        source: ExtractionError,
    },

    #[error("No strategy registered for listing URL {listing_url}")]
    MissingStrategy { listing_url: String },

    #[error("Discovery failed for listing URL {listing_url}: {source}")]
    Discovery {
        listing_url: String,
        source: Box<SpiderError>,
    },

    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("Unknown spider: {0}")]
    UnknownSpider(String),
}

impl SpiderError {
    /// Returns true if the error only affects a single content URL
    ///
    /// Such errors leave the URL unscraped so the next run retries it.
    pub fn is_per_url(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Extraction { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),

    #[error("Fetch mode '{0}' is not available in this build")]
    UnsupportedFetchMode(String),
}

/// Page fetching errors
///
/// Every variant is retryable: the URL stays unscraped until a later run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser error: {0}")]
    Browser(String),
}

/// Structured record extraction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("no product found")]
    NoProduct,

    #[error("product block has no name")]
    MissingName,
}

/// Storage errors, re-exported at the crate root for convenience
pub use storage::StorageError;

/// Result type alias for Catalog-Spider operations
pub type Result<T> = std::result::Result<T, SpiderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, CrawlOutcome, CrawlResult};
pub use extract::extract_product;
pub use state::{CrawlPhase, CrawlState, ScrapedRecord};
