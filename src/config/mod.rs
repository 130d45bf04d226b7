//! Configuration module for Catalog-Spider
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use catalog_spider::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("spiders.toml")).unwrap();
//! for spider in &config.spiders {
//!     println!("{}: {} listing URLs", spider.name, spider.listing_urls().count());
//! }
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ContentConfig, CrawlerConfig, DiscoveryConfig, ListingConfig, SpiderConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
