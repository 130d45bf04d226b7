use crate::config::types::{
    Config, ContentConfig, CrawlerConfig, DiscoveryConfig, SpiderConfig, UserAgentConfig,
};
use crate::fetch::WaitCondition;
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

const MAX_BATCH_LIMIT: u32 = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_spiders(&config.spiders)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_batch_limit(config.batch_limit)?;

    if config.state_dir.is_empty() {
        return Err(ConfigError::Validation(
            "state_dir cannot be empty".to_string(),
        ));
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1 second".to_string(),
        ));
    }

    if config.navigation_timeout == 0 {
        return Err(ConfigError::Validation(
            "navigation_timeout must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

fn validate_batch_limit(limit: u32) -> Result<(), ConfigError> {
    if limit < 1 || limit > MAX_BATCH_LIMIT {
        return Err(ConfigError::Validation(format!(
            "batch_limit must be between 1 and {}, got {}",
            MAX_BATCH_LIMIT, limit
        )));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates spider entries
fn validate_spiders(spiders: &[SpiderConfig]) -> Result<(), ConfigError> {
    if spiders.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[spider]] must be configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for spider in spiders {
        validate_spider_name(&spider.name)?;
        if !names.insert(spider.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate spider name '{}'",
                spider.name
            )));
        }

        if let Some(limit) = spider.batch_limit {
            validate_batch_limit(limit)?;
        }

        validate_spider_listings(spider)?;
    }

    Ok(())
}

/// Spider names double as directory names
fn validate_spider_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "spider name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        || name.starts_with('.')
    {
        return Err(ConfigError::Validation(format!(
            "spider name must be filesystem safe (letters, digits, '-', '_', '.'), got '{}'",
            name
        )));
    }

    Ok(())
}

fn validate_spider_listings(spider: &SpiderConfig) -> Result<(), ConfigError> {
    if spider.listings.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Spider '{}' must have at least one [[spider.listing]]",
            spider.name
        )));
    }

    let mut seen = HashSet::new();
    for listing in &spider.listings {
        if listing.urls.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Spider '{}' has a listing entry without urls",
                spider.name
            )));
        }

        for listing_url in &listing.urls {
            validate_http_url(listing_url, "listing URL")?;
            if !seen.insert(listing_url.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Listing URL '{}' appears twice in spider '{}'",
                    listing_url, spider.name
                )));
            }
        }

        validate_discovery(&listing.discovery)?;
        validate_content(&listing.content)?;
    }

    Ok(())
}

fn validate_discovery(discovery: &DiscoveryConfig) -> Result<(), ConfigError> {
    validate_selector(&discovery.link_selector)?;

    if let Some(base_url) = &discovery.base_url {
        validate_http_url(base_url, "base_url")?;
    }

    if discovery.page_param.is_some() && discovery.max_pages == 0 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when page_param is set".to_string(),
        ));
    }

    validate_wait_condition(&discovery.wait_for)
}

fn validate_content(content: &ContentConfig) -> Result<(), ConfigError> {
    if let Some(selector) = &content.image_selector {
        validate_selector(selector)?;
    }

    if content.image_attr.is_some() && content.image_selector.is_none() {
        return Err(ConfigError::Validation(
            "image_attr requires image_selector".to_string(),
        ));
    }

    validate_wait_condition(&content.wait_for)
}

fn validate_wait_condition(condition: &WaitCondition) -> Result<(), ConfigError> {
    match condition {
        WaitCondition::Selector { selector } => validate_selector(selector),
        WaitCondition::ContentStable { interval_ms } | WaitCondition::ScrollToBottom { interval_ms }
            if *interval_ms == 0 =>
        {
            Err(ConfigError::Validation(
                "wait-for interval-ms must be >= 1".to_string(),
            ))
        }
        _ => Ok(()),
    }
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

fn validate_http_url(raw: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            what, raw
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
