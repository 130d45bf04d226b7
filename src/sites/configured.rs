//! Config-driven listing strategy
//!
//! Discovery selects product anchors on the listing page (optionally over
//! numbered pages); content scraping runs the structured extractor and
//! layers site-specific fields on top.

use crate::config::{ContentConfig, DiscoveryConfig, ListingConfig};
use crate::extract::{extract_attribute_urls, extract_links, extract_product};
use crate::fetch::{PageFetcher, WaitCondition};
use crate::sites::ListingStrategy;
use crate::state::{dedup_preserving_order, ScrapedRecord};
use crate::{ConfigError, ConfigResult, FetchError, SpiderError};
use async_trait::async_trait;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

const DEFAULT_IMAGE_ATTR: &str = "src";

/// Strategy built from one `[[spider.listing]]` entry
#[derive(Debug)]
pub struct ConfiguredStrategy {
    link_selector: Selector,
    base_url: Option<Url>,
    url_contains: Option<String>,
    page_param: Option<String>,
    max_pages: u32,
    discovery_wait: WaitCondition,
    content_wait: WaitCondition,
    fallback_brand: Option<String>,
    category_path_prefix: Option<String>,
    image_selector: Option<Selector>,
    image_attr: String,
}

impl ConfiguredStrategy {
    /// Compiles selectors and URLs from a listing entry
    pub fn from_config(listing: &ListingConfig) -> ConfigResult<Self> {
        let DiscoveryConfig {
            link_selector,
            base_url,
            url_contains,
            page_param,
            max_pages,
            wait_for: discovery_wait,
        } = &listing.discovery;
        let ContentConfig {
            wait_for: content_wait,
            brand,
            category_path_prefix,
            image_selector,
            image_attr,
        } = &listing.content;

        let base_url = base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

        Ok(Self {
            link_selector: parse_selector(link_selector)?,
            base_url,
            url_contains: url_contains.clone(),
            page_param: page_param.clone(),
            max_pages: *max_pages,
            discovery_wait: discovery_wait.clone(),
            content_wait: content_wait.clone(),
            fallback_brand: brand.clone(),
            category_path_prefix: category_path_prefix.clone(),
            image_selector: image_selector.as_deref().map(parse_selector).transpose()?,
            image_attr: image_attr
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_ATTR.to_string()),
        })
    }

    /// Links on one listing page that pass the URL filter
    fn page_links(&self, html: &str, page_url: &Url) -> Vec<String> {
        let base = self.base_url.as_ref().unwrap_or(page_url);
        extract_links(html, &self.link_selector, base)
            .into_iter()
            .filter(|link| match &self.url_contains {
                Some(needle) => link.contains(needle.as_str()),
                None => true,
            })
            .collect()
    }

    /// Categories taken from the path segments between the prefix and the slug
    fn path_categories(&self, content_url: &str) -> Vec<String> {
        let Some(prefix) = &self.category_path_prefix else {
            return Vec::new();
        };
        let Ok(url) = Url::parse(content_url) else {
            return Vec::new();
        };
        let Some((_, rest)) = url.path().split_once(prefix.as_str()) else {
            return Vec::new();
        };

        let mut segments: Vec<String> = rest
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        segments.pop();
        segments
    }

    fn enrich(&self, mut record: ScrapedRecord, content_url: &str, html: &str) -> ScrapedRecord {
        let page_url = Url::parse(content_url).ok();

        if let Some(base) = &page_url {
            record.image_links = dedup_preserving_order(
                record
                    .image_links
                    .into_iter()
                    .map(|link| match base.join(&link) {
                        Ok(resolved) => resolved.to_string(),
                        Err(_) => link,
                    })
                    .collect(),
            );
        }

        if record.brands.is_empty() {
            if let Some(brand) = &self.fallback_brand {
                record.brands.push(brand.clone());
            }
        }

        let path_categories = self.path_categories(content_url);
        if !path_categories.is_empty() {
            record.categories.extend(path_categories);
            record.categories = dedup_preserving_order(record.categories);
        }

        if let Some(selector) = &self.image_selector {
            if let Some(base) = &page_url {
                record
                    .image_links
                    .extend(extract_attribute_urls(html, selector, &self.image_attr, base));
                record.image_links = dedup_preserving_order(record.image_links);
            }
        }

        record
    }
}

fn parse_selector(selector: &str) -> ConfigResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

fn page_url(listing_url: &Url, param: &str, page: u32) -> Url {
    let mut url = listing_url.clone();
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != param)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(param, &page.to_string());
    url
}

#[async_trait]
impl ListingStrategy for ConfiguredStrategy {
    async fn discover(
        &self,
        listing_url: &str,
        fetcher: &dyn PageFetcher,
    ) -> crate::Result<Vec<String>> {
        let listing = Url::parse(listing_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid listing URL '{}': {}", listing_url, e))
        })?;

        let Some(param) = &self.page_param else {
            let page = fetcher.fetch(listing.as_str(), &self.discovery_wait).await?;
            return Ok(self.page_links(&page.html, &listing));
        };

        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        for number in 1..=self.max_pages {
            let url = page_url(&listing, param, number);
            let page = match fetcher.fetch(url.as_str(), &self.discovery_wait).await {
                Ok(page) => page,
                // Some sites answer past the last page with 404/410
                Err(FetchError::Status { status: 404 | 410, .. }) if number > 1 => {
                    tracing::debug!("Listing {} exhausted after page {}", listing_url, number - 1);
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let fresh: Vec<String> = self
                .page_links(&page.html, &url)
                .into_iter()
                .filter(|link| seen.insert(link.clone()))
                .collect();

            if fresh.is_empty() {
                tracing::debug!("Listing {} exhausted after page {}", listing_url, number - 1);
                break;
            }
            urls.extend(fresh);
        }

        Ok(urls)
    }

    async fn scrape(
        &self,
        content_url: &str,
        fetcher: &dyn PageFetcher,
    ) -> crate::Result<ScrapedRecord> {
        let page = fetcher.fetch(content_url, &self.content_wait).await?;

        let record = extract_product(&page.html).map_err(|source| SpiderError::Extraction {
            url: content_url.to_string(),
            source,
        })?;

        Ok(self.enrich(record, content_url, &page.html))
    }
}
