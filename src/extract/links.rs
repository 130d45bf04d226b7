//! Link extraction for listing pages
//!
//! This module handles pulling URLs out of HTML for:
//! - Content links matched by a site's link selector
//! - Image URLs read from an arbitrary attribute

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts `href` targets of elements matching `selector`
///
/// Links are resolved against `base_url`, stripped of fragments, and
/// deduplicated in document order.
///
/// # Link Extraction Rules
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
/// - Anything that is not HTTP(S) after resolution
///
/// # Example
///
/// ```
/// use catalog_spider::extract::extract_links;
/// use scraper::Selector;
/// use url::Url;
///
/// let html = r#"<a class="card" href="/p/bench">Bench</a><a href="/about">About</a>"#;
/// let selector = Selector::parse("a.card").unwrap();
/// let base = Url::parse("https://shop.test/list").unwrap();
/// assert_eq!(extract_links(html, &selector, &base), vec!["https://shop.test/p/bench"]);
/// ```
pub fn extract_links(html: &str, selector: &Selector, base_url: &Url) -> Vec<String> {
    extract_attribute_urls(html, selector, "href", base_url)
}

/// Extracts URLs held in `attr` of elements matching `selector`
pub fn extract_attribute_urls(
    html: &str,
    selector: &Selector,
    attr: &str,
    base_url: &Url,
) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    document
        .select(selector)
        .filter_map(|element| element.value().attr(attr))
        .filter_map(|href| resolve_link(href, base_url))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    // Skip special schemes
    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    absolute_url.set_fragment(None);
    Some(absolute_url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/catalog/page").unwrap()
    }

    fn links(html: &str, selector: &str) -> Vec<String> {
        extract_links(html, &Selector::parse(selector).unwrap(), &base_url())
    }

    #[test]
    fn test_extract_absolute_link() {
        let html = r#"<a href="https://other.com/page">Link</a>"#;
        assert_eq!(links(html, "a"), vec!["https://other.com/page"]);
    }

    #[test]
    fn test_extract_relative_links() {
        let html = r#"<a href="/other">Root</a><a href="sibling">Sibling</a>"#;
        assert_eq!(
            links(html, "a"),
            vec!["https://example.com/other", "https://example.com/catalog/sibling"]
        );
    }

    #[test]
    fn test_selector_filters_elements() {
        let html = r#"
            <div class="grid">
                <a class="hover-card" href="/p/1">One</a>
                <a class="hover-card" href="/p/2">Two</a>
            </div>
            <a class="nav" href="/about">About</a>
        "#;
        assert_eq!(
            links(html, "a.hover-card"),
            vec!["https://example.com/p/1", "https://example.com/p/2"]
        );
    }

    #[test]
    fn test_skip_special_schemes() {
        let html = r##"
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:test@example.com">Email</a>
            <a href="tel:+1234567890">Call</a>
            <a href="data:text/html,hi">Data</a>
            <a href="#reviews">Jump</a>
            <a href="ftp://example.com/file">FTP</a>
        "##;
        assert!(links(html, "a").is_empty());
    }

    #[test]
    fn test_fragments_stripped_and_deduplicated() {
        let html = r#"
            <a href="/p/1#reviews">One</a>
            <a href="/p/1">One again</a>
            <a href="/p/2">Two</a>
        "#;
        assert_eq!(
            links(html, "a"),
            vec!["https://example.com/p/1", "https://example.com/p/2"]
        );
    }

    #[test]
    fn test_extract_attribute_urls() {
        let html = r#"
            <div class="gallery">
                <img data-src="/img/a.jpg">
                <img data-src="https://cdn.example.com/b.jpg">
                <img src="/ignored.jpg">
            </div>
        "#;
        let selector = Selector::parse(".gallery img").unwrap();
        assert_eq!(
            extract_attribute_urls(html, &selector, "data-src", &base_url()),
            vec!["https://example.com/img/a.jpg", "https://cdn.example.com/b.jpg"]
        );
    }
}
