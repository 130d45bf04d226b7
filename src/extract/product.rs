//! Structured product extraction from embedded JSON-LD
//!
//! This is the single place where shape differences between catalog sites
//! are canonicalized: capitalized vs lowercase keys, scalar vs list values,
//! nested brand objects, and SKUs hidden inside offers.

use crate::state::{dedup_preserving_order, ScrapedRecord};
use crate::ExtractionError;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use std::collections::HashMap;

const JSON_LD_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

/// Extracts the first schema.org `Product` declared on the page
///
/// Blocks are scanned in document order. Each block is parsed strictly and,
/// on failure, once more with line-break noise replaced by spaces before the
/// next block is tried.
///
/// # Returns
///
/// * `Ok(ScrapedRecord)` - The canonicalized product
/// * `Err(ExtractionError::NoProduct)` - No parseable `Product` block
/// * `Err(ExtractionError::MissingName)` - The product block has no name
///
/// # Example
///
/// ```
/// use catalog_spider::extract_product;
///
/// let html = r#"<script type="application/ld+json">
///     {"@type": "Product", "name": "Bench", "Brand": {"Name": "Acme"}}
/// </script>"#;
/// let record = extract_product(html).unwrap();
/// assert_eq!(record.name, "Bench");
/// assert_eq!(record.brands, vec!["Acme"]);
/// ```
pub fn extract_product(html: &str) -> Result<ScrapedRecord, ExtractionError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(JSON_LD_SELECTOR).map_err(|_| ExtractionError::NoProduct)?;

    for script in document.select(&selector) {
        let text: String = script.text().collect();
        let Some(block) = parse_block(&text) else {
            tracing::trace!("Skipping unparseable JSON-LD block");
            continue;
        };

        if let Some(product) = find_product(&block) {
            return record_from_product(product);
        }
    }

    Err(ExtractionError::NoProduct)
}

/// Parses a block, retrying once with line breaks and tabs replaced
fn parse_block(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok().or_else(|| {
        let normalized = text.replace(['\r', '\n', '\t'], " ");
        serde_json::from_str(&normalized).ok()
    })
}

/// Finds the first Product object in a block (object, array, or `@graph`)
fn find_product(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(object) => {
            if is_product(object) {
                return Some(object);
            }
            get_ci(object, "@graph").and_then(find_product)
        }
        Value::Array(items) => items.iter().find_map(find_product),
        _ => None,
    }
}

fn is_product(object: &Map<String, Value>) -> bool {
    match get_ci(object, "@type") {
        Some(Value::String(kind)) => kind == "Product",
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some("Product")),
        _ => false,
    }
}

fn record_from_product(product: &Map<String, Value>) -> Result<ScrapedRecord, ExtractionError> {
    // Keys fold to lowercase; when two spellings collide the last one in map order wins
    let fields: HashMap<String, &Value> = product
        .iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect();

    let name = fields
        .get("name")
        .and_then(|v| scalar_string(v))
        .filter(|name| !name.trim().is_empty())
        .ok_or(ExtractionError::MissingName)?;

    let image_links = fields
        .get("image")
        .map(|v| collect_values(v, image_url))
        .unwrap_or_default();

    let brands = fields
        .get("brand")
        .map(|v| collect_values(v, brand_name))
        .unwrap_or_default();

    let categories = fields
        .get("category")
        .map(|v| collect_values(v, scalar_string))
        .unwrap_or_default();

    let description = fields.get("description").and_then(|v| scalar_string(v));
    let mpn = fields.get("mpn").and_then(|v| scalar_string(v));

    let mut skus = fields
        .get("sku")
        .map(|v| collect_values(v, scalar_string))
        .unwrap_or_default();
    if let Some(offers) = fields.get("offers") {
        skus.extend(collect_values(offers, offer_sku));
    }

    Ok(ScrapedRecord {
        name: name.trim().to_string(),
        image_links: dedup_preserving_order(image_links),
        mpn,
        description,
        brands: dedup_preserving_order(brands),
        categories: dedup_preserving_order(categories),
        skus: dedup_preserving_order(skus),
    })
}

/// Applies `extract` to a scalar or to each element of a list
fn collect_values(value: &Value, extract: fn(&Value) -> Option<String>) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(extract).collect(),
        other => extract(other).into_iter().collect(),
    }
}

/// Strings pass through; numbers are rendered (SKUs are often numeric)
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::Object(object) => get_ci(object, "url")
            .or_else(|| get_ci(object, "contentUrl"))
            .and_then(scalar_string),
        other => scalar_string(other),
    }
}

fn brand_name(value: &Value) -> Option<String> {
    match value {
        Value::Object(object) => get_ci(object, "name").and_then(scalar_string),
        other => scalar_string(other),
    }
}

fn offer_sku(value: &Value) -> Option<String> {
    match value {
        Value::Object(object) => get_ci(object, "sku").and_then(scalar_string),
        _ => None,
    }
}

/// Case-insensitive key lookup
fn get_ci<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}
