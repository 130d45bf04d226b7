use serde::{Deserialize, Serialize};

/// A canonical product record scraped from one content page
///
/// Records are produced by the extractor (optionally enriched by a site
/// strategy) and never mutated once appended to the crawl state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScrapedRecord {
    pub name: String,

    #[serde(default)]
    pub image_links: Vec<String>,

    #[serde(default)]
    pub mpn: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub brands: Vec<String>,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub skus: Vec<String>,
}

impl ScrapedRecord {
    /// Creates a record with only a name set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_links: Vec::new(),
            mpn: None,
            description: None,
            brands: Vec::new(),
            categories: Vec::new(),
            skus: Vec::new(),
        }
    }
}

/// Removes duplicate values while keeping first-seen order
pub fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_preserving_order() {
        let values = vec![
            "b".to_string(),
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "a".to_string(),
        ];
        assert_eq!(dedup_preserving_order(values), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_missing_optional_fields_deserialize() {
        let record: ScrapedRecord = serde_json::from_str(r#"{"name": "Bench"}"#).unwrap();
        assert_eq!(record, ScrapedRecord::new("Bench"));
    }

    #[test]
    fn test_serialized_field_names() {
        let mut record = ScrapedRecord::new("Bar");
        record.mpn = Some("MPN-1".to_string());
        let value = serde_json::to_value(&record).unwrap();
        for field in [
            "name",
            "image_links",
            "mpn",
            "description",
            "brands",
            "categories",
            "skus",
        ] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
    }
}
