//! HTML extraction
//!
//! Pure functions over page markup: the structured product extractor and
//! the link helpers used by listing discovery.

mod links;
mod product;

pub use links::{extract_attribute_urls, extract_links};
pub use product::extract_product;
