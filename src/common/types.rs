use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Free-form specification pairs as scraped, keyed by normalized label
pub type SpecMap = BTreeMap<String, String>;

/// A flat product record as extracted from a listing or detail page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedProduct {
    pub name: String,
    #[serde(default)]
    pub product_url: Option<String>,
    /// Parsed price; `None` when the page text could not be parsed
    #[serde(default)]
    pub price: Option<f64>,
    /// Price text exactly as it appeared on the page
    #[serde(default)]
    pub price_text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub specifications: SpecMap,
    #[serde(default)]
    pub source: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<SpecMap, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<SpecMap>::deserialize(deserializer)?.unwrap_or_default())
}

/// A category link discovered on a site's landing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLink {
    pub name: String,
    pub url: String,
}

/// Fixed specification columns attached 1:1 to a product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSpecification {
    pub display: Option<String>,
    pub processor: Option<String>,
    pub memory: Option<String>,
    pub storage: Option<String>,
    pub camera: Option<String>,
    pub battery: Option<String>,
    pub connectivity: Option<String>,
    pub operating_system: Option<String>,
    /// Remaining key/value pairs serialized as a JSON object
    pub additional_features: Option<String>,
}

/// A normalized catalog row ready for upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub slug: String,
    pub sku: Option<String>,
    pub description: String,
    pub price: f64,
    pub stock_quantity: i64,
    pub is_featured: bool,
    pub is_new: bool,
    pub image_url: Option<String>,
    pub category: String,
    pub brand: String,
    pub specification: Option<ProductSpecification>,
}

/// A category row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCategory {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
}

/// A product row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProduct {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub sku: Option<String>,
    pub description: String,
    pub price: f64,
    pub stock_quantity: i64,
    pub is_featured: bool,
    pub is_new: bool,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
    pub brand: String,
}

/// Outcome of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: i64,
    pub created: bool,
}

/// Counters from persisting a list of products
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveSummary {
    pub inserted: usize,
    pub updated: usize,
    pub errors: usize,
}

impl SaveSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }

    pub fn merge(&mut self, other: &SaveSummary) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.errors += other.errors;
    }
}
