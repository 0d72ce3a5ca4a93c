use crate::common::constants::{DEFAULT_BRAND, KNOWN_BRANDS};
use crate::common::types::SpecMap;

/// Infer a product's brand.
///
/// A scraped `brand` specification wins; otherwise the first known brand whose
/// lower-cased name appears in the product name, else "Generic".
pub fn infer_brand(name: &str, specs: &SpecMap) -> String {
    if let Some(brand) = specs.get("brand").map(|b| b.trim()).filter(|b| !b.is_empty()) {
        return brand.to_string();
    }

    let lowered = name.to_lowercase();
    KNOWN_BRANDS
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, brand)| brand.to_string())
        .unwrap_or_else(|| DEFAULT_BRAND.to_string())
}
