use crate::common::constants::{
    DEFAULT_CATEGORY_NAME, DEFAULT_IS_FEATURED, DEFAULT_IS_NEW, DEFAULT_STOCK_QUANTITY,
};
use crate::common::error::{Result, ScraperError};
use crate::common::types::{ProductRecord, ProductSpecification, ScrapedProduct};
use crate::normalize::{infer_brand, slugify};
use sha2::{Digest, Sha256};

/// Build a deterministic SKU from the product name and its slug.
///
/// The prefix is the first three letters of each word (upper-cased, at most
/// ten characters); the suffix is the first eight hex digits of the slug hash,
/// so re-runs produce the same SKU for the same product.
pub fn generate_sku(name: &str, slug: &str) -> String {
    let prefix: String = name
        .split_whitespace()
        .flat_map(|word| word.chars().filter(|c| c.is_ascii_alphanumeric()).take(3))
        .map(|c| c.to_ascii_uppercase())
        .take(10)
        .collect();
    let digest = Sha256::digest(slug.as_bytes());
    let hash = hex::encode(&digest[..4]);
    if prefix.is_empty() {
        format!("SKU-{}", hash.to_uppercase())
    } else {
        format!("SKU-{}-{}", prefix, hash.to_uppercase())
    }
}

/// Turn a scraped record into a catalog row.
///
/// Fails only when the name produces an empty slug; everything else degrades
/// to defaults (price 0, stock 10, "Uncategorized", "Generic").
pub fn to_product_record(product: &ScrapedProduct) -> Result<ProductRecord> {
    let name = product.name.trim();
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(ScraperError::MissingField(format!(
            "product name '{}' does not produce a slug",
            product.name
        )));
    }

    let sku = product
        .sku
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| generate_sku(name, &slug));

    let brand = match product.brand.as_deref().map(str::trim) {
        Some(brand) if !brand.is_empty() => brand.to_string(),
        _ => infer_brand(name, &product.specifications),
    };

    let category = product
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY_NAME)
        .to_string();

    Ok(ProductRecord {
        name: name.to_string(),
        slug,
        sku: Some(sku),
        description: product.description.clone().unwrap_or_default(),
        price: product.price.filter(|p| *p >= 0.0).unwrap_or(0.0),
        stock_quantity: DEFAULT_STOCK_QUANTITY,
        is_featured: DEFAULT_IS_FEATURED,
        is_new: DEFAULT_IS_NEW,
        image_url: product.image_url.clone().filter(|u| !u.is_empty()),
        category,
        brand,
        specification: ProductSpecification::from_map(&product.specifications),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraped(name: &str) -> ScrapedProduct {
        ScrapedProduct {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let record = to_product_record(&scraped("Galaxy S21 Battery")).unwrap();
        assert_eq!(record.slug, "galaxy-s21-battery");
        assert_eq!(record.price, 0.0);
        assert_eq!(record.stock_quantity, 10);
        assert!(!record.is_featured);
        assert!(record.is_new);
        assert_eq!(record.category, "Uncategorized");
        assert_eq!(record.brand, "Samsung");
        assert!(record.specification.is_none());
    }

    #[test]
    fn test_scraped_values_kept() {
        let mut product = scraped("iPhone 12 Screen");
        product.price = Some(89.99);
        product.sku = Some("MS-12345".into());
        product.category = Some("iPhone Parts".into());
        product.specifications.insert("display".into(), "OLED".into());

        let record = to_product_record(&product).unwrap();
        assert_eq!(record.price, 89.99);
        assert_eq!(record.sku.as_deref(), Some("MS-12345"));
        assert_eq!(record.category, "iPhone Parts");
        assert_eq!(record.specification.unwrap().display.as_deref(), Some("OLED"));
    }

    #[test]
    fn test_generated_sku_is_stable() {
        let a = generate_sku("iPhone 12 Screen", "iphone-12-screen");
        let b = generate_sku("iPhone 12 Screen", "iphone-12-screen");
        assert_eq!(a, b);
        assert!(a.starts_with("SKU-IPH12SCR-"));
    }

    #[test]
    fn test_nameless_record_rejected() {
        assert!(to_product_record(&scraped("???")).is_err());
    }
}
