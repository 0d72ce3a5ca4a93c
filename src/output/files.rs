use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::common::constants::DEFAULT_CATEGORY_NAME;
use crate::common::error::Result;
use crate::common::types::ScrapedProduct;
use crate::normalize::{format_price, infer_brand, slugify};

#[derive(Serialize)]
struct CsvRow<'a> {
    name: &'a str,
    sku: &'a str,
    price: String,
    description: &'a str,
    category: &'a str,
    brand: String,
    image_url: &'a str,
    product_url: &'a str,
    specifications: String,
}

impl<'a> CsvRow<'a> {
    fn from_product(product: &'a ScrapedProduct) -> Result<Self> {
        Ok(Self {
            name: &product.name,
            sku: product.sku.as_deref().unwrap_or_default(),
            price: match product.price {
                Some(value) => format!("{value:.2}"),
                None => format_price(None),
            },
            description: product.description.as_deref().unwrap_or_default(),
            category: category_of(product),
            brand: product
                .brand
                .clone()
                .unwrap_or_else(|| infer_brand(&product.name, &product.specifications)),
            image_url: product.image_url.as_deref().unwrap_or_default(),
            product_url: product.product_url.as_deref().unwrap_or_default(),
            specifications: if product.specifications.is_empty() {
                String::new()
            } else {
                serde_json::to_string(&product.specifications)?
            },
        })
    }
}

fn category_of(product: &ScrapedProduct) -> &str {
    product
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(DEFAULT_CATEGORY_NAME)
}

/// Pretty-printed JSON array of scraped records
pub fn write_json(path: &Path, products: &[ScrapedProduct]) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, products)?;
    info!(path = %path.display(), count = products.len(), "Saved products to JSON file");
    Ok(())
}

/// Read a JSON array of scraped records written by `write_json` (or the converter).
///
/// Entries that do not describe a product (no name, wrong field types) are
/// logged and skipped.
pub fn read_json(path: &Path) -> Result<Vec<ScrapedProduct>> {
    let file = File::open(path)?;
    let entries: Vec<serde_json::Value> = serde_json::from_reader(std::io::BufReader::new(file))?;

    let mut products = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<ScrapedProduct>(entry) {
            Ok(product) => products.push(product),
            Err(e) => warn!(path = %path.display(), index, error = %e, "skipping unreadable record"),
        }
    }
    Ok(products)
}

pub fn write_csv(path: &Path, products: &[ScrapedProduct]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for product in products {
        writer.serialize(CsvRow::from_product(product)?)?;
    }
    writer.flush()?;
    info!(path = %path.display(), count = products.len(), "Saved products to CSV");
    Ok(())
}

/// Plain tab-separated listing: Name, Price, URL, Image URL
pub fn write_tsv(path: &Path, products: &[ScrapedProduct]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    writer.write_record(["Name", "Price", "URL", "Image URL"])?;
    for product in products {
        let price = format_price(product.price);
        writer.write_record([
            product.name.as_str(),
            price.as_str(),
            product.product_url.as_deref().unwrap_or_default(),
            product.image_url.as_deref().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), "Saved products to text file");
    Ok(())
}

/// One CSV per category, named `{prefix}_{category}.csv`
pub fn write_category_csvs(dir: &Path, prefix: &str, products: &[ScrapedProduct]) -> Result<Vec<PathBuf>> {
    let mut by_category: BTreeMap<String, Vec<ScrapedProduct>> = BTreeMap::new();
    for product in products {
        let mut key = slugify(category_of(product)).replace('-', "_");
        // Keep clear of the site-wide {prefix}_products.csv
        if key == "products" {
            key.push_str("_category");
        }
        if key.is_empty() {
            warn!(category = category_of(product), "category without a file-safe name skipped");
            continue;
        }
        by_category.entry(key).or_default().push(product.clone());
    }

    let mut paths = Vec::with_capacity(by_category.len());
    for (key, group) in by_category {
        let path = dir.join(format!("{prefix}_{key}.csv"));
        write_csv(&path, &group)?;
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn products() -> Vec<ScrapedProduct> {
        vec![
            ScrapedProduct {
                name: "iPhone 12 Screen".to_string(),
                price: Some(89.0),
                category: Some("iPhone Parts".to_string()),
                product_url: Some("https://shop.test/a".to_string()),
                specifications: [("display".to_string(), "6.1 inch".to_string())].into_iter().collect(),
                ..Default::default()
            },
            ScrapedProduct {
                name: "Mystery Cable".to_string(),
                price_text: Some("Call".to_string()),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_csv_columns_and_sentinels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &products()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["name", "sku", "price", "description", "category", "brand", "image_url", "product_url", "specifications"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][2], "89.00");
        assert_eq!(&rows[0][5], "Apple");
        assert_eq!(&rows[0][8], r#"{"display":"6.1 inch"}"#);
        assert_eq!(&rows[1][2], "N/A");
        assert_eq!(&rows[1][4], "Uncategorized");
        assert_eq!(&rows[1][5], "Generic");
    }

    #[test]
    fn test_category_split_and_tsv() {
        let dir = tempdir().unwrap();
        let paths = write_category_csvs(dir.path(), "shop", &products()).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["shop_iphone_parts.csv", "shop_uncategorized.csv"]);

        let tsv = dir.path().join("shop_products.txt");
        write_tsv(&tsv, &products()).unwrap();
        let text = std::fs::read_to_string(&tsv).unwrap();
        assert!(text.starts_with("Name\tPrice\tURL\tImage URL\n"));
        assert!(text.contains("iPhone 12 Screen\t$89.00\thttps://shop.test/a\t\n"));
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("products.json");
        write_json(&path, &products()).unwrap();
        assert_eq!(read_json(&path).unwrap(), products());
    }

    #[test]
    fn test_read_json_skips_bad_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mixed.json");
        std::fs::write(&path, r#"[{"name": "Good"}, {"price": 3.0}, {"name": "Also Good", "price": null}]"#).unwrap();

        let products = read_json(&path).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[1].name, "Also Good");
    }

    #[test]
    fn test_read_json_null_specifications() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("converted.json");
        std::fs::write(&path, r#"[{"name": "Charging Port", "specifications": null}]"#).unwrap();

        let products = read_json(&path).unwrap();
        assert_eq!(products.len(), 1);
        assert!(products[0].specifications.is_empty());
    }
}
