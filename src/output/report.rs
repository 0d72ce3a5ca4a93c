use std::collections::BTreeMap;
use std::path::Path;

use askama::Template;
use chrono::{DateTime, Local};
use tracing::info;

use crate::common::constants::DEFAULT_CATEGORY_NAME;
use crate::common::error::Result;
use crate::common::types::ScrapedProduct;
use crate::normalize::format_price;

/// Grey "No Image" box shown when a product has no image or it fails to load
pub const PLACEHOLDER_IMAGE: &str = "data:image/svg+xml;charset=UTF-8,%3Csvg%20width%3D%22200%22%20height%3D%22200%22%20xmlns%3D%22http%3A%2F%2Fwww.w3.org%2F2000%2Fsvg%22%20viewBox%3D%220%200%20200%20200%22%3E%3Crect%20width%3D%22200%22%20height%3D%22200%22%20fill%3D%22%23EEEEEE%22%3E%3C%2Frect%3E%3Ctext%20x%3D%2274%22%20y%3D%22104%22%20fill%3D%22%23AAAAAA%22%3ENo%20Image%3C%2Ftext%3E%3C%2Fsvg%3E";

struct CategoryCount {
    name: String,
    count: usize,
}

struct ReportCard<'a> {
    name: &'a str,
    price: String,
    category: &'a str,
    image_src: &'a str,
    product_url: &'a str,
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate<'a> {
    title: &'a str,
    generated_at: String,
    total: usize,
    categories: Vec<CategoryCount>,
    products: Vec<ReportCard<'a>>,
    placeholder: &'a str,
}

/// Render the static product report; all product text is HTML-escaped
pub fn render_report(title: &str, products: &[ScrapedProduct], generated_at: DateTime<Local>) -> Result<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let cards: Vec<ReportCard<'_>> = products
        .iter()
        .map(|p| {
            let category = p.category.as_deref().unwrap_or(DEFAULT_CATEGORY_NAME);
            *counts.entry(category).or_default() += 1;
            ReportCard {
                name: &p.name,
                price: format_price(p.price),
                category,
                image_src: p.image_url.as_deref().filter(|u| !u.is_empty()).unwrap_or(PLACEHOLDER_IMAGE),
                product_url: p.product_url.as_deref().unwrap_or_default(),
            }
        })
        .collect();

    let template = ReportTemplate {
        title,
        generated_at: generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        total: products.len(),
        categories: counts
            .into_iter()
            .map(|(name, count)| CategoryCount {
                name: name.to_string(),
                count,
            })
            .collect(),
        products: cards,
        placeholder: PLACEHOLDER_IMAGE,
    };
    Ok(template.render()?)
}

pub fn write_report(path: &Path, title: &str, products: &[ScrapedProduct]) -> Result<()> {
    let html = render_report(title, products, Local::now())?;
    std::fs::write(path, html)?;
    info!(path = %path.display(), "Generated HTML report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price: Option<f64>, category: Option<&str>) -> ScrapedProduct {
        ScrapedProduct {
            name: name.to_string(),
            price,
            category: category.map(str::to_string),
            product_url: Some("https://shop.test/p?a=1&b=2".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_report_escapes_product_text() {
        let products = vec![product("<script>alert(1)</script> Screen", Some(12.5), Some("Parts & Tools"))];
        let html = render_report("MobileSentrix", &products, Local::now()).unwrap();

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Parts &amp; Tools"));
        assert!(html.contains("$12.50"));
    }

    #[test]
    fn test_report_counts_and_placeholders() {
        let products = vec![
            product("Battery A", None, Some("Batteries")),
            product("Battery B", Some(3.0), Some("Batteries")),
            product("Loose Screw", Some(0.5), None),
        ];
        let html = render_report("Shop", &products, Local::now()).unwrap();

        assert!(html.contains("<strong>Total Products:</strong> 3"));
        assert!(html.contains("<strong>Categories:</strong> 2"));
        assert!(html.contains("Batteries (2)"));
        assert!(html.contains("Uncategorized (1)"));
        assert!(html.contains("N/A"));
        assert!(html.contains("No%20Image"));
    }
}
