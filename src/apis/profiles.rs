use crate::common::constants::{MOBILESENTRIX_BASE_URL, MOBILESENTRIX_REGEX_SITE, MOBILESENTRIX_SITE};
use serde::{Deserialize, Serialize};

/// How product cards are located on a listing page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStrategy {
    /// CSS selector chains, falling back to raw-markup patterns when no card matches
    Css,
    /// Raw-markup patterns only
    Regex,
}

/// Per-site selector configuration driving the scrape pipeline.
///
/// Every list is an ordered fallback chain. Fields omitted from a TOML site
/// file take the generic defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    pub name: String,
    pub base_url: String,
    /// Landing page listing the categories; defaults to `base_url`
    pub start_url: Option<String>,
    pub strategy: ExtractionStrategy,
    pub category_link_selectors: Vec<String>,
    pub category_href_keywords: Vec<String>,
    pub excluded_href_keywords: Vec<String>,
    pub category_title_selectors: Vec<String>,
    pub product_card_selectors: Vec<String>,
    pub name_selectors: Vec<String>,
    pub price_selectors: Vec<String>,
    pub image_selectors: Vec<String>,
    pub image_attributes: Vec<String>,
    pub sku_selectors: Vec<String>,
    pub description_selectors: Vec<String>,
    pub spec_row_selectors: Vec<String>,
    /// `{url}` and `{page}` are substituted; used from page 2 on
    pub pagination_template: String,
    pub max_pages_per_category: u32,
    pub max_products_per_category: usize,
    pub fetch_details: bool,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_url: String::new(),
            start_url: None,
            strategy: ExtractionStrategy::Css,
            category_link_selectors: strings(&[
                "ul.nav-menu li.nav-item a",
                "nav ul li a",
                ".navigation a",
                ".menu a",
                ".categories a",
            ]),
            category_href_keywords: strings(&["category", "product"]),
            excluded_href_keywords: strings(&["login", "account", "cart"]),
            category_title_selectors: strings(&["h1.category-title", "h1.page-title", "h1"]),
            product_card_selectors: strings(&[
                "div.product-card",
                ".product-item",
                "li.product",
                ".item.product",
                ".product",
            ]),
            name_selectors: strings(&[
                "h2.product-title a",
                "a.product-link",
                ".product-name a",
                "h3 a",
                ".item-title a",
                ".product-item-link",
                ".product-title",
                "h2 a",
                ".item-name",
            ]),
            price_selectors: strings(&[
                "span.price--main",
                "span.price",
                ".product-price",
                ".price-box",
                ".amount",
                ".price-container",
                ".special-price",
                "[data-price-type=finalPrice]",
            ]),
            image_selectors: strings(&[
                "img.product-img",
                "img.primary-image",
                ".product-image img",
                ".product-photo img",
                "img.main-image",
                ".product-item-photo img",
                "img[data-role=product-image]",
                "img",
            ]),
            image_attributes: strings(&["src", "data-src", "data-original", "data-lazy-src"]),
            sku_selectors: strings(&[".product-sku", "[itemprop=sku]", ".sku"]),
            description_selectors: strings(&[
                "div.product-description",
                ".product.attribute.description",
                "#product-details",
                ".product-details",
                ".product-info",
            ]),
            spec_row_selectors: strings(&[
                ".product-specs tr",
                "table.specs-table tr",
                "#product-attribute-specs-table tr",
                ".additional-attributes tr",
            ]),
            pagination_template: "{url}?page={page}".to_string(),
            max_pages_per_category: 2,
            max_products_per_category: 30,
            fetch_details: true,
        }
    }
}

impl SiteProfile {
    pub fn start_url(&self) -> &str {
        self.start_url.as_deref().unwrap_or(&self.base_url)
    }

    /// URL of the given 1-based listing page of a category
    pub fn page_url(&self, category_url: &str, page: u32) -> String {
        if page <= 1 {
            return category_url.to_string();
        }
        let mut template = self.pagination_template.clone();
        if category_url.contains('?') && template.starts_with("{url}?") {
            template = template.replacen("{url}?", "{url}&", 1);
        }
        template
            .replace("{url}", category_url)
            .replace("{page}", &page.to_string())
    }

    /// Product listing scraper using CSS chains with detail-page enrichment
    pub fn mobilesentrix() -> Self {
        Self {
            name: MOBILESENTRIX_SITE.to_string(),
            base_url: MOBILESENTRIX_BASE_URL.to_string(),
            ..Self::default()
        }
    }

    /// Markup-pattern variant for pages where the CSS chains find nothing
    pub fn mobilesentrix_regex() -> Self {
        Self {
            name: MOBILESENTRIX_REGEX_SITE.to_string(),
            base_url: MOBILESENTRIX_BASE_URL.to_string(),
            strategy: ExtractionStrategy::Regex,
            category_link_selectors: Vec::new(),
            fetch_details: false,
            max_pages_per_category: 1,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url() {
        let profile = SiteProfile::mobilesentrix();
        assert_eq!(profile.page_url("https://x.test/cat", 1), "https://x.test/cat");
        assert_eq!(profile.page_url("https://x.test/cat", 2), "https://x.test/cat?page=2");
        assert_eq!(
            profile.page_url("https://x.test/cat?sort=asc", 3),
            "https://x.test/cat?sort=asc&page=3"
        );
    }

    #[test]
    fn test_custom_pagination_template() {
        let profile = SiteProfile {
            pagination_template: "{url}/page/{page}".to_string(),
            ..SiteProfile::default()
        };
        assert_eq!(profile.page_url("https://x.test/cat", 2), "https://x.test/cat/page/2");
    }

    #[test]
    fn test_start_url_defaults_to_base() {
        let profile = SiteProfile::mobilesentrix();
        assert_eq!(profile.start_url(), MOBILESENTRIX_BASE_URL);
    }
}
