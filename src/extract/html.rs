use crate::apis::{ExtractionStrategy, SiteProfile};
use crate::common::error::{Result, ScraperError};
use crate::common::types::{CategoryLink, ScrapedProduct, SpecMap};
use crate::extract::{RegexChain, SelectorChain};
use crate::normalize::{normalize_spec_key, parse_price, title_from_slug};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<]+?>").unwrap());

const MAX_CATEGORY_NAME_LEN: usize = 50;
const MIN_PATTERN_NAME_LEN: usize = 5;
const NAVIGATION_WORDS: &[&str] = &["home", "next", "previous", "category"];

// Raw-markup product blocks, most specific first
const BLOCK_PATTERNS: &[&str] = &[
    r#"<div\s+class=["'](?:product|item)[^"']*["'][^>]*>(.*?)</div>\s*(?:</div>|<div)"#,
    r#"<li[^>]*class=["'][^"']*product[^"']*["'][^>]*>(.*?)</li>"#,
    r#"<article[^>]*>(.*?)</article>"#,
];

// Link + name inside a block: image alt, span, heading, link text
const LINK_PATTERNS: &[&str] = &[
    r#"<a\s+href=["']([^"']+)["'][^>]*>.*?<img[^>]*alt=["']([^"']+)["']"#,
    r#"<a\s+href=["']([^"']+)["'][^>]*>.*?<span[^>]*>([^<]+)</span>"#,
    r#"<a\s+href=["']([^"']+)["'][^>]*>.*?<h[2-4][^>]*>([^<]+)</h[2-4]>"#,
    r#"<a\s+href=["']([^"']+)["'][^>]*>([^<]+)</a>"#,
];

const BARE_LINK_PATTERN: &str = r#"<a\s+href=["']([^"']+)["']"#;
const IMAGE_PATTERN: &str = r#"<img[^>]*src=["']([^"']+)["']"#;
const PRICE_PATTERNS: &[&str] = &[
    r#"<span[^>]*class=["'][^"']*(?:price|amount)[^"']*["'][^>]*>(.*?)</span>"#,
    r#"\$([\d,\.]+)"#,
];

/// Products found on one listing page
#[derive(Debug, Default, Clone)]
pub struct ExtractedPage {
    pub products: Vec<ScrapedProduct>,
    /// Cards that matched but yielded no usable product
    pub skipped: usize,
}

/// Fields read from a product detail page
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProductDetail {
    pub description: Option<String>,
    pub specifications: SpecMap,
    pub image_url: Option<String>,
    pub price_text: Option<String>,
    pub sku: Option<String>,
}

/// Fill the gaps of a listing record with what its detail page provided
pub fn merge_detail(product: &mut ScrapedProduct, detail: ProductDetail) {
    if product.description.is_none() {
        product.description = detail.description;
    }
    if product.image_url.is_none() {
        product.image_url = detail.image_url;
    }
    if product.sku.is_none() {
        product.sku = detail.sku;
    }
    if product.price.is_none() {
        if let Some(text) = detail.price_text {
            product.price = parse_price(&text);
            product.price_text = Some(text);
        }
    }
    for (key, value) in detail.specifications {
        product.specifications.entry(key).or_insert(value);
    }
}

/// Derive a display name from the last path segment of a URL:
/// `/iphone-12-lcd.html` -> "Iphone 12 Lcd"
pub fn name_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').find(|s| !s.is_empty())?;
    let stem = segment
        .strip_suffix(".html")
        .or_else(|| segment.strip_suffix(".htm"))
        .unwrap_or(segment);
    let name = title_from_slug(stem);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_tags(markup: &str) -> String {
    TAGS.replace_all(markup, "").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Profile-driven extractor with every chain compiled up front
#[derive(Debug, Clone)]
pub struct Extractor {
    site: String,
    base: Url,
    strategy: ExtractionStrategy,
    category_href_keywords: Vec<String>,
    excluded_href_keywords: Vec<String>,
    image_attributes: Vec<String>,
    max_products: usize,
    category_links: SelectorChain,
    anchors: SelectorChain,
    category_titles: SelectorChain,
    cards: SelectorChain,
    names: SelectorChain,
    prices: SelectorChain,
    images: SelectorChain,
    skus: SelectorChain,
    descriptions: SelectorChain,
    spec_rows: SelectorChain,
    spec_cells: SelectorChain,
    blocks: RegexChain,
    block_links: RegexChain,
    bare_link: RegexChain,
    block_image: RegexChain,
    block_prices: RegexChain,
}

impl Extractor {
    pub fn new(profile: &SiteProfile) -> Result<Self> {
        let base = Url::parse(&profile.base_url).map_err(|e| {
            ScraperError::Config(format!("Invalid base_url '{}' for {}: {e}", profile.base_url, profile.name))
        })?;

        Ok(Self {
            site: profile.name.clone(),
            base,
            strategy: profile.strategy,
            category_href_keywords: lowercase_all(&profile.category_href_keywords),
            excluded_href_keywords: lowercase_all(&profile.excluded_href_keywords),
            image_attributes: profile.image_attributes.clone(),
            max_products: profile.max_products_per_category,
            category_links: SelectorChain::new(&profile.category_link_selectors)?,
            anchors: SelectorChain::new(&["a[href]"])?,
            category_titles: SelectorChain::new(&profile.category_title_selectors)?,
            cards: SelectorChain::new(&profile.product_card_selectors)?,
            names: SelectorChain::new(&profile.name_selectors)?,
            prices: SelectorChain::new(&profile.price_selectors)?,
            images: SelectorChain::new(&profile.image_selectors)?,
            skus: SelectorChain::new(&profile.sku_selectors)?,
            descriptions: SelectorChain::new(&profile.description_selectors)?,
            spec_rows: SelectorChain::new(&profile.spec_row_selectors)?,
            spec_cells: SelectorChain::new(&["th, td"])?,
            blocks: RegexChain::new(BLOCK_PATTERNS)?,
            block_links: RegexChain::new(LINK_PATTERNS)?,
            bare_link: RegexChain::new(&[BARE_LINK_PATTERN])?,
            block_image: RegexChain::new(&[IMAGE_PATTERN])?,
            block_prices: RegexChain::new(PRICE_PATTERNS)?,
        })
    }

    /// Resolve a possibly relative link against the site base URL
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with("data:") || href.starts_with("javascript:") {
            return None;
        }
        self.base.join(href).ok().map(String::from)
    }

    /// Category links from a landing page, de-duplicated by URL in page order
    pub fn extract_category_links(&self, html: &str) -> Vec<CategoryLink> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let mut anchors = self.category_links.all(root);
        if anchors.is_empty() {
            debug!(site = %self.site, "no category selector matched, scanning all links");
            anchors = self
                .anchors
                .all(root)
                .into_iter()
                .filter(|a| {
                    a.value()
                        .attr("href")
                        .map(|h| h.to_lowercase().contains("category"))
                        .unwrap_or(false)
                })
                .collect();
        }

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for anchor in anchors {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if !self.is_category_href(href) {
                continue;
            }
            let Some(url) = self.resolve(href) else {
                continue;
            };
            let text = element_text(anchor);
            let name = if text.is_empty() {
                match name_from_url(&url) {
                    Some(name) => name,
                    None => continue,
                }
            } else {
                text
            };
            if name.chars().count() > MAX_CATEGORY_NAME_LEN {
                continue;
            }
            if seen.insert(url.clone()) {
                links.push(CategoryLink { name, url });
            }
        }

        debug!(site = %self.site, count = links.len(), "category links extracted");
        links
    }

    fn is_category_href(&self, href: &str) -> bool {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return false;
        }
        let lowered = href.to_lowercase();
        self.category_href_keywords.iter().any(|k| lowered.contains(k.as_str()))
            && !self.excluded_href_keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// Heading naming the category on a listing page
    pub fn extract_category_title(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        self.category_titles
            .first(document.root_element())
            .map(element_text)
            .filter(|t| !t.is_empty())
    }

    /// Product records from a listing page
    pub fn extract_products(&self, html: &str, category: &str) -> ExtractedPage {
        let mut page = ExtractedPage::default();

        if self.strategy == ExtractionStrategy::Css {
            let document = Html::parse_document(html);
            let cards = self.cards.all(document.root_element());
            if !cards.is_empty() {
                for card in cards.into_iter().take(self.max_products) {
                    match self.parse_card(card, category) {
                        Some(product) => page.products.push(product),
                        None => page.skipped += 1,
                    }
                }
            }
        }

        if page.products.is_empty() && page.skipped == 0 {
            debug!(site = %self.site, "falling back to markup patterns");
            page = self.extract_products_by_pattern(html, category);
        }

        page.products = dedupe_products(page.products);
        page
    }

    fn parse_card(&self, card: ElementRef<'_>, category: &str) -> Option<ScrapedProduct> {
        let name_el = self.names.first(card);
        let href = name_el
            .and_then(|el| el.value().attr("href"))
            .or_else(|| self.anchors.first(card).and_then(|a| a.value().attr("href")));
        let product_url = href.and_then(|h| self.resolve(h));

        let mut name = name_el.map(element_text).unwrap_or_default();
        if name.is_empty() {
            name = product_url.as_deref().and_then(name_from_url).unwrap_or_default();
        }
        if name.is_empty() {
            warn!(site = %self.site, "product card without a name skipped");
            return None;
        }

        let price_text = self.prices.first(card).map(element_text).filter(|t| !t.is_empty());
        let image_url = self.images.first(card).and_then(|img| self.image_source(img));
        let sku = self.skus.first(card).map(element_text).filter(|t| !t.is_empty());

        Some(ScrapedProduct {
            name,
            product_url,
            price: price_text.as_deref().and_then(parse_price),
            price_text,
            image_url,
            category: Some(category.to_string()),
            sku,
            source: Some(self.site.clone()),
            ..Default::default()
        })
    }

    fn image_source(&self, img: ElementRef<'_>) -> Option<String> {
        self.image_attributes
            .iter()
            .filter_map(|attr| img.value().attr(attr))
            .find_map(|value| self.resolve(value))
    }

    fn extract_products_by_pattern(&self, html: &str, category: &str) -> ExtractedPage {
        let mut page = ExtractedPage::default();

        for pattern in self.blocks.patterns() {
            let blocks: Vec<&str> = pattern
                .captures_iter(html)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .collect();
            if blocks.is_empty() {
                continue;
            }
            debug!(site = %self.site, count = blocks.len(), "potential product blocks found");

            let mut attempt = ExtractedPage::default();
            for block in blocks.into_iter().take(self.max_products) {
                match self.parse_block(block, category) {
                    Some(product) => attempt.products.push(product),
                    None => attempt.skipped += 1,
                }
            }
            if !attempt.products.is_empty() {
                page = attempt;
                break;
            }
            page.skipped += attempt.skipped;
        }

        page
    }

    fn parse_block(&self, block: &str, category: &str) -> Option<ScrapedProduct> {
        let (href, raw_name) = match self.block_links.first_captures(block) {
            Some(caps) => (caps.get(1)?.as_str().to_string(), caps.get(2).map(|m| m.as_str().to_string())),
            None => {
                let caps = self.bare_link.first_captures(block)?;
                (caps.get(1)?.as_str().to_string(), None)
            }
        };
        let product_url = self.resolve(&href);

        let name = match raw_name {
            Some(raw) => strip_tags(&raw),
            None => name_from_url(&href).unwrap_or_default(),
        };
        if name.chars().count() < MIN_PATTERN_NAME_LEN
            || NAVIGATION_WORDS.contains(&name.to_lowercase().as_str())
        {
            return None;
        }

        let image_url = self
            .block_image
            .first_captures(block)
            .and_then(|c| c.get(1).and_then(|m| self.resolve(m.as_str())));
        let price_text = self
            .block_prices
            .first_captures(block)
            .and_then(|c| c.get(1).map(|m| strip_tags(m.as_str())))
            .filter(|t| !t.is_empty());

        Some(ScrapedProduct {
            name,
            product_url,
            price: price_text.as_deref().and_then(parse_price),
            price_text,
            image_url,
            category: Some(category.to_string()),
            source: Some(self.site.clone()),
            ..Default::default()
        })
    }

    /// Description, specification rows, image, price and SKU from a detail page
    pub fn extract_detail(&self, html: &str) -> ProductDetail {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let mut specifications = SpecMap::new();
        for row in self.spec_rows.all(root) {
            let cells: Vec<String> = self.spec_cells.all(row).into_iter().map(element_text).collect();
            if cells.len() < 2 {
                continue;
            }
            let key = normalize_spec_key(&cells[0]);
            if key.is_empty() || cells[1].is_empty() {
                continue;
            }
            specifications.entry(key).or_insert_with(|| cells[1].clone());
        }

        ProductDetail {
            description: self.descriptions.first(root).map(element_text).filter(|t| !t.is_empty()),
            specifications,
            image_url: self.images.first(root).and_then(|img| self.image_source(img)),
            price_text: self.prices.first(root).map(element_text).filter(|t| !t.is_empty()),
            sku: self.skus.first(root).map(element_text).filter(|t| !t.is_empty()),
        }
    }
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

/// Drop repeated products, keyed by URL (or name when there is no URL)
pub(crate) fn dedupe_products(products: Vec<ScrapedProduct>) -> Vec<ScrapedProduct> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter(|p| {
            let key = p.product_url.clone().unwrap_or_else(|| p.name.to_lowercase());
            seen.insert(key)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        let profile = SiteProfile {
            name: "test".into(),
            base_url: "https://shop.test/".into(),
            ..SiteProfile::default()
        };
        Extractor::new(&profile).unwrap()
    }

    #[test]
    fn test_category_links_filtered_and_resolved() {
        let html = r##"
            <nav><ul>
              <li><a href="/category/iphone-parts">iPhone Parts</a></li>
              <li><a href="/category/samsung-parts">Samsung Parts</a></li>
              <li><a href="/category/iphone-parts">iPhone Parts again</a></li>
              <li><a href="/customer/account/login?category=1">Login</a></li>
              <li><a href="#top">Top</a></li>
              <li><a href="/about">About</a></li>
            </ul></nav>
        "##;
        let links = extractor().extract_category_links(html);
        assert_eq!(
            links,
            vec![
                CategoryLink {
                    name: "iPhone Parts".into(),
                    url: "https://shop.test/category/iphone-parts".into()
                },
                CategoryLink {
                    name: "Samsung Parts".into(),
                    url: "https://shop.test/category/samsung-parts".into()
                },
            ]
        );
    }

    #[test]
    fn test_category_links_fall_back_to_all_anchors() {
        let html = r#"<div><a href="/category/tools"></a><a href="/product/x">X</a></div>"#;
        let links = extractor().extract_category_links(html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].name, "Tools");
    }

    #[test]
    fn test_product_cards() {
        let html = r#"
            <div class="product-card">
              <h2 class="product-title"><a href="/iphone-12-lcd.html">iPhone 12 LCD Assembly</a></h2>
              <span class="price">$1,049.50</span>
              <img class="product-img" data-src="/media/lcd.jpg">
            </div>
            <div class="product-card">
              <a href="/galaxy-s21-battery.html"><img src="/media/bat.jpg"></a>
              <span class="price">Call for price</span>
            </div>
            <div class="product-card"><span class="price">$3</span></div>
        "#;
        let page = extractor().extract_products(html, "Parts");
        assert_eq!(page.products.len(), 2);
        assert_eq!(page.skipped, 1);

        let first = &page.products[0];
        assert_eq!(first.name, "iPhone 12 LCD Assembly");
        assert_eq!(first.product_url.as_deref(), Some("https://shop.test/iphone-12-lcd.html"));
        assert_eq!(first.price, Some(1049.5));
        assert_eq!(first.image_url.as_deref(), Some("https://shop.test/media/lcd.jpg"));
        assert_eq!(first.category.as_deref(), Some("Parts"));

        let second = &page.products[1];
        assert_eq!(second.name, "Galaxy S21 Battery");
        assert_eq!(second.price, None);
        assert_eq!(second.price_text.as_deref(), Some("Call for price"));
    }

    #[test]
    fn test_markup_pattern_fallback() {
        let html = r#"
            <ul>
              <li class="grid-product"><a href="/p/pixel-7-screen"><span>Pixel 7 Screen</span></a> $59.99</li>
              <li class="grid-product"><a href="/p/next"><span>Next</span></a></li>
            </ul>
        "#;
        let page = extractor().extract_products(html, "Google");
        assert_eq!(page.products.len(), 1);
        let product = &page.products[0];
        assert_eq!(product.name, "Pixel 7 Screen");
        assert_eq!(product.price, Some(59.99));
        assert_eq!(product.product_url.as_deref(), Some("https://shop.test/p/pixel-7-screen"));
    }

    #[test]
    fn test_detail_page() {
        let html = r#"
            <div class="product-description"> Genuine   OEM part. </div>
            <table class="product-specs">
              <tr><th>Display</th><td>6.1 inch</td></tr>
              <tr><th>Operating System:</th><td>iOS</td></tr>
              <tr><td>lonely cell</td></tr>
            </table>
            <span class="price">$20.00</span>
        "#;
        let detail = extractor().extract_detail(html);
        assert_eq!(detail.description.as_deref(), Some("Genuine OEM part."));
        assert_eq!(detail.specifications.get("display").map(String::as_str), Some("6.1 inch"));
        assert_eq!(detail.specifications.get("operating_system").map(String::as_str), Some("iOS"));
        assert_eq!(detail.specifications.len(), 2);

        let mut product = ScrapedProduct { name: "x".into(), ..Default::default() };
        merge_detail(&mut product, detail);
        assert_eq!(product.price, Some(20.0));
        assert_eq!(product.specifications.len(), 2);
    }

    #[test]
    fn test_name_from_url() {
        assert_eq!(name_from_url("https://x.test/a/iphone-12-lcd.html").as_deref(), Some("Iphone 12 Lcd"));
        assert_eq!(name_from_url("https://x.test/category/tools/").as_deref(), Some("Tools"));
        assert_eq!(name_from_url("/"), None);
    }
}
