use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::apis::SiteProfile;
use crate::app::ports::PageFetcher;
use crate::common::constants::DEFAULT_CATEGORY_NAME;
use crate::common::error::Result;
use crate::common::types::{CategoryLink, ScrapedProduct};
use crate::extract::{merge_detail, Extractor};

/// Products and counters from scraping one site
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeReport {
    pub site: String,
    pub categories: usize,
    pub products: Vec<ScrapedProduct>,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub items_skipped: usize,
}

impl ScrapeReport {
    fn requests(&self) -> usize {
        self.pages_fetched + self.pages_failed
    }
}

/// Use case for scraping one site: landing page, category listings, detail pages
pub struct ScrapeUseCase {
    profile: SiteProfile,
    extractor: Extractor,
    fetcher: Arc<dyn PageFetcher>,
    request_delay: Duration,
}

impl ScrapeUseCase {
    pub fn new(profile: SiteProfile, fetcher: Arc<dyn PageFetcher>, request_delay: Duration) -> Result<Self> {
        let extractor = Extractor::new(&profile)?;
        Ok(Self {
            profile,
            extractor,
            fetcher,
            request_delay,
        })
    }

    /// Scrape every category reachable from the landing page.
    ///
    /// Pages that cannot be fetched are counted and skipped; the run itself only
    /// fails on programming errors in the profile.
    #[instrument(skip(self), fields(site = %self.profile.name))]
    pub async fn run(&self) -> Result<ScrapeReport> {
        let mut report = ScrapeReport {
            site: self.profile.name.clone(),
            ..Default::default()
        };

        let start_url = self.profile.start_url().to_string();
        let Some(landing) = self.get(&mut report, &start_url).await else {
            warn!(url = %start_url, "landing page unavailable, nothing scraped");
            return Ok(report);
        };

        let categories = self.extractor.extract_category_links(&landing);
        info!(count = categories.len(), "found categories");

        if categories.is_empty() {
            // Single-listing sites: the landing page is the product list
            report.categories = 1;
            let page = self.extractor.extract_products(&landing, DEFAULT_CATEGORY_NAME);
            report.items_skipped += page.skipped;
            self.collect(&mut report, page.products).await;
        } else {
            report.categories = categories.len();
            for category in &categories {
                self.scrape_category(&mut report, category).await;
            }
        }

        info!(
            products = report.products.len(),
            pages_fetched = report.pages_fetched,
            pages_failed = report.pages_failed,
            skipped = report.items_skipped,
            "site scrape finished"
        );
        Ok(report)
    }

    async fn scrape_category(&self, report: &mut ScrapeReport, category: &CategoryLink) {
        info!(category = %category.name, url = %category.url, "scraping category");

        let mut category_name = category.name.clone();
        for page in 1..=self.profile.max_pages_per_category.max(1) {
            let url = self.profile.page_url(&category.url, page);
            let Some(html) = self.get(report, &url).await else {
                break;
            };

            if page == 1 {
                if let Some(title) = self.extractor.extract_category_title(&html) {
                    category_name = title;
                }
            }

            let extracted = self.extractor.extract_products(&html, &category_name);
            report.items_skipped += extracted.skipped;
            if extracted.products.is_empty() {
                debug!(page, "no products on page, stopping pagination");
                break;
            }
            info!(page, count = extracted.products.len(), "products found on page");
            self.collect(report, extracted.products).await;
        }
    }

    /// Enrich from detail pages when configured, then append unseen products
    async fn collect(&self, report: &mut ScrapeReport, products: Vec<ScrapedProduct>) {
        for mut product in products {
            let duplicate = report.products.iter().any(|seen| match (&seen.product_url, &product.product_url) {
                (Some(a), Some(b)) => a == b,
                (None, None) => seen.name.eq_ignore_ascii_case(&product.name),
                _ => false,
            });
            if duplicate {
                continue;
            }

            if self.profile.fetch_details {
                if let Some(url) = product.product_url.clone() {
                    if let Some(html) = self.get(report, &url).await {
                        merge_detail(&mut product, self.extractor.extract_detail(&html));
                    }
                }
            }
            report.products.push(product);
        }
    }

    /// Fetch with the fixed inter-request pause
    async fn get(&self, report: &mut ScrapeReport, url: &str) -> Option<String> {
        if report.requests() > 0 && !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        let body = self.fetcher.fetch(url).await;
        match body {
            Some(_) => report.pages_fetched += 1,
            None => {
                report.pages_failed += 1;
                warn!(url, "page fetch failed");
            }
        }
        body
    }
}
