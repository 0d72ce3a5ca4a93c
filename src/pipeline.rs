use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::apis::SiteProfile;
use crate::app::ports::PageFetcher;
use crate::app::scrape_use_case::ScrapeUseCase;
use crate::common::error::Result;
use crate::common::types::{ProductRecord, SaveSummary, ScrapedProduct};
use crate::config::Config;
use crate::normalize::{title_from_slug, to_product_record};
use crate::output::{self, ExportedFiles};
use crate::storage::CatalogRepository;

/// Result of a complete pipeline run for one site
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub site: String,
    pub run_id: String,
    pub categories: usize,
    pub products_scraped: usize,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub items_skipped: usize,
    #[serde(skip)]
    pub exported: Option<ExportedFiles>,
    pub saved: Option<SaveSummary>,
}

/// Scrape, export and persist, one site at a time
pub struct Pipeline {
    config: Config,
    repository: Option<CatalogRepository>,
}

impl Pipeline {
    /// Without a repository the pipeline only writes files
    pub fn new(config: Config, repository: Option<CatalogRepository>) -> Self {
        Self { config, repository }
    }

    /// Run the complete pipeline for one site profile
    #[instrument(skip(self, profile, fetcher), fields(site = %profile.name, run_id = tracing::field::Empty))]
    pub async fn run_site(&self, profile: &SiteProfile, fetcher: Arc<dyn PageFetcher>) -> Result<PipelineResult> {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());
        info!("🚀 Starting pipeline for {}", profile.name);

        // Step 1: Scrape
        let use_case = ScrapeUseCase::new(profile.clone(), fetcher, self.config.fetch.delay)?;
        let report = use_case.run().await?;
        info!("✅ Scraped {} products from {} categories", report.products.len(), report.categories);

        // Step 2: Export files
        let exported = output::export_all(
            &self.config.output_dir,
            &profile.name,
            &title_from_slug(&profile.name),
            &report.products,
        )?;
        if let Some(files) = &exported {
            info!("💾 Wrote {} files to {}", files.count(), self.config.output_dir.display());
        }

        // Step 3: Persist
        let saved = match &self.repository {
            Some(_) if report.products.is_empty() => None,
            Some(_) => Some(self.persist(&report.products).await?),
            None => None,
        };

        Ok(PipelineResult {
            site: profile.name.clone(),
            run_id,
            categories: report.categories,
            products_scraped: report.products.len(),
            pages_fetched: report.pages_fetched,
            pages_failed: report.pages_failed,
            items_skipped: report.items_skipped,
            exported,
            saved,
        })
    }

    /// Normalize scraped records and upsert them in batches.
    ///
    /// Records that cannot be normalized count as errors; without a repository
    /// nothing is written and the summary is empty.
    pub async fn persist(&self, products: &[ScrapedProduct]) -> Result<SaveSummary> {
        let Some(repository) = &self.repository else {
            warn!("No database configured, skipping persistence");
            return Ok(SaveSummary::default());
        };

        let mut rejected = 0;
        let records: Vec<ProductRecord> = products
            .iter()
            .filter_map(|product| match to_product_record(product) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(name = %product.name, error = %e, "record rejected");
                    rejected += 1;
                    None
                }
            })
            .collect();

        let mut summary = repository.save_products(&records, self.config.database.batch_size).await?;
        summary.errors += rejected;
        info!(
            "💾 Saved {} products ({} new, {} updated, {} errors)",
            summary.total(),
            summary.inserted,
            summary.updated,
            summary.errors
        );
        Ok(summary)
    }

    /// Load a JSON record list and upsert it
    #[instrument(skip(self))]
    pub async fn import_file(&self, path: &Path) -> Result<SaveSummary> {
        let products = output::read_json(path)?;
        info!("📥 Importing {} records from {}", products.len(), path.display());
        self.persist(&products).await
    }
}
