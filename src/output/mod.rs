//! File exports for a scraped record list.

pub mod files;
pub mod report;

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::common::error::Result;
use crate::common::types::ScrapedProduct;

pub use files::{read_json, write_category_csvs, write_csv, write_json, write_tsv};
pub use report::{render_report, write_report};

/// Paths written by one export
#[derive(Debug, Clone, Default)]
pub struct ExportedFiles {
    pub json: PathBuf,
    pub csv: PathBuf,
    pub tsv: PathBuf,
    pub report: PathBuf,
    pub categories: Vec<PathBuf>,
}

impl ExportedFiles {
    pub fn count(&self) -> usize {
        4 + self.categories.len()
    }
}

/// Write every export format for one site under `dir`, prefixed with the site name
pub fn export_all(dir: &Path, site: &str, title: &str, products: &[ScrapedProduct]) -> Result<Option<ExportedFiles>> {
    if products.is_empty() {
        warn!(site, "No data to save");
        return Ok(None);
    }
    std::fs::create_dir_all(dir)?;

    let files = ExportedFiles {
        json: dir.join(format!("{site}_products.json")),
        csv: dir.join(format!("{site}_products.csv")),
        tsv: dir.join(format!("{site}_products.txt")),
        report: dir.join(format!("{site}_report.html")),
        categories: Vec::new(),
    };

    write_json(&files.json, products)?;
    write_csv(&files.csv, products)?;
    write_tsv(&files.tsv, products)?;
    write_report(&files.report, title, products)?;
    let categories = write_category_csvs(dir, site, products)?;

    Ok(Some(ExportedFiles { categories, ..files }))
}
