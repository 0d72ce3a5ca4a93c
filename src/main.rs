use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use parts_scraper::apis::ProfileRegistry;
use parts_scraper::app::ports::PageFetcher;
use parts_scraper::common::constants::MOBILESENTRIX_SITE;
use parts_scraper::config::Config;
use parts_scraper::convert::convert_csv;
use parts_scraper::infra::http_client::ReqwestFetcher;
use parts_scraper::logging;
use parts_scraper::output;
use parts_scraper::pipeline::Pipeline;
use parts_scraper::storage::{CatalogRepository, ConnectionPool};

#[derive(Parser)]
#[command(name = "parts_scraper")]
#[command(about = "Scrape, normalize and store phone-parts product catalogs")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape site profiles, export files and upsert into the catalog
    Run {
        /// Site profiles to run (comma-separated). Defaults to mobilesentrix
        #[arg(long)]
        sites: Option<String>,
        /// Only write files, skip the database
        #[arg(long)]
        no_db: bool,
        /// Override OUTPUT_DIR
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Upsert a JSON record list into the catalog
    Import {
        #[arg(long)]
        input: PathBuf,
    },
    /// Normalize a CSV file into CSV + JSON
    Convert {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Render the HTML report for a JSON record list
    Report {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List available site profiles
    Sites,
}

fn open_repository(config: &Config) -> Result<CatalogRepository> {
    let pool = ConnectionPool::open(&config.database.path, config.database.pool_size)
        .with_context(|| format!("opening database {}", config.database.path.display()))?;
    Ok(CatalogRepository::new(pool))
}

async fn run_sites(config: Config, registry: &ProfileRegistry, site_names: &[String], no_db: bool) -> Result<()> {
    let repository = if no_db { None } else { Some(open_repository(&config)?) };
    let fetch_settings = config.fetch.clone();
    let pipeline = Pipeline::new(config, repository);

    for site_name in site_names {
        let Some(profile) = registry.get(site_name) else {
            warn!(site = %site_name, "Unknown site specified");
            println!("⚠️  Unknown site: {} (available: {})", site_name, registry.names().join(", "));
            continue;
        };

        let fetcher: Arc<dyn PageFetcher> =
            Arc::new(ReqwestFetcher::new(fetch_settings.clone(), Some(profile.base_url.clone()))?);

        match pipeline.run_site(profile, fetcher).await {
            Ok(result) => {
                println!("\n📊 Pipeline Results for {}:", site_name);
                println!("   Run id: {}", result.run_id);
                println!("   Categories: {}", result.categories);
                println!("   Products scraped: {}", result.products_scraped);
                println!("   Pages fetched: {} ({} failed)", result.pages_fetched, result.pages_failed);
                println!("   Items skipped: {}", result.items_skipped);
                if let Some(files) = &result.exported {
                    println!("   Output file: {}", files.csv.display());
                    println!("   Report: {}", files.report.display());
                }
                if let Some(saved) = &result.saved {
                    println!(
                        "   Saved: {} ({} new, {} updated, {} errors)",
                        saved.total(),
                        saved.inserted,
                        saved.updated,
                        saved.errors
                    );
                }
            }
            Err(e) => {
                error!("Pipeline failed: {}", e);
                println!("❌ Pipeline failed for {}: {}", site_name, e);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    let registry = ProfileRegistry::load(config.sites_config.as_deref())?;

    match cli.command {
        Commands::Run { sites, no_db, output_dir } => {
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            let site_names: Vec<String> = match sites {
                Some(list) => list
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => vec![MOBILESENTRIX_SITE.to_string()],
            };
            println!("🚀 Running scrape for: {}", site_names.join(", "));
            run_sites(config, &registry, &site_names, no_db).await?;
        }
        Commands::Import { input } => {
            let pipeline = Pipeline::new(config.clone(), Some(open_repository(&config)?));
            let summary = pipeline
                .import_file(&input)
                .await
                .with_context(|| format!("importing {}", input.display()))?;
            println!(
                "✅ Imported {} products ({} new, {} updated, {} errors)",
                summary.total(),
                summary.inserted,
                summary.updated,
                summary.errors
            );
        }
        Commands::Convert { input, output_dir } => {
            let dir = output_dir.unwrap_or_else(|| config.output_dir.clone());
            let summary = convert_csv(&input, &dir).with_context(|| format!("converting {}", input.display()))?;
            println!("✅ Converted {} rows", summary.rows);
            println!("   Columns: {}", summary.columns.join(", "));
            println!("   CSV: {}", summary.csv_path.display());
            println!("   JSON: {}", summary.json_path.display());
        }
        Commands::Report { input, output: report_path } => {
            let products = output::read_json(&input).with_context(|| format!("reading {}", input.display()))?;
            if products.is_empty() {
                bail!("no products in {}", input.display());
            }
            let path = report_path.unwrap_or_else(|| input.with_extension("html"));
            let title = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Product")
                .trim_end_matches("_products")
                .to_string();
            output::write_report(&path, &title, &products)?;
            println!("✅ Report written to {}", path.display());
        }
        Commands::Sites => {
            for profile in registry.profiles() {
                println!("{:<24} {:?}  {}", profile.name, profile.strategy, profile.start_url());
            }
        }
    }

    info!("Done");
    Ok(())
}
