use crate::common::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_DATABASE_PATH, DEFAULT_DELAY_MS, DEFAULT_MAX_RETRIES,
    DEFAULT_MIN_BODY_BYTES, DEFAULT_OUTPUT_DIR, DEFAULT_POOL_SIZE, DEFAULT_TIMEOUT_SECS,
    USER_AGENTS,
};
use crate::common::error::{Result, ScraperError};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Tunables for fetch-with-fallback
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agents: Vec<String>,
    pub max_retries: u32,
    /// Fixed delay between requests; also the unit of the linear retry backoff
    pub delay: Duration,
    pub timeout: Duration,
    /// Bodies shorter than this are treated as failed attempts
    pub min_body_bytes: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agents: USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
            max_retries: DEFAULT_MAX_RETRIES,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            min_body_bytes: DEFAULT_MIN_BODY_BYTES,
        }
    }
}

/// Database settings
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    pub pool_size: usize,
    pub batch_size: usize,
}

/// Application configuration, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    pub fetch: FetchSettings,
    pub database: DatabaseSettings,
    pub output_dir: PathBuf,
    pub sites_config: Option<PathBuf>,
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut fetch = FetchSettings::default();
        if let Some(ua) = get("SCRAPER_USER_AGENT") {
            fetch.user_agents = vec![ua];
        }
        if let Some(v) = get("SCRAPER_DELAY_MS") {
            fetch.delay = Duration::from_millis(parse_var("SCRAPER_DELAY_MS", &v)?);
        }
        if let Some(v) = get("SCRAPER_MAX_RETRIES") {
            fetch.max_retries = parse_var("SCRAPER_MAX_RETRIES", &v)?;
            if fetch.max_retries == 0 {
                return Err(ScraperError::Config(
                    "SCRAPER_MAX_RETRIES must be at least 1".to_string(),
                ));
            }
        }
        if let Some(v) = get("SCRAPER_TIMEOUT_SECS") {
            fetch.timeout = Duration::from_secs(parse_var("SCRAPER_TIMEOUT_SECS", &v)?);
        }

        let pool_size = match get("DB_POOL_SIZE") {
            Some(v) => parse_var("DB_POOL_SIZE", &v)?,
            None => DEFAULT_POOL_SIZE,
        };
        let batch_size = match get("DB_BATCH_SIZE") {
            Some(v) => parse_var("DB_BATCH_SIZE", &v)?,
            None => DEFAULT_BATCH_SIZE,
        };
        if pool_size == 0 || batch_size == 0 {
            return Err(ScraperError::Config(
                "DB_POOL_SIZE and DB_BATCH_SIZE must be positive".to_string(),
            ));
        }

        Ok(Self {
            fetch,
            database: DatabaseSettings {
                path: get("DATABASE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
                pool_size,
                batch_size,
            },
            output_dir: get("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            sites_config: get("SITES_CONFIG").map(PathBuf::from),
        })
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ScraperError::Config(format!("Invalid value '{value}' for {key}: {e}")))
}
