/// Site name constants to ensure consistency across the codebase
// Site names (used in CLI and output file prefixes)
pub const MOBILESENTRIX_SITE: &str = "mobilesentrix";
pub const MOBILESENTRIX_REGEX_SITE: &str = "mobilesentrix_regex";

pub const MOBILESENTRIX_BASE_URL: &str = "https://www.mobilesentrix.com/";

// Catalog defaults
pub const DEFAULT_CATEGORY_NAME: &str = "Uncategorized";
pub const DEFAULT_BRAND: &str = "Generic";
pub const DEFAULT_STOCK_QUANTITY: i64 = 10;
pub const DEFAULT_IS_FEATURED: bool = false;
pub const DEFAULT_IS_NEW: bool = true;
pub const PRICE_UNAVAILABLE: &str = "N/A";

// Fetch defaults
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MIN_BODY_BYTES: usize = 500;
/// Multiplier applied to the linear backoff after an HTTP 429.
pub const RATE_LIMIT_BACKOFF_FACTOR: u32 = 5;

// Store defaults
pub const DEFAULT_DATABASE_PATH: &str = "data/catalog.db";
pub const DEFAULT_POOL_SIZE: usize = 4;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Browser user agents rotated across fetch attempts.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:90.0) Gecko/20100101 Firefox/90.0",
];

/// Brands matched by case-insensitive substring against product names, in
/// priority order. Model names map onto their maker.
pub const KNOWN_BRANDS: &[(&str, &str)] = &[
    ("apple", "Apple"),
    ("iphone", "Apple"),
    ("ipad", "Apple"),
    ("macbook", "Apple"),
    ("samsung", "Samsung"),
    ("galaxy", "Samsung"),
    ("google", "Google"),
    ("pixel", "Google"),
    ("sony", "Sony"),
    ("lg", "LG"),
    ("motorola", "Motorola"),
    ("oneplus", "OnePlus"),
    ("xiaomi", "Xiaomi"),
];

/// Get all built-in site names
pub fn get_supported_sites() -> Vec<&'static str> {
    vec![MOBILESENTRIX_SITE, MOBILESENTRIX_REGEX_SITE]
}
