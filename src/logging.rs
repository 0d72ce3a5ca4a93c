use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_DIR: &str = "logs";
pub const LOG_FILE_PREFIX: &str = "scraper.log";
const DEFAULT_DIRECTIVE: &str = "parts_scraper=info";

/// `RUST_LOG` when set and valid, otherwise info for this crate only
fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber: compact lines on stderr plus a daily
/// rolling JSON file under `logs/`.
///
/// Dropping the returned guard flushes pending file writes, so `main` holds
/// it until exit.
pub fn init_logging() -> WorkerGuard {
    if let Err(e) = std::fs::create_dir_all(LOG_DIR) {
        eprintln!("cannot create {LOG_DIR}/: {e}");
    }
    let (file_writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(LOG_DIR, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(filter_from(std::env::var("RUST_LOG").ok().as_deref()))
        .with(fmt::layer().json().with_writer(file_writer))
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .init();

    guard
}
