use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, REFERER, USER_AGENT,
};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::app::ports::PageFetcher;
use crate::common::constants::{RATE_LIMIT_BACKOFF_FACTOR, USER_AGENTS};
use crate::common::error::Result;
use crate::config::FetchSettings;

enum AttemptError {
    Transport(reqwest::Error),
    Status(StatusCode),
    ShortBody(usize),
}

/// reqwest-backed fetch-with-fallback: rotating user agents, linear backoff,
/// and a certificate-lenient client once the strict one hits a transport error.
pub struct ReqwestFetcher {
    secure: reqwest::Client,
    insecure: reqwest::Client,
    use_insecure: AtomicBool,
    next_agent: AtomicUsize,
    settings: FetchSettings,
    referer: Option<String>,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings, referer: Option<String>) -> Result<Self> {
        let headers = browser_headers();
        let secure = reqwest::Client::builder()
            .default_headers(headers.clone())
            .timeout(settings.timeout)
            .build()?;
        let insecure = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(true)
            .build()?;

        let agents = settings.user_agents.len().max(1);
        let offset = rand::thread_rng().gen_range(0..agents);

        Ok(Self {
            secure,
            insecure,
            use_insecure: AtomicBool::new(false),
            next_agent: AtomicUsize::new(offset),
            settings,
            referer,
        })
    }

    fn next_user_agent(&self) -> &str {
        let idx = self.next_agent.fetch_add(1, Ordering::Relaxed);
        if self.settings.user_agents.is_empty() {
            USER_AGENTS[idx % USER_AGENTS.len()]
        } else {
            &self.settings.user_agents[idx % self.settings.user_agents.len()]
        }
    }

    async fn attempt(&self, client: &reqwest::Client, url: &str, user_agent: &str) -> std::result::Result<String, AttemptError> {
        let mut request = client.get(url).header(USER_AGENT, user_agent);
        if let Some(referer) = &self.referer {
            request = request.header(REFERER, referer.as_str());
        }

        let response = request.send().await.map_err(AttemptError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status));
        }

        let body = response.text().await.map_err(AttemptError::Transport)?;
        if body.len() < self.settings.min_body_bytes {
            return Err(AttemptError::ShortBody(body.len()));
        }
        Ok(body)
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

#[async_trait]
impl PageFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        let max_retries = self.settings.max_retries.max(1);

        for attempt in 1..=max_retries {
            let user_agent = self.next_user_agent();
            let insecure = self.use_insecure.load(Ordering::Relaxed);
            let client = if insecure { &self.insecure } else { &self.secure };

            debug!(url, attempt, insecure, "fetching");
            let result = match self.attempt(client, url, user_agent).await {
                Err(AttemptError::Transport(e)) if !insecure => {
                    warn!(url, error = %e, "transport error, retrying without certificate verification");
                    self.use_insecure.store(true, Ordering::Relaxed);
                    self.attempt(&self.insecure, url, user_agent).await
                }
                other => other,
            };

            let mut backoff = self.settings.delay * attempt;
            match result {
                Ok(body) => return Some(body),
                Err(AttemptError::Transport(e)) => {
                    warn!(url, attempt, error = %e, "request failed");
                }
                Err(AttemptError::Status(status)) if status == StatusCode::TOO_MANY_REQUESTS => {
                    backoff *= RATE_LIMIT_BACKOFF_FACTOR;
                    warn!(url, attempt, backoff_ms = backoff.as_millis() as u64, "rate limited");
                }
                Err(AttemptError::Status(status)) => {
                    warn!(url, attempt, status = status.as_u16(), "unexpected status");
                }
                Err(AttemptError::ShortBody(len)) => {
                    warn!(url, attempt, len, "response body too short");
                }
            }

            if attempt < max_retries {
                tokio::time::sleep(backoff).await;
            }
        }

        warn!(url, max_retries, "giving up after retries");
        None
    }
}
