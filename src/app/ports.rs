use async_trait::async_trait;

/// Page retrieval seam between the scrape use case and the network.
///
/// Implementations never fail loudly: a page that could not be retrieved
/// after all attempts is `None`, and the caller skips it.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}
