//! Single-request fetch.

use async_trait::async_trait;
use tracing::debug;

use super::{FetchResult, Fetcher};
use crate::error::ScrapeResult;
use crate::http_client::HttpClient;
use crate::models::FetchStrategy;
use crate::profiles::SiteProfile;

/// Fetches a page with one HTTP GET and parses the body once.
#[derive(Clone)]
pub struct StaticFetcher {
    client: HttpClient,
}

impl StaticFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Static
    }

    async fn fetch(&self, url: &str, _profile: Option<&SiteProfile>) -> ScrapeResult<FetchResult> {
        let (final_url, body) = self.client.get_text(url).await?;
        debug!("Fetched {} ({} bytes)", final_url, body.len());
        Ok(FetchResult::new(url, final_url, &body, FetchStrategy::Static))
    }
}
