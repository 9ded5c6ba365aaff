//! DuckDuckGo HTML search provider.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

use super::{DiscoveryError, SearchProvider};
use crate::error::ScrapeError;
use crate::http_client::HttpClient;

/// Search provider backed by DuckDuckGo's HTML endpoint.
#[derive(Clone)]
pub struct DuckDuckGoProvider {
    client: HttpClient,
    search_url: String,
}

impl DuckDuckGoProvider {
    pub fn new(client: HttpClient, search_url: impl Into<String>) -> Self {
        Self {
            client,
            search_url: search_url.into(),
        }
    }

    /// Parse result links from a results page, in page order.
    pub fn parse_results(html: &str) -> Result<Vec<String>, DiscoveryError> {
        let document = Html::parse_document(html);

        // Results are <a class="result__a"> elements
        let result_selector = Selector::parse("a.result__a")
            .map_err(|e| DiscoveryError::Parse(format!("Failed to parse selector: {:?}", e)))?;

        let links: Vec<String> = document
            .select(&result_selector)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(extract_url)
            .collect();

        debug!("Parsed {} results from DuckDuckGo", links.len());
        Ok(links)
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, DiscoveryError> {
        debug!("DuckDuckGo search: {}", query);

        let response = self
            .client
            .get(&self.search_url, &[("q", query), ("kl", "us-en")])
            .await
            .map_err(|e| match e {
                ScrapeError::Network(e) => DiscoveryError::Http(e),
                other => DiscoveryError::Unavailable(other.to_string()),
            })?;

        if !response.status.is_success() {
            return Err(DiscoveryError::Unavailable(format!(
                "DuckDuckGo returned {}",
                response.status
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| DiscoveryError::Parse(format!("Failed to read response text: {}", e)))?;
        Self::parse_results(&html)
    }
}

/// Unwrap DuckDuckGo's redirect links; pass direct links through.
pub fn extract_url(href: &str) -> Option<String> {
    let href = href.trim();
    if href.contains("duckduckgo.com/l/") {
        // //duckduckgo.com/l/?uddg=<encoded_url>&rut=...
        let start = href.find("uddg=")? + "uddg=".len();
        let encoded = &href[start..];
        let end = encoded.find('&').unwrap_or(encoded.len());
        urlencoding::decode(&encoded[..end])
            .ok()
            .map(|s| s.into_owned())
    } else if href.starts_with("http://") || href.starts_with("https://") {
        Some(href.to_string())
    } else if href.starts_with("//") {
        Some(format!("https:{}", href))
    } else {
        None
    }
}
