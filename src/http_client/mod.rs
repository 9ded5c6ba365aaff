//! HTTP client with per-domain politeness.

mod user_agent;

pub use user_agent::{resolve_user_agent, AgentMode, IDENTIFIER};

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::config::HttpConfig;
use crate::error::ScrapeError;
use crate::rate_limiter::RateLimiter;

/// HTTP response wrapper.
pub struct HttpResponse {
    pub status: StatusCode,
    /// URL after redirects.
    pub final_url: String,
    pub headers: HashMap<String, String>,
    response: Response,
}

impl HttpResponse {
    /// 2xx, or a 3xx that was not followed.
    pub fn is_acceptable(&self) -> bool {
        self.status.is_success() || self.status.is_redirection()
    }

    /// Get response body as text.
    pub async fn text(self) -> Result<String, reqwest::Error> {
        self.response.text().await
    }
}

/// HTTP client shared by the search provider and the static fetcher.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    request_delay: Duration,
    rate_limiter: RateLimiter,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(config: &HttpConfig, rate_limiter: RateLimiter) -> Result<Self, ScrapeError> {
        Self::with_timeout(
            config,
            Duration::from_secs(config.timeout_secs),
            rate_limiter,
        )
    }

    /// Create a client with an explicit timeout (search requests use their own).
    pub fn with_timeout(
        config: &HttpConfig,
        timeout: Duration,
        rate_limiter: RateLimiter,
    ) -> Result<Self, ScrapeError> {
        let user_agent = resolve_user_agent(config.user_agent.as_deref());
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .cookie_store(true)
            .build()
            .map_err(|e| ScrapeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            request_delay: Duration::from_millis(config.request_delay_ms),
            rate_limiter,
        })
    }

    /// Make a GET request with optional query parameters.
    /// Uses adaptive rate limiting per domain.
    pub async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<HttpResponse, ScrapeError> {
        let domain = self.rate_limiter.acquire(url).await;

        let mut request = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9");
        if !query.is_empty() {
            request = request.query(query);
        }

        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        debug!(
            "GET {} -> {} in {}ms",
            url,
            status.as_u16(),
            start.elapsed().as_millis()
        );

        if let Some(ref domain) = domain {
            self.rate_limiter
                .report_status(domain, status.as_u16())
                .await;
        }

        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.to_string(), v.to_string());
            }
        }

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        Ok(HttpResponse {
            status,
            final_url: response.url().to_string(),
            headers,
            response,
        })
    }

    /// GET a page and return its body, failing on non-2xx/3xx statuses.
    pub async fn get_text(&self, url: &str) -> Result<(String, String), ScrapeError> {
        let response = self.get(url, &[]).await?;
        if !response.is_acceptable() {
            return Err(ScrapeError::HttpStatus {
                status: response.status.as_u16(),
                url: url.to_string(),
            });
        }
        let final_url = response.final_url.clone();
        let body = response.text().await?;
        Ok((final_url, body))
    }
}
