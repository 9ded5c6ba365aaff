//! Career page discovery.
//!
//! A known URL is trusted as-is. Otherwise the company name is expanded
//! into search queries, and result links are kept as candidates when their
//! path or query mentions a career token and their domain looks like the
//! company's own.

pub mod duckduckgo;
pub mod query;

pub use duckduckgo::DuckDuckGoProvider;
pub use query::{slugify, QueryBuilder};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Config, DiscoveryConfig, DiscoveryPolicy};
use crate::http_client::HttpClient;
use crate::models::{CandidateUrl, CompanyRef, DiscoveryResult};
use crate::rate_limiter::RateLimiter;
use crate::url_utils::{is_valid_url, path_and_query};

/// Errors from a search provider.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Search unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A search engine returning result links in rank order.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> Result<Vec<String>, DiscoveryError>;
}

/// How strongly a candidate looks like the company's own domain.
pub const SCORE_GUESSED_DOMAIN: u8 = 3;
pub const SCORE_SLUG_IN_DOMAIN: u8 = 2;
pub const SCORE_SLUG_IN_URL: u8 = 1;

/// Finds career page URLs for companies.
#[derive(Clone)]
pub struct CareerPageDiscoverer {
    provider: Arc<dyn SearchProvider>,
    config: DiscoveryConfig,
    career_tokens: Vec<String>,
}

impl CareerPageDiscoverer {
    pub fn new(provider: Arc<dyn SearchProvider>, config: &DiscoveryConfig) -> Self {
        Self {
            provider,
            config: config.clone(),
            career_tokens: config
                .career_tokens
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// DuckDuckGo-backed discoverer sharing the batch rate limiter.
    pub fn from_config(config: &Config, rate_limiter: RateLimiter) -> Result<Self, DiscoveryError> {
        let client = HttpClient::with_timeout(
            &config.http,
            Duration::from_secs(config.discovery.timeout_secs),
            rate_limiter,
        )
        .map_err(|e| DiscoveryError::Config(e.to_string()))?;
        let provider = DuckDuckGoProvider::new(client, config.discovery.search_url.clone());
        Ok(Self::new(Arc::new(provider), &config.discovery))
    }

    /// Discover the career page for one company. Never fails: problems end
    /// up in the result status.
    pub async fn discover(&self, company: &CompanyRef) -> DiscoveryResult {
        let name = company.name.trim();
        if name.is_empty() {
            return DiscoveryResult::error(name, "company name is empty");
        }

        if let Some(known) = company.known_url.as_deref() {
            if is_valid_url(known) {
                debug!("{}: using known career page {}", name, known);
                return DiscoveryResult::success(name, known.trim().to_string());
            }
            warn!("{}: ignoring invalid known URL {:?}, searching instead", name, known);
        }

        let builder = QueryBuilder::new(name)
            .templates(&self.config.query_templates)
            .suffixes(&self.config.domain_suffixes);
        let slug = builder.slug();
        let guesses = builder.domain_guesses();
        let queries = builder.queries();
        let delay = Duration::from_millis(self.config.query_delay_ms);
        debug!("{}: searching via {}", name, self.provider.name());

        let mut best: Option<(u8, String)> = None;

        for (i, query) in queries.iter().enumerate() {
            match self.provider.search(query).await {
                Ok(links) => {
                    for candidate in links.into_iter().map(CandidateUrl::new) {
                        let score = self.score(&candidate, &slug, &guesses);
                        if score == 0 {
                            continue;
                        }
                        debug!("{}: candidate {} scored {}", name, candidate.raw, score);

                        match self.config.policy {
                            DiscoveryPolicy::First => {
                                info!("{}: found career page {}", name, candidate.raw);
                                return DiscoveryResult::success(name, candidate.raw);
                            }
                            DiscoveryPolicy::Best => {
                                if best.as_ref().map_or(true, |(s, _)| score > *s) {
                                    best = Some((score, candidate.raw));
                                }
                            }
                        }
                    }
                    if matches!(best, Some((SCORE_GUESSED_DOMAIN, _))) {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{}: search failed for '{}': {}", name, query, e);
                }
            }

            if i + 1 < queries.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        match best {
            Some((_, url)) => {
                info!("{}: found career page {}", name, url);
                DiscoveryResult::success(name, url)
            }
            None => {
                info!("{}: no career page candidate after {} queries", name, queries.len());
                DiscoveryResult::failed(name)
            }
        }
    }

    /// Score a search result; 0 rejects it.
    ///
    /// The link must be a valid URL whose path or query mentions a career
    /// token. It then scores by how closely its domain matches the company.
    pub fn score(&self, candidate: &CandidateUrl, slug: &str, guesses: &[String]) -> u8 {
        if !is_valid_url(&candidate.raw) || !self.is_career_link(&candidate.raw) {
            return 0;
        }
        score_domain(candidate, slug, guesses)
    }

    fn is_career_link(&self, link: &str) -> bool {
        let tail = path_and_query(link);
        self.career_tokens.iter().any(|t| tail.contains(t.as_str()))
    }
}

/// Domain likelihood of `candidate` for a company with the given slug.
pub fn score_domain(candidate: &CandidateUrl, slug: &str, guesses: &[String]) -> u8 {
    if slug.is_empty() {
        return 0;
    }
    let domain = candidate.href_domain.as_str();
    if guesses.iter().any(|g| domain.contains(g.as_str())) {
        SCORE_GUESSED_DOMAIN
    } else if domain.contains(slug) {
        SCORE_SLUG_IN_DOMAIN
    } else if candidate.raw.to_lowercase().contains(slug) {
        SCORE_SLUG_IN_URL
    } else {
        0
    }
}
