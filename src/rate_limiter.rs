//! Adaptive per-domain rate limiter.
//!
//! Tracks request timing per domain and adapts delays based on responses.
//! Backs off on 429/503, gradually recovers on success.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::RateLimitSettings;

/// Rate limiter tuning.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub base_delay: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub recovery_multiplier: f64,
    /// Consecutive successes needed before reducing a backed-off delay.
    pub recovery_threshold: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            recovery_multiplier: 0.8,
            recovery_threshold: 5,
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        let base_delay = Duration::from_millis(settings.base_delay_ms);
        Self {
            base_delay,
            min_delay: base_delay.min(Duration::from_millis(100)),
            max_delay: Duration::from_millis(settings.max_delay_ms).max(base_delay),
            backoff_multiplier: settings.backoff_multiplier.max(1.0),
            ..Default::default()
        }
    }
}

/// State for a single domain.
#[derive(Debug, Clone)]
struct DomainState {
    current_delay: Duration,
    last_request: Option<Instant>,
    consecutive_successes: u32,
    in_backoff: bool,
    total_requests: u64,
    rate_limit_hits: u64,
}

impl DomainState {
    fn new(base_delay: Duration) -> Self {
        Self {
            current_delay: base_delay,
            last_request: None,
            consecutive_successes: 0,
            in_backoff: false,
            total_requests: 0,
            rate_limit_hits: 0,
        }
    }

    /// Time until this domain is ready for another request.
    fn time_until_ready(&self) -> Duration {
        match self.last_request {
            Some(last) => self.current_delay.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }
}

/// Snapshot of a domain's limiter state.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainStats {
    pub current_delay: Duration,
    pub in_backoff: bool,
    pub total_requests: u64,
    pub rate_limit_hits: u64,
}

/// Adaptive rate limiter that tracks per-domain request timing.
///
/// Clones share state, so one limiter covers every worker in a batch.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    domains: Arc<RwLock<HashMap<String, DomainState>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config,
            domains: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn extract_domain(url: &str) -> Option<String> {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|s| s.to_string()))
    }

    /// Wait until the domain is ready, then mark request as started.
    pub async fn acquire(&self, url: &str) -> Option<String> {
        let domain = Self::extract_domain(url)?;

        loop {
            // Check and reserve under one write lock so concurrent workers
            // hitting the same domain queue up instead of firing together.
            let wait_time = {
                let mut domains = self.domains.write().await;
                let state = domains
                    .entry(domain.clone())
                    .or_insert_with(|| DomainState::new(self.config.base_delay));
                let wait = state.time_until_ready();
                if wait == Duration::ZERO {
                    state.last_request = Some(Instant::now());
                    state.total_requests += 1;
                }
                wait
            };

            if wait_time == Duration::ZERO {
                return Some(domain);
            }

            debug!("Rate limiting {}: waiting {:?}", domain, wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }

    /// Feed a response status back into the limiter.
    pub async fn report_status(&self, domain: &str, status_code: u16) {
        match status_code {
            429 | 503 => self.report_rate_limit(domain, status_code).await,
            500..=599 => self.report_server_error(domain).await,
            200..=399 => self.report_success(domain).await,
            _ => {}
        }
    }

    /// Report a successful request - may decrease delay.
    pub async fn report_success(&self, domain: &str) {
        let mut domains = self.domains.write().await;
        if let Some(state) = domains.get_mut(domain) {
            state.consecutive_successes += 1;

            if state.in_backoff && state.consecutive_successes >= self.config.recovery_threshold {
                let new_delay = Duration::from_secs_f64(
                    state.current_delay.as_secs_f64() * self.config.recovery_multiplier,
                );
                state.current_delay = new_delay.max(self.config.min_delay);

                if state.current_delay <= self.config.base_delay {
                    state.in_backoff = false;
                    state.current_delay = self.config.base_delay;
                    info!("Domain {} recovered from rate limit backoff", domain);
                } else {
                    debug!(
                        "Domain {} delay reduced to {:?}",
                        domain, state.current_delay
                    );
                }

                state.consecutive_successes = 0;
            }
        }
    }

    /// Report a definite rate limit hit (429 or 503) - increases delay.
    pub async fn report_rate_limit(&self, domain: &str, status_code: u16) {
        let mut domains = self.domains.write().await;
        if let Some(state) = domains.get_mut(domain) {
            state.rate_limit_hits += 1;
            state.consecutive_successes = 0;
            state.in_backoff = true;

            let new_delay = Duration::from_secs_f64(
                state.current_delay.as_secs_f64() * self.config.backoff_multiplier,
            );
            state.current_delay = new_delay.min(self.config.max_delay);

            warn!(
                "Rate limited by {} (HTTP {}), backing off to {:?}",
                domain, status_code, state.current_delay
            );
        }
    }

    /// Report a server error (5xx other than 503) - mild backoff.
    pub async fn report_server_error(&self, domain: &str) {
        let mut domains = self.domains.write().await;
        if let Some(state) = domains.get_mut(domain) {
            let new_delay = Duration::from_secs_f64(state.current_delay.as_secs_f64() * 1.5);
            state.current_delay = new_delay.min(self.config.max_delay);
            debug!(
                "Server error for {}, delay increased to {:?}",
                domain, state.current_delay
            );
        }
    }

    pub async fn stats(&self, domain: &str) -> Option<DomainStats> {
        let domains = self.domains.read().await;
        domains.get(domain).map(|v| DomainStats {
            current_delay: v.current_delay,
            in_backoff: v.in_backoff,
            total_requests: v.total_requests,
            rate_limit_hits: v.rate_limit_hits,
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_limiter() -> RateLimiter {
        RateLimiter::with_config(RateLimitConfig {
            base_delay: Duration::from_millis(10),
            min_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            recovery_threshold: 2,
            ..Default::default()
        })
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            RateLimiter::extract_domain("https://example.com/path"),
            Some("example.com".to_string())
        );
        assert_eq!(RateLimiter::extract_domain("/relative"), None);
    }

    #[tokio::test]
    async fn test_backoff_on_rate_limit() {
        let limiter = fast_limiter();

        limiter.acquire("https://example.com/1").await;
        limiter.report_status("example.com", 429).await;

        let stats = limiter.stats("example.com").await.unwrap();
        assert!(stats.current_delay >= Duration::from_millis(20));
        assert!(stats.in_backoff);
        assert_eq!(stats.rate_limit_hits, 1);
    }

    #[tokio::test]
    async fn test_recovers_after_successes() {
        let limiter = fast_limiter();

        limiter.acquire("https://example.com/1").await;
        limiter.report_status("example.com", 503).await;
        limiter.report_status("example.com", 200).await;
        limiter.report_status("example.com", 200).await;

        let stats = limiter.stats("example.com").await.unwrap();
        // 20ms * 0.8 = 16ms, still above base.
        assert!(stats.in_backoff);
        assert!(stats.current_delay < Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_acquire_counts_requests() {
        let limiter = fast_limiter();
        limiter.acquire("https://a.com/1").await;
        limiter.acquire("https://a.com/2").await;
        assert_eq!(limiter.stats("a.com").await.unwrap().total_requests, 2);
        assert!(limiter.acquire("not a url").await.is_none());
    }
}
