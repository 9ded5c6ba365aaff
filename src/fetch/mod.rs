//! Career page retrieval.
//!
//! Two strategies share the [`Fetcher`] contract: [`StaticFetcher`] issues a
//! single GET, [`BrowserFetcher`] renders the page in headless Chromium. The
//! strategy for a company comes from its site profile.
//!
//! `FetchResult` owns a parsed `scraper::Html`, which is not `Send`; callers
//! extract from it and drop it before their next `.await`.

mod browser;
mod static_fetch;

pub use browser::{BrowserFetcher, BrowserSession};
pub use static_fetch::StaticFetcher;

use async_trait::async_trait;
use scraper::Html;

use crate::error::{ScrapeError, ScrapeResult};
use crate::models::FetchStrategy;
use crate::profiles::SiteProfile;

/// A retrieved and parsed page.
#[derive(Debug)]
pub struct FetchResult {
    /// URL that was requested.
    pub source_url: String,
    /// URL after redirects or client-side navigation; relative links resolve
    /// against this.
    pub final_url: String,
    pub document: Html,
    pub strategy: FetchStrategy,
    /// Non-fatal problem met while waiting for content.
    pub warning: Option<ScrapeError>,
}

impl FetchResult {
    pub fn new(source_url: &str, final_url: String, body: &str, strategy: FetchStrategy) -> Self {
        Self {
            source_url: source_url.to_string(),
            final_url,
            document: Html::parse_document(body),
            strategy,
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: Option<ScrapeError>) -> Self {
        self.warning = warning;
        self
    }
}

/// One way of turning a URL into a parsed document.
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn strategy(&self) -> FetchStrategy;

    async fn fetch(&self, url: &str, profile: Option<&SiteProfile>) -> ScrapeResult<FetchResult>;
}

/// Dispatches to the fetcher matching a strategy.
#[derive(Clone)]
pub struct ContentFetcher {
    static_fetcher: StaticFetcher,
    browser: BrowserFetcher,
}

impl ContentFetcher {
    pub fn new(static_fetcher: StaticFetcher, browser: BrowserFetcher) -> Self {
        Self {
            static_fetcher,
            browser,
        }
    }

    pub fn for_strategy(&self, strategy: FetchStrategy) -> &dyn Fetcher {
        match strategy {
            FetchStrategy::Static => &self.static_fetcher,
            FetchStrategy::Dynamic => &self.browser,
        }
    }

    pub fn browser(&self) -> &BrowserFetcher {
        &self.browser
    }

    /// Fetch one page with the given strategy.
    pub async fn fetch(
        &self,
        url: &str,
        strategy: FetchStrategy,
        profile: Option<&SiteProfile>,
    ) -> ScrapeResult<FetchResult> {
        if !crate::url_utils::is_valid_url(url) {
            return Err(ScrapeError::InvalidUrl(url.to_string()));
        }
        self.for_strategy(strategy).fetch(url, profile).await
    }

    /// Release the shared browser, if one was started.
    pub async fn shutdown(&self) {
        self.browser.shutdown().await;
    }
}
