//! Batch orchestration.
//!
//! Companies are independent units of work. Each runs in its own task,
//! bounded by a worker semaphore; a failure or panic in one company's task
//! becomes that company's result entry and never stops the batch. Results
//! come back in roster order.

use std::sync::Arc;

use indicatif::ProgressBar;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dedup::DedupIndex;
use crate::discovery::CareerPageDiscoverer;
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::ExtractionEngine;
use crate::fetch::{BrowserFetcher, ContentFetcher, FetchResult, StaticFetcher};
use crate::http_client::HttpClient;
use crate::models::{
    CompanyRef, DiscoveryResult, ExtractionRecord, FetchStrategy, Listing, ScrapedData,
};
use crate::pagination::PaginationController;
use crate::pipeline::ListingPipeline;
use crate::profiles::{ProfileRegistry, SiteProfile};
use crate::rate_limiter::{RateLimitConfig, RateLimiter};

/// Output of a combined discover + scrape run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub discovery: Vec<DiscoveryResult>,
    pub extraction: Vec<ExtractionRecord>,
}

/// Runs discovery and extraction over a roster.
///
/// Clones share every component, including the dedup index.
#[derive(Clone)]
pub struct BatchRunner {
    discoverer: Arc<CareerPageDiscoverer>,
    fetcher: ContentFetcher,
    engine: Arc<ExtractionEngine>,
    pipeline: Arc<ListingPipeline>,
    profiles: Arc<ProfileRegistry>,
    index: DedupIndex,
    workers: usize,
    progress: Option<ProgressBar>,
}

impl BatchRunner {
    /// Build every component from configuration.
    pub fn from_config(config: &Config) -> ScrapeResult<Self> {
        let rate_limiter = RateLimiter::with_config(RateLimitConfig::from(&config.rate_limit));
        let client = HttpClient::new(&config.http, rate_limiter.clone())?;
        let discoverer = CareerPageDiscoverer::from_config(config, rate_limiter)
            .map_err(|e| ScrapeError::Config(e.to_string()))?;
        let fetcher = ContentFetcher::new(
            StaticFetcher::new(client),
            BrowserFetcher::new(config.browser.clone(), config.concurrency.browser_sessions),
        );
        Ok(Self::new(config, discoverer, fetcher))
    }

    /// Assemble a runner from prebuilt discovery and fetch components.
    pub fn new(config: &Config, discoverer: CareerPageDiscoverer, fetcher: ContentFetcher) -> Self {
        Self {
            discoverer: Arc::new(discoverer),
            fetcher,
            engine: Arc::new(ExtractionEngine::new(&config.extraction)),
            pipeline: Arc::new(ListingPipeline::new(&config.filters)),
            profiles: Arc::new(ProfileRegistry::from_config(config)),
            index: DedupIndex::new(),
            workers: config.concurrency.workers.max(1),
            progress: None,
        }
    }

    /// Tick `progress` once per finished company.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Discover career pages for every company.
    pub async fn discover_all(&self, companies: Vec<CompanyRef>) -> Vec<DiscoveryResult> {
        let names: Vec<String> = companies.iter().map(|c| c.name.clone()).collect();
        let results = self
            .for_each(companies, |runner, company| async move {
                runner.discoverer.discover(&company).await
            })
            .await;

        results
            .into_iter()
            .zip(names)
            .map(|(result, name)| {
                result.unwrap_or_else(|e| DiscoveryResult::error(&name, e.to_string()))
            })
            .collect()
    }

    /// Scrape every successfully discovered career page. Resets the dedup
    /// index first.
    pub async fn scrape_all(&self, targets: Vec<DiscoveryResult>) -> Vec<ExtractionRecord> {
        self.index.reset();

        let targets: Vec<(String, String)> = targets
            .into_iter()
            .filter_map(|t| match t.url {
                Some(url) if t.is_success() => Some((t.company, url)),
                _ => {
                    debug!("{}: no career page, not scraping", t.company);
                    None
                }
            })
            .collect();
        let keys = targets.clone();

        let results = self
            .for_each(targets, |runner, (company, url)| async move {
                runner.scrape_one(&company, &url).await
            })
            .await;

        results
            .into_iter()
            .zip(keys)
            .map(|(result, (company, url))| {
                let scraped_data = result.unwrap_or_else(|e| ScrapedData::failed(&url, e));
                record(company, url, scraped_data)
            })
            .collect()
    }

    /// Discover and scrape in one batch sharing one dedup index.
    pub async fn run(&self, companies: Vec<CompanyRef>) -> RunReport {
        self.index.reset();
        let names: Vec<String> = companies.iter().map(|c| c.name.clone()).collect();

        let results = self
            .for_each(companies, |runner, company| async move {
                let discovery = runner.discoverer.discover(&company).await;
                let extraction = match (&discovery.url, discovery.is_success()) {
                    (Some(url), true) => Some(record(
                        discovery.company.clone(),
                        url.clone(),
                        runner.scrape_one(&discovery.company, url).await,
                    )),
                    _ => None,
                };
                (discovery, extraction)
            })
            .await;

        let mut report = RunReport::default();
        for (result, name) in results.into_iter().zip(names) {
            match result {
                Ok((discovery, extraction)) => {
                    report.discovery.push(discovery);
                    report.extraction.extend(extraction);
                }
                Err(e) => report.discovery.push(DiscoveryResult::error(&name, e.to_string())),
            }
        }
        report
    }

    /// Fetch and extract one career page. Failures are recorded on the
    /// returned data.
    pub async fn scrape_one(&self, company: &str, url: &str) -> ScrapedData {
        let profile = self.profiles.get(company);
        let strategy = self.profiles.strategy_for(company);

        let result = match strategy {
            FetchStrategy::Static => self.scrape_static(url, profile.as_deref()).await,
            FetchStrategy::Dynamic => self.scrape_dynamic(url, profile.as_deref()).await,
        };

        match result {
            Ok((listings, pages)) => {
                info!("{}: {} listings from {}", company, listings.len(), url);
                ScrapedData::ok(url, listings, strategy, pages)
            }
            Err(e) => {
                warn!("{}: failed to scrape {}: {}", company, url, e);
                ScrapedData::failed(url, e)
            }
        }
    }

    async fn scrape_static(
        &self,
        url: &str,
        profile: Option<&SiteProfile>,
    ) -> ScrapeResult<(Vec<Listing>, u32)> {
        let fetched = self.fetcher.fetch(url, FetchStrategy::Static, profile).await?;
        Ok((self.extract(fetched, profile), 1))
    }

    async fn scrape_dynamic(
        &self,
        url: &str,
        profile: Option<&SiteProfile>,
    ) -> ScrapeResult<(Vec<Listing>, u32)> {
        let mut session = self.fetcher.browser().open(url, profile).await?;
        let outcome = PaginationController::new(&self.engine, &self.pipeline, &self.index, profile)
            .run(&mut session)
            .await;
        session.close().await;

        let outcome = outcome?;
        Ok((outcome.listings, outcome.pages))
    }

    /// Consumes the fetched document so it never outlives this call.
    fn extract(&self, fetched: FetchResult, profile: Option<&SiteProfile>) -> Vec<Listing> {
        if let Some(warning) = &fetched.warning {
            debug!("{}: {}", fetched.source_url, warning);
        }
        let raw = self.engine.extract(&fetched.document, profile);
        self.pipeline.process(&raw, &fetched.final_url, &self.index)
    }

    /// Run `task` for each item under the worker limit, in input order.
    async fn for_each<I, T, F, Fut>(&self, items: Vec<I>, task: F) -> Vec<Result<T, tokio::task::JoinError>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(BatchRunner, I) -> Fut,
        Fut: std::future::Future<Output = T> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(items.len());

        for item in items {
            let semaphore = semaphore.clone();
            let progress = self.progress.clone();
            let fut = task(self.clone(), item);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let out = fut.await;
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                out
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = handle.await;
            if let Err(e) = &result {
                warn!("Company task failed: {}", e);
            }
            results.push(result);
        }
        results
    }

    /// Release the shared browser, if one was started.
    pub async fn finish(&self) {
        self.fetcher.shutdown().await;
    }
}

fn record(company_name: String, career_page_url: String, scraped_data: ScrapedData) -> ExtractionRecord {
    ExtractionRecord {
        company_name,
        career_page_url,
        scraped_data,
    }
}

/// Companies with a known URL as ready-made discovery results.
pub fn known_targets(companies: &[CompanyRef]) -> Vec<DiscoveryResult> {
    companies
        .iter()
        .map(|c| match &c.known_url {
            Some(url) if crate::url_utils::is_valid_url(url) => {
                DiscoveryResult::success(&c.name, url.clone())
            }
            _ => DiscoveryResult::failed(&c.name),
        })
        .collect()
}
