//! Page-by-page extraction for rendered sources.
//!
//! The controller walks a live page: extract, click "next", wait, extract
//! again. It stops when the next control is gone or disabled, when clicking
//! it fails, or at the page cap, so a control that never disappears still
//! ends the loop.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, info, warn};

use crate::dedup::DedupIndex;
use crate::error::ScrapeResult;
use crate::extract::ExtractionEngine;
use crate::models::Listing;
use crate::pipeline::ListingPipeline;
use crate::profiles::SiteProfile;

/// Upper bound when a profile sets no pagination rule of its own.
pub const DEFAULT_PAGE_CAP: u32 = crate::config::DEFAULT_MAX_PAGES;

/// Result of trying to activate the "next" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Advanced,
    NoNext,
    Disabled,
}

/// A live page the controller can read and advance.
#[async_trait]
pub trait PageDriver: Send {
    /// URL of the page currently shown.
    async fn current_url(&mut self) -> String;

    /// Serialized DOM of the current page.
    async fn html(&mut self) -> ScrapeResult<String>;

    /// Locate and activate the next control.
    async fn advance(&mut self, next_selector: &str) -> ScrapeResult<Advance>;

    /// Wait for a load milestone (bounded by `timeout`), then `settle`.
    /// A timeout is reported but not fatal.
    async fn wait_for_load(&mut self, timeout: Duration, settle: Duration) -> ScrapeResult<()>;
}

/// Why the controller stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// No pagination rule; the initial page was the only one.
    SinglePage,
    PageCap,
    NoNextControl,
    NextDisabled,
    AdvanceFailed,
    /// The page broke while loading after an advance.
    LoadFailed,
    /// Non-initial page added nothing and offered no next control.
    NoNewListings,
    SnapshotFailed,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::SinglePage => "single page",
            Termination::PageCap => "page cap reached",
            Termination::NoNextControl => "no next control",
            Termination::NextDisabled => "next control disabled",
            Termination::AdvanceFailed => "advancing failed",
            Termination::LoadFailed => "page load failed",
            Termination::NoNewListings => "no new listings",
            Termination::SnapshotFailed => "could not read page",
        };
        f.write_str(s)
    }
}

/// Listings gathered across all pages of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationOutcome {
    pub listings: Vec<Listing>,
    pub pages: u32,
    pub termination: Termination,
}

/// Drives extraction over successive pages of one source.
pub struct PaginationController<'a> {
    engine: &'a ExtractionEngine,
    pipeline: &'a ListingPipeline,
    index: &'a DedupIndex,
    profile: Option<&'a SiteProfile>,
}

impl<'a> PaginationController<'a> {
    pub fn new(
        engine: &'a ExtractionEngine,
        pipeline: &'a ListingPipeline,
        index: &'a DedupIndex,
        profile: Option<&'a SiteProfile>,
    ) -> Self {
        Self {
            engine,
            pipeline,
            index,
            profile,
        }
    }

    /// Run from the already loaded initial page.
    ///
    /// Fails only if the initial page cannot be read; later failures end the
    /// loop and keep what was gathered.
    pub async fn run<D>(&self, driver: &mut D) -> ScrapeResult<PaginationOutcome>
    where
        D: PageDriver + ?Sized,
    {
        let rule = self.profile.and_then(|p| p.pagination.as_ref());
        let max_pages = rule.map(|r| r.max_pages).unwrap_or(DEFAULT_PAGE_CAP).max(1);
        let load_timeout = self
            .profile
            .map(|p| p.wait_timeout)
            .unwrap_or(Duration::from_secs(30));

        let mut listings = Vec::new();
        let mut pages = 0u32;

        let termination = loop {
            // EXTRACT_PAGE
            let html = match driver.html().await {
                Ok(html) => html,
                Err(e) if pages == 0 => return Err(e),
                Err(e) => {
                    warn!("Could not read page {}: {}", pages + 1, e);
                    break Termination::SnapshotFailed;
                }
            };
            let page_url = driver.current_url().await;
            pages += 1;

            let found = self.extract_page(&html, &page_url);
            let new_count = found.len();
            debug!("Page {} of {}: {} new listings", pages, page_url, new_count);
            listings.extend(found);

            let Some(rule) = rule else {
                break Termination::SinglePage;
            };
            if pages >= max_pages {
                break Termination::PageCap;
            }

            // ADVANCE
            match driver.advance(&rule.next_selector).await {
                Ok(Advance::Advanced) => {}
                Ok(Advance::NoNext) if pages > 1 && new_count == 0 => {
                    break Termination::NoNewListings;
                }
                Ok(Advance::NoNext) => break Termination::NoNextControl,
                Ok(Advance::Disabled) => break Termination::NextDisabled,
                Err(e) => {
                    warn!("Advancing past page {} failed: {}", pages, e);
                    break Termination::AdvanceFailed;
                }
            }

            // LOAD_NEXT
            match driver.wait_for_load(load_timeout, rule.settle).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    warn!("Loading page {} failed: {}", pages + 1, e);
                    break Termination::LoadFailed;
                }
                Err(e) => warn!("{}; extracting page {} as is", e, pages + 1),
            }
        };

        info!(
            "Pagination stopped after {} pages ({}), {} listings",
            pages,
            termination,
            listings.len()
        );

        Ok(PaginationOutcome {
            listings,
            pages,
            termination,
        })
    }

    /// Parse, extract and filter one page. Keeps the parsed tree out of any
    /// `.await`.
    fn extract_page(&self, html: &str, page_url: &str) -> Vec<Listing> {
        let document = Html::parse_document(html);
        let raw = self.engine.extract(&document, self.profile);
        self.pipeline.process(&raw, page_url, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, PaginationConfig, SiteProfileConfig};
    use crate::error::ScrapeError;
    use crate::models::FetchStrategy;
    use crate::profiles::ProfileRegistry;
    use std::sync::Arc;

    /// Serves numbered pages; the next control is always present unless
    /// `last_page` is set.
    struct FakeDriver {
        page: u32,
        last_page: Option<u32>,
        fail_advance_at: Option<u32>,
        disabled_at: Option<u32>,
        /// Serve page 1's markup on every page.
        stale: bool,
        /// The browser goes away while loading the next page.
        broken_load: bool,
        advances: u32,
        waits: u32,
    }

    impl FakeDriver {
        fn endless() -> Self {
            Self {
                page: 1,
                last_page: None,
                fail_advance_at: None,
                disabled_at: None,
                stale: false,
                broken_load: false,
                advances: 0,
                waits: 0,
            }
        }
    }

    #[async_trait]
    impl PageDriver for FakeDriver {
        async fn current_url(&mut self) -> String {
            format!("https://acme.com/careers?page={}", self.page)
        }

        async fn html(&mut self) -> ScrapeResult<String> {
            let n = if self.stale { 1 } else { self.page };
            Ok(format!(
                r#"<a href="/jobs/{n}/senior-engineer">Senior Engineer {n}</a>"#
            ))
        }

        async fn advance(&mut self, _next: &str) -> ScrapeResult<Advance> {
            if Some(self.page) == self.fail_advance_at {
                return Err(ScrapeError::Browser("detached".into()));
            }
            if Some(self.page) == self.disabled_at {
                return Ok(Advance::Disabled);
            }
            if Some(self.page) == self.last_page {
                return Ok(Advance::NoNext);
            }
            self.page += 1;
            self.advances += 1;
            Ok(Advance::Advanced)
        }

        async fn wait_for_load(&mut self, _t: Duration, _s: Duration) -> ScrapeResult<()> {
            self.waits += 1;
            if self.broken_load {
                return Err(ScrapeError::Browser("target closed".into()));
            }
            Err(ScrapeError::RenderTimeout("slow".into()))
        }
    }

    fn paginated_profile(max_pages: u32) -> Arc<SiteProfile> {
        let mut config = Config::default();
        config.sites.insert(
            "Acme".into(),
            SiteProfileConfig {
                strategy: FetchStrategy::Dynamic,
                pagination: Some(PaginationConfig {
                    next_selector: "button.next".into(),
                    max_pages,
                    settle_ms: Some(0),
                }),
                ..Default::default()
            },
        );
        ProfileRegistry::from_config(&config).get("Acme").unwrap()
    }

    async fn run(driver: &mut FakeDriver, profile: Option<&SiteProfile>) -> PaginationOutcome {
        let engine = ExtractionEngine::default();
        let pipeline = ListingPipeline::default();
        let index = DedupIndex::new();
        PaginationController::new(&engine, &pipeline, &index, profile)
            .run(driver)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn endless_next_control_stops_at_cap() {
        let profile = paginated_profile(45);
        let mut driver = FakeDriver::endless();
        let outcome = run(&mut driver, Some(&*profile)).await;

        assert_eq!(outcome.pages, 45);
        assert_eq!(outcome.termination, Termination::PageCap);
        assert_eq!(outcome.listings.len(), 45);
        assert_eq!(driver.advances, 44);
        assert_eq!(driver.waits, 44);
    }

    #[tokio::test]
    async fn missing_next_control_terminates() {
        let profile = paginated_profile(45);
        let mut driver = FakeDriver {
            last_page: Some(3),
            ..FakeDriver::endless()
        };
        let outcome = run(&mut driver, Some(&*profile)).await;
        assert_eq!(outcome.pages, 3);
        assert_eq!(outcome.termination, Termination::NoNextControl);
        assert_eq!(
            outcome.listings[2].url,
            "https://acme.com/jobs/3/senior-engineer"
        );
    }

    #[tokio::test]
    async fn disabled_or_failing_control_terminates() {
        let profile = paginated_profile(45);

        let mut driver = FakeDriver {
            disabled_at: Some(2),
            ..FakeDriver::endless()
        };
        let outcome = run(&mut driver, Some(&*profile)).await;
        assert_eq!((outcome.pages, outcome.termination), (2, Termination::NextDisabled));

        let mut driver = FakeDriver {
            fail_advance_at: Some(1),
            ..FakeDriver::endless()
        };
        let outcome = run(&mut driver, Some(&*profile)).await;
        assert_eq!((outcome.pages, outcome.termination), (1, Termination::AdvanceFailed));
        assert_eq!(outcome.listings.len(), 1);
    }

    #[tokio::test]
    async fn repeated_last_page_ends_with_no_new_listings() {
        let profile = paginated_profile(45);
        let mut driver = FakeDriver {
            last_page: Some(2),
            stale: true,
            ..FakeDriver::endless()
        };
        let outcome = run(&mut driver, Some(&*profile)).await;
        assert_eq!((outcome.pages, outcome.termination), (2, Termination::NoNewListings));
        assert_eq!(outcome.listings.len(), 1);
    }

    #[tokio::test]
    async fn broken_load_keeps_earlier_pages() {
        let profile = paginated_profile(45);
        let mut driver = FakeDriver {
            broken_load: true,
            ..FakeDriver::endless()
        };
        let outcome = run(&mut driver, Some(&*profile)).await;
        assert_eq!((outcome.pages, outcome.termination), (1, Termination::LoadFailed));
        assert_eq!(outcome.listings.len(), 1);
    }

    #[tokio::test]
    async fn no_rule_means_one_page() {
        let mut driver = FakeDriver::endless();
        let outcome = run(&mut driver, None).await;
        assert_eq!(outcome.pages, 1);
        assert_eq!(outcome.termination, Termination::SinglePage);
        assert_eq!(driver.advances, 0);
    }
}
