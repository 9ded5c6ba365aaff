//! Headless browser fetch via chromiumoxide (CDP).
//!
//! One browser process is shared by the batch; each fetch opens its own
//! page (a session) and closes it on every exit path. A semaphore bounds
//! how many sessions are open at once.

#![cfg_attr(not(feature = "browser"), allow(dead_code))]

use std::sync::Arc;
#[cfg(feature = "browser")]
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
#[cfg(feature = "browser")]
use tokio::sync::{Mutex, OwnedSemaphorePermit};
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

use super::{FetchResult, Fetcher};
use crate::config::BrowserSettings;
use crate::error::{ScrapeError, ScrapeResult};
use crate::models::FetchStrategy;
use crate::pagination::{Advance, PageDriver};
use crate::profiles::SiteProfile;

/// Resolves once the DOM is at least interactive.
#[cfg(feature = "browser")]
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
        }
    })
"#;

/// Number of resource requests issued so far; stable across a quiet period
/// means the network is idle.
#[cfg(feature = "browser")]
const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";

#[cfg(feature = "browser")]
const SELECTOR_POLL: Duration = Duration::from_millis(250);

#[cfg(feature = "browser")]
struct BrowserHandle {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// Renders pages in headless Chromium.
#[derive(Clone)]
pub struct BrowserFetcher {
    settings: Arc<BrowserSettings>,
    sessions: Arc<Semaphore>,
    #[cfg(feature = "browser")]
    browser: Arc<Mutex<Option<BrowserHandle>>>,
}

#[cfg(feature = "browser")]
impl BrowserFetcher {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    pub fn new(settings: BrowserSettings, max_sessions: usize) -> Self {
        Self {
            settings: Arc::new(settings),
            sessions: Arc::new(Semaphore::new(max_sessions.max(1))),
            browser: Arc::new(Mutex::new(None)),
        }
    }

    fn find_chrome(&self) -> Option<std::path::PathBuf> {
        if let Some(path) = &self.settings.chrome_path {
            return Some(path.clone());
        }
        Self::CHROME_PATHS
            .iter()
            .map(std::path::Path::new)
            .find(|p| p.exists())
            .map(|p| p.to_path_buf())
    }

    async fn launch(&self) -> ScrapeResult<BrowserHandle> {
        if let Some(remote_url) = &self.settings.remote_url {
            return connect_remote(remote_url).await;
        }

        info!("Launching browser (headless={})", self.settings.headless);

        let mut builder = BrowserConfig::builder();
        match self.find_chrome() {
            Some(path) => {
                debug!("Using Chrome at {}", path.display());
                builder = builder.chrome_executable(path);
            }
            None => debug!("No Chrome found in common locations, using chromiumoxide detection"),
        }
        if !self.settings.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-gpu");
        for arg in &self.settings.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| ScrapeError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Browser(format!("Failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(BrowserHandle { browser, handler })
    }

    async fn new_page(&self) -> ScrapeResult<Page> {
        let mut guard = self.browser.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let handle = guard
            .as_ref()
            .ok_or_else(|| ScrapeError::Browser("browser not initialized".into()))?;
        handle
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Browser(format!("Failed to open page: {}", e)))
    }

    /// Open a session on `url`: navigate, then wait for content.
    ///
    /// Navigation failure or timeout is fatal. A content wait timeout is
    /// kept on the session as a warning.
    pub async fn open(&self, url: &str, profile: Option<&SiteProfile>) -> ScrapeResult<BrowserSession> {
        let permit = self
            .sessions
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ScrapeError::Browser("session pool closed".into()))?;
        let page = self.new_page().await?;

        let mut session = BrowserSession {
            page: Some(page),
            url: url.to_string(),
            settings: self.settings.clone(),
            wait_for_selector: profile.and_then(|p| p.wait_for_selector.clone()),
            wait_timeout: profile
                .map(|p| p.wait_timeout)
                .unwrap_or(Duration::from_secs(self.settings.wait_timeout_secs)),
            render_warning: None,
            _permit: permit,
        };

        if let Err(e) = session.navigate().await {
            session.close().await;
            return Err(e);
        }

        match session.wait_for_content().await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => {
                session.close().await;
                return Err(e);
            }
            Err(e) => {
                warn!("{}; extracting what is present", e);
                session.render_warning = Some(e);
            }
        }

        Ok(session)
    }

    /// Close the shared browser.
    pub async fn shutdown(&self) {
        let Some(mut handle) = self.browser.lock().await.take() else {
            return;
        };
        if let Err(e) = handle.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        handle.handler.abort();
    }
}

/// Connect to a remote Chrome instance through its DevTools endpoint.
#[cfg(feature = "browser")]
async fn connect_remote(url: &str) -> ScrapeResult<BrowserHandle> {
    info!("Connecting to remote browser at {}", url);

    let ws_url = if url.contains("/devtools/browser/") {
        url.to_string()
    } else {
        // Get WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await?
            .json()
            .await?;

        resp.get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ScrapeError::Browser("No webSocketDebuggerUrl in response".into()))?
    };

    debug!("Connecting to WebSocket: {}", ws_url);

    let (browser, mut handler) = Browser::connect(ws_url)
        .await
        .map_err(|e| ScrapeError::Browser(format!("Failed to connect to remote browser: {}", e)))?;

    let handler = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    Ok(BrowserHandle { browser, handler })
}

/// An open browser page bound to one company's career page.
#[cfg(feature = "browser")]
pub struct BrowserSession {
    page: Option<Page>,
    url: String,
    settings: Arc<BrowserSettings>,
    wait_for_selector: Option<String>,
    wait_timeout: Duration,
    /// Content wait timeout met while opening, if any.
    pub render_warning: Option<ScrapeError>,
    _permit: OwnedSemaphorePermit,
}

#[cfg(feature = "browser")]
impl BrowserSession {
    fn page(&self) -> ScrapeResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| ScrapeError::Browser("session already closed".into()))
    }

    async fn navigate(&self) -> ScrapeResult<()> {
        info!("Navigating to {}", self.url);
        let navigation_error = |reason: String| ScrapeError::Navigation {
            url: self.url.clone(),
            reason,
        };

        let params = NavigateParams::builder()
            .url(self.url.as_str())
            .build()
            .map_err(|e| navigation_error(e.to_string()))?;

        let timeout = Duration::from_secs(self.settings.navigation_timeout_secs);
        let response = tokio::time::timeout(timeout, self.page()?.execute(params))
            .await
            .map_err(|_| navigation_error(format!("timed out after {}s", timeout.as_secs())))?
            .map_err(|e| navigation_error(e.to_string()))?;

        if let Some(error_text) = response.result.error_text.clone() {
            return Err(navigation_error(error_text));
        }
        Ok(())
    }

    /// Wait for the DOM, then for the marker element or network idle.
    async fn wait_for_content(&self) -> ScrapeResult<()> {
        let page = self.page()?;
        let idle = Duration::from_millis(self.settings.network_idle_ms);

        let wait = async {
            wait_for_ready(page).await;
            match &self.wait_for_selector {
                Some(selector) => wait_for_selector(page, selector).await,
                None => wait_for_network_idle(page, idle).await,
            }
        };

        tokio::time::timeout(self.wait_timeout, wait)
            .await
            .map_err(|_| ScrapeError::RenderTimeout(self.url.clone()))
    }

    /// Close the page. Failures are logged.
    pub async fn close(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!("Failed to close browser page for {}: {}", self.url, e);
            }
        }
    }
}

#[cfg(feature = "browser")]
impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Early exits that skipped close(): release the page in the background.
        if let Some(page) = self.page.take() {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                let url = std::mem::take(&mut self.url);
                runtime.spawn(async move {
                    if let Err(e) = page.close().await {
                        warn!("Failed to close browser page for {}: {}", url, e);
                    }
                });
            }
        }
    }
}

#[cfg(feature = "browser")]
async fn wait_for_ready(page: &Page) {
    match page.evaluate(WAIT_FOR_READY_SCRIPT.to_string()).await {
        Ok(result) => {
            let state: String = result
                .into_value()
                .unwrap_or_else(|_| "unknown".to_string());
            debug!("Page ready state: {}", state);
        }
        Err(e) => debug!("Could not check ready state: {}", e),
    }
}

#[cfg(feature = "browser")]
async fn wait_for_selector(page: &Page, selector: &str) {
    debug!("Waiting for selector: {}", selector);
    while page.find_element(selector).await.is_err() {
        tokio::time::sleep(SELECTOR_POLL).await;
    }
    debug!("Selector found: {}", selector);
}

#[cfg(feature = "browser")]
async fn wait_for_network_idle(page: &Page, quiet: Duration) {
    let mut last: Option<i64> = None;
    loop {
        let count = match page.evaluate(RESOURCE_COUNT_SCRIPT.to_string()).await {
            Ok(result) => result.into_value::<i64>().ok(),
            Err(e) => {
                debug!("Could not read resource count: {}", e);
                return;
            }
        };
        if count.is_some() && count == last {
            return;
        }
        last = count;
        tokio::time::sleep(quiet).await;
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl PageDriver for BrowserSession {
    async fn current_url(&mut self) -> String {
        match self.page() {
            Ok(page) => page
                .url()
                .await
                .ok()
                .flatten()
                .map(|u| u.to_string())
                .unwrap_or_else(|| self.url.clone()),
            Err(_) => self.url.clone(),
        }
    }

    async fn html(&mut self) -> ScrapeResult<String> {
        self.page()?
            .content()
            .await
            .map_err(|e| ScrapeError::Browser(format!("Failed to read page content: {}", e)))
    }

    async fn advance(&mut self, next_selector: &str) -> ScrapeResult<Advance> {
        let page = self.page()?;
        let next = match page.find_element(next_selector).await {
            Ok(element) => element,
            Err(e) => {
                debug!("Next control {:?} not found: {}", next_selector, e);
                return Ok(Advance::NoNext);
            }
        };

        let disabled = next.attribute("disabled").await.ok().flatten().is_some()
            || next
                .attribute("aria-disabled")
                .await
                .ok()
                .flatten()
                .is_some_and(|v| v.eq_ignore_ascii_case("true"))
            || next
                .attribute("class")
                .await
                .ok()
                .flatten()
                .is_some_and(|c| c.to_lowercase().contains("disabled"));
        if disabled {
            return Ok(Advance::Disabled);
        }

        next.click()
            .await
            .map_err(|e| ScrapeError::Browser(format!("Failed to click next control: {}", e)))?;
        Ok(Advance::Advanced)
    }

    async fn wait_for_load(&mut self, timeout: Duration, settle: Duration) -> ScrapeResult<()> {
        let page = self.page()?;
        let loaded = tokio::time::timeout(timeout, wait_for_ready(page)).await;
        tokio::time::sleep(settle).await;
        loaded.map_err(|_| ScrapeError::RenderTimeout(self.url.clone()))
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl Fetcher for BrowserFetcher {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Dynamic
    }

    async fn fetch(&self, url: &str, profile: Option<&SiteProfile>) -> ScrapeResult<FetchResult> {
        let mut session = self.open(url, profile).await?;
        let content = session.html().await;
        let final_url = session.current_url().await;
        let warning = session.render_warning.take();
        session.close().await;

        Ok(FetchResult::new(url, final_url, &content?, FetchStrategy::Dynamic).with_warning(warning))
    }
}

// Stubs for when browser feature is disabled

#[cfg(not(feature = "browser"))]
impl BrowserFetcher {
    pub fn new(settings: BrowserSettings, max_sessions: usize) -> Self {
        Self {
            settings: Arc::new(settings),
            sessions: Arc::new(Semaphore::new(max_sessions.max(1))),
        }
    }

    pub async fn open(&self, _url: &str, _profile: Option<&SiteProfile>) -> ScrapeResult<BrowserSession> {
        Err(ScrapeError::BrowserUnavailable)
    }

    pub async fn shutdown(&self) {}
}

/// Never constructed without the `browser` feature.
#[cfg(not(feature = "browser"))]
pub struct BrowserSession {
    never: std::convert::Infallible,
    pub render_warning: Option<ScrapeError>,
}

#[cfg(not(feature = "browser"))]
impl BrowserSession {
    pub async fn close(self) {}
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageDriver for BrowserSession {
    async fn current_url(&mut self) -> String {
        match self.never {}
    }

    async fn html(&mut self) -> ScrapeResult<String> {
        match self.never {}
    }

    async fn advance(&mut self, _next_selector: &str) -> ScrapeResult<Advance> {
        match self.never {}
    }

    async fn wait_for_load(
        &mut self,
        _timeout: std::time::Duration,
        _settle: std::time::Duration,
    ) -> ScrapeResult<()> {
        match self.never {}
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl Fetcher for BrowserFetcher {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Dynamic
    }

    async fn fetch(&self, _url: &str, _profile: Option<&SiteProfile>) -> ScrapeResult<FetchResult> {
        Err(ScrapeError::BrowserUnavailable)
    }
}
