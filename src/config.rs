//! Configuration management for careerscout using the prefer crate.
//!
//! Everything the pipeline would otherwise hardcode (keyword lists, site
//! profiles, delays, timeouts) lives here and is loaded once at startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::FetchStrategy;

/// Application name used for config file discovery.
pub const APP_NAME: &str = "careerscout";

/// Default DuckDuckGo HTML search endpoint.
pub const DEFAULT_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

/// Default page cap for paginated sources.
pub const DEFAULT_MAX_PAGES: u32 = 45;

/// Top-level configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    /// Per-company site profiles, keyed by company name (case-insensitive).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub sites: HashMap<String, SiteProfileConfig>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// Outbound HTTP settings shared by search and static fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    /// User agent configuration.
    /// - None / "impersonate": real browser user agent
    /// - Any other string: used verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Fixed delay after each request in milliseconds.
    #[serde(default)]
    pub request_delay_ms: u64,
}

fn default_http_timeout() -> u64 {
    15
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            user_agent: None,
            request_delay_ms: 0,
        }
    }
}

/// Per-domain adaptive rate limiting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// How discovery picks among passing candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryPolicy {
    /// First passing candidate in query order, then in-page order.
    #[default]
    First,
    /// Highest scoring candidate across all queries, earliest on ties.
    Best,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Search endpoint queried with `?q=<query>`.
    #[serde(default = "default_search_url")]
    pub search_url: String,
    /// Query templates; `{name}` is replaced with the company name.
    #[serde(default = "default_query_templates")]
    pub query_templates: Vec<String>,
    /// Suffixes appended to the company slug to guess its domain.
    #[serde(default = "default_domain_suffixes")]
    pub domain_suffixes: Vec<String>,
    /// A candidate's path or query must contain one of these.
    #[serde(default = "default_career_tokens")]
    pub career_tokens: Vec<String>,
    #[serde(default)]
    pub policy: DiscoveryPolicy,
    /// Politeness pause between queries in milliseconds.
    #[serde(default = "default_query_delay_ms")]
    pub query_delay_ms: u64,
    /// Search request timeout in seconds.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_search_url() -> String {
    DEFAULT_SEARCH_URL.to_string()
}

fn default_query_templates() -> Vec<String> {
    [
        "{name} careers",
        "{name} jobs",
        "{name} job openings",
        "{name} recruiting",
        "{name} career opportunities",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_domain_suffixes() -> Vec<String> {
    vec!["com".into(), "org".into(), "net".into()]
}

fn default_career_tokens() -> Vec<String> {
    vec![
        "careers".into(),
        "jobs".into(),
        "employment".into(),
        "hiring".into(),
    ]
}

fn default_query_delay_ms() -> u64 {
    1000
}

fn default_search_timeout() -> u64 {
    10
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            query_templates: default_query_templates(),
            domain_suffixes: default_domain_suffixes(),
            career_tokens: default_career_tokens(),
            policy: DiscoveryPolicy::default(),
            query_delay_ms: default_query_delay_ms(),
            timeout_secs: default_search_timeout(),
        }
    }
}

/// Generic structural patterns applied to every career page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_generic_selectors")]
    pub generic_selectors: Vec<String>,
}

fn default_generic_selectors() -> Vec<String> {
    [
        ".job-title",
        ".job-listing",
        ".job-card",
        ".position-name",
        ".opening-title",
        "h2.job-posting",
        "h3.title",
        "a.job-link",
        "div[data-qa=\"job-card\"] a",
        "a[href*=\"/job/\"]",
        "a[href*=\"/jobs/\"]",
        "a[href*=\"/careers/\"]",
        "li.job-result-card a",
        "a[data-qa=\"job-link\"]",
        "a[href*=\"boards.greenhouse.io/\"], a[href*=\"jobs.lever.co/\"], a[href*=\"myworkdayjobs.com/\"]",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            generic_selectors: default_generic_selectors(),
        }
    }
}

/// Keyword lists and structural thresholds for listing filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// A title must contain at least one of these (lowercase).
    #[serde(default = "default_job_keywords")]
    pub job_keywords: Vec<String>,
    /// A title containing any of these is navigational noise (lowercase).
    #[serde(default = "default_excluded_keywords")]
    pub excluded_keywords: Vec<String>,
    /// Path tokens that mark a short link as job-related.
    #[serde(default = "default_job_path_tokens")]
    pub job_path_tokens: Vec<String>,
    /// Boilerplate fragments stripped from titles, case-insensitively.
    #[serde(default = "default_boilerplate")]
    pub boilerplate: Vec<String>,
    /// Links with fewer path segments need a job path token.
    #[serde(default = "default_min_path_segments")]
    pub min_path_segments: usize,
    /// Title-only listings need at least this many words.
    #[serde(default = "default_min_title_words")]
    pub min_title_words: usize,
}

fn default_job_keywords() -> Vec<String> {
    [
        "manager",
        "analyst",
        "designer",
        "specialist",
        "director",
        "lead",
        "architect",
        "associate",
        "principal",
        "consultant",
        "product",
        "software",
        "hardware",
        "engineer",
        "developer",
        "scientist",
        "ux",
        "ui",
        "operations",
        "executive",
        "support",
        "account",
        "expert",
        "senior",
        "staff",
        "staffing",
        "vice president",
        "vp",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_excluded_keywords() -> Vec<String> {
    [
        "cookie",
        "privacy",
        "help",
        "careers",
        "about",
        "blog",
        "login",
        "sign in",
        "sign up",
        "policy",
        "terms",
        "faq",
        "jobsjobs",
        "person_outline",
        "work_outline",
        "search",
        "results",
        "dashboard",
        "preferences",
        "categories",
        "alerts",
        "eeo",
        "how we hire",
        "know your rights",
        "equal opportunity",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_job_path_tokens() -> Vec<String> {
    vec![
        "job".into(),
        "career".into(),
        "opening".into(),
        "position".into(),
    ]
}

fn default_boilerplate() -> Vec<String> {
    [
        "work_outlineJobs",
        "person_outline",
        "JobsJobs",
        "helpHelpopen_in_new",
        "open_in_new",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_min_path_segments() -> usize {
    4
}

fn default_min_title_words() -> usize {
    3
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            job_keywords: default_job_keywords(),
            excluded_keywords: default_excluded_keywords(),
            job_path_tokens: default_job_path_tokens(),
            boilerplate: default_boilerplate(),
            min_path_segments: default_min_path_segments(),
            min_title_words: default_min_title_words(),
        }
    }
}

/// Headless browser settings for the dynamic strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Run in headless mode (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    /// Explicit Chrome/Chromium executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,
    /// Additional Chrome arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chrome_args: Vec<String>,
    /// Initial navigation timeout; exceeding it fails the fetch.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
    /// Content wait timeout when the site profile does not set one.
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,
    /// Quiet period that counts as network idle.
    #[serde(default = "default_network_idle_ms")]
    pub network_idle_ms: u64,
    /// Fixed settle delay after advancing to the next page.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

pub fn default_headless() -> bool {
    true
}

fn default_navigation_timeout() -> u64 {
    30
}

fn default_wait_timeout() -> u64 {
    30
}

fn default_network_idle_ms() -> u64 {
    500
}

fn default_settle_ms() -> u64 {
    1500
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            remote_url: None,
            chrome_path: None,
            chrome_args: Vec::new(),
            navigation_timeout_secs: default_navigation_timeout(),
            wait_timeout_secs: default_wait_timeout(),
            network_idle_ms: default_network_idle_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Companies processed in parallel.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Browser sessions open at once.
    #[serde(default = "default_browser_sessions")]
    pub browser_sessions: usize,
}

fn default_workers() -> usize {
    4
}

fn default_browser_sessions() -> usize {
    1
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            browser_sessions: default_browser_sessions(),
        }
    }
}

/// Site profile as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteProfileConfig {
    #[serde(default)]
    pub strategy: FetchStrategy,
    /// Marker element that signals the listings have rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<String>,
    /// Content wait bound for this site, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_timeout_secs: Option<u64>,
    /// Site-specific patterns, applied before the generic ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<String>,
    /// Replaces pattern matching entirely for this site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomExtractionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationConfig>,
}

/// Container/title/link selector triple for profile-specific extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomExtractionConfig {
    pub container: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Keep containers without any link as title-only listings.
    #[serde(default)]
    pub title_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub next_selector: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_ms: Option<u64>,
}

fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers careerscout config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load(APP_NAME).await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config file: {}", e);
                            Self::default().with_env_overrides()
                        }
                    }
                } else {
                    Self::default().with_env_overrides()
                }
            }
            Err(_) => Self::default().with_env_overrides(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config.with_env_overrides())
    }

    /// Parse configuration text in the given format.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env_non_empty("CAREERSCOUT_SEARCH_URL") {
            self.discovery.search_url = url;
        }
        if let Some(ua) = env_non_empty("CAREERSCOUT_USER_AGENT") {
            self.http.user_agent = Some(ua);
        }
        if let Some(workers) = env_non_empty("CAREERSCOUT_WORKERS").and_then(|w| w.parse().ok()) {
            self.concurrency.workers = workers;
        }
        if let Some(url) = env_non_empty("BROWSER_URL") {
            self.browser.remote_url = Some(url);
        }
        if let Some(path) = env_non_empty("CHROME_PATH") {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Serialize the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {}", e))
    }

}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}
