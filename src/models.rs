//! Core data types flowing through discovery and extraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A company to process, as supplied by the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRef {
    pub name: String,
    /// Known career page URL; `None` means "unknown, discover it".
    #[serde(default, alias = "direct_career_url")]
    pub known_url: Option<String>,
}

impl CompanyRef {
    pub fn new(name: impl Into<String>, known_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            known_url: known_url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
        }
    }
}

/// A search result link considered during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    pub raw: String,
    /// Lowercased base domain of `raw`, `www.` stripped.
    pub href_domain: String,
}

impl CandidateUrl {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let href_domain = crate::url_utils::base_domain(&raw).to_lowercase();
        Self { raw, href_domain }
    }
}

/// How a career page was (or should be) retrieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Single HTTP GET; the response already holds the listing markup.
    #[default]
    Static,
    /// Headless browser session; listings are rendered client-side.
    Dynamic,
}

/// A listing as scraped: unnormalized, href possibly relative or empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListing {
    pub title: String,
    pub href: String,
}

impl RawListing {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
        }
    }

    /// Title-only signal without a per-listing anchor.
    pub fn title_only(title: impl Into<String>) -> Self {
        Self::new(title, String::new())
    }
}

/// A normalized, filtered, deduplicated job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    /// Absolute URL; empty for title-only listings.
    pub url: String,
}

/// Outcome of career page discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryStatus {
    Success,
    FailedDiscovery,
    Error(String),
}

impl DiscoveryStatus {
    pub fn as_wire(&self) -> String {
        match self {
            DiscoveryStatus::Success => "SUCCESS".to_string(),
            DiscoveryStatus::FailedDiscovery => "FAILED_DISCOVERY".to_string(),
            DiscoveryStatus::Error(reason) => format!("ERROR_DISCOVERY: {}", reason),
        }
    }

    pub fn from_wire(s: &str) -> Self {
        match s {
            "SUCCESS" => DiscoveryStatus::Success,
            "FAILED_DISCOVERY" => DiscoveryStatus::FailedDiscovery,
            other => DiscoveryStatus::Error(
                other
                    .strip_prefix("ERROR_DISCOVERY:")
                    .map(|r| r.trim().to_string())
                    .unwrap_or_else(|| other.to_string()),
            ),
        }
    }
}

impl Serialize for DiscoveryStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_wire())
    }
}

impl<'de> Deserialize<'de> for DiscoveryStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DiscoveryStatus::from_wire(&s))
    }
}

/// Terminal output of discovery for one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    #[serde(rename = "company_name")]
    pub company: String,
    #[serde(rename = "career_page_url")]
    pub url: Option<String>,
    pub status: DiscoveryStatus,
}

impl DiscoveryResult {
    pub fn success(company: &str, url: String) -> Self {
        Self {
            company: company.to_string(),
            url: Some(url),
            status: DiscoveryStatus::Success,
        }
    }

    pub fn failed(company: &str) -> Self {
        Self {
            company: company.to_string(),
            url: None,
            status: DiscoveryStatus::FailedDiscovery,
        }
    }

    pub fn error(company: &str, reason: impl Into<String>) -> Self {
        Self {
            company: company.to_string(),
            url: None,
            status: DiscoveryStatus::Error(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DiscoveryStatus::Success && self.url.is_some()
    }
}

/// Listings scraped from one career page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedData {
    pub url: String,
    pub listings: Vec<Listing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<FetchStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapedData {
    pub fn ok(url: &str, listings: Vec<Listing>, strategy: FetchStrategy, pages: u32) -> Self {
        Self {
            url: url.to_string(),
            listings,
            error: None,
            strategy: Some(strategy),
            pages: Some(pages),
            scraped_at: Utc::now(),
        }
    }

    /// Failed fetch: empty listing set with the error attached for visibility.
    pub fn failed(url: &str, error: impl ToString) -> Self {
        Self {
            url: url.to_string(),
            listings: Vec::new(),
            error: Some(error.to_string()),
            strategy: None,
            pages: None,
            scraped_at: Utc::now(),
        }
    }
}

/// Extraction output entry for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub company_name: String,
    pub career_page_url: String,
    pub scraped_data: ScrapedData,
}
