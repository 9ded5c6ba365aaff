//! Error types for discovery, fetching and extraction.

use thiserror::Error;

/// Result alias used across the library.
pub type ScrapeResult<T> = Result<T, ScrapeError>;

/// Failure kinds raised while turning a company into a listing set.
///
/// Failures are isolated per company: the runner records them on that
/// company's result entry and moves on.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Timed out waiting for content on {0}")]
    RenderTimeout(String),

    #[error("Navigation failed for {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Browser support not compiled. Rebuild with: cargo build --features browser")]
    BrowserUnavailable,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScrapeError {
    /// Whether this error should fail the current fetch.
    ///
    /// A render-wait timeout is not fatal: extraction proceeds with whatever
    /// content is present.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ScrapeError::RenderTimeout(_))
    }
}
