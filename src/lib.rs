//! careerscout - career page discovery and job listing extraction.
//!
//! Finds a company's career page (trusting a known URL or querying a search
//! engine), fetches it statically or through a headless browser, and turns
//! the markup into a deduplicated list of job postings.

pub mod config;
pub mod dedup;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod http_client;
pub mod models;
pub mod pagination;
pub mod pipeline;
pub mod profiles;
pub mod rate_limiter;
pub mod roster;
pub mod runner;
pub mod url_utils;

pub use config::Config;
pub use dedup::DedupIndex;
pub use discovery::CareerPageDiscoverer;
pub use error::{ScrapeError, ScrapeResult};
pub use extract::ExtractionEngine;
pub use models::{CompanyRef, DiscoveryResult, DiscoveryStatus, Listing, RawListing};
pub use pipeline::ListingPipeline;
pub use runner::BatchRunner;
