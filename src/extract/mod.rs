//! Listing candidate extraction from parsed career pages.
//!
//! Two modes:
//! - pattern mode: site-specific patterns, then the generic list, each
//!   applied independently to the document
//! - custom mode: a profile's container/title/link triple replaces pattern
//!   matching entirely
//!
//! Output is raw: unfiltered, unnormalized, possibly duplicated.

mod patterns;

pub use patterns::{apply_pattern, element_text, link_for, PatternOutcome};

use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::config::ExtractionConfig;
use crate::models::RawListing;
use crate::profiles::{compile_patterns, CustomExtraction, Pattern, SiteProfile};

/// Applies structural patterns to a document.
#[derive(Debug, Clone)]
pub struct ExtractionEngine {
    generic: Vec<Pattern>,
    nested_link: Option<Selector>,
}

impl ExtractionEngine {
    pub fn new(config: &ExtractionConfig) -> Self {
        let (generic, problems) = compile_patterns(&config.generic_selectors);
        for problem in problems {
            warn!("Skipping generic pattern: {}", problem);
        }
        Self {
            generic,
            nested_link: Selector::parse("a[href]").ok(),
        }
    }

    /// Extract raw candidates, dispatching on the company's profile.
    pub fn extract(&self, document: &Html, profile: Option<&SiteProfile>) -> Vec<RawListing> {
        if let Some(custom) = profile.and_then(|p| p.custom.as_ref()) {
            let listings = self.extract_custom(document, custom);
            debug!(
                "Custom extraction for {} produced {} candidates",
                profile.map(|p| p.name.as_str()).unwrap_or_default(),
                listings.len()
            );
            return listings;
        }

        let site_patterns = profile.map(|p| p.patterns.as_slice()).unwrap_or_default();
        let mut listings = Vec::new();
        for pattern in site_patterns.iter().chain(self.generic.iter()) {
            match apply_pattern(document, pattern, self.nested_link.as_ref()) {
                PatternOutcome::Matched(found) => {
                    debug!("Pattern {:?} produced {} candidates", pattern.source, found.len());
                    listings.extend(found);
                }
                PatternOutcome::NoMatch => debug!("Pattern {:?} matched nothing", pattern.source),
            }
        }
        listings
    }

    fn extract_custom(&self, document: &Html, custom: &CustomExtraction) -> Vec<RawListing> {
        let mut listings = Vec::new();

        for container in document.select(&custom.container) {
            let title = match &custom.title {
                Some(sel) => container.select(sel).next().map(element_text),
                None => Some(element_text(container)),
            }
            .unwrap_or_default();
            if title.is_empty() {
                continue;
            }

            let href = match &custom.link {
                Some(sel) => container
                    .select(sel)
                    .next()
                    .and_then(|el| link_for(el, self.nested_link.as_ref())),
                None => link_for(container, self.nested_link.as_ref()),
            };

            match href {
                Some(href) if !href.is_empty() => listings.push(RawListing::new(title, href)),
                _ if custom.title_only => listings.push(RawListing::title_only(title)),
                _ => {}
            }
        }

        listings
    }
}

impl Default for ExtractionEngine {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::{Config, CustomExtractionConfig, SiteProfileConfig};
    use crate::profiles::ProfileRegistry;

    fn profile(site: SiteProfileConfig) -> std::sync::Arc<SiteProfile> {
        let mut config = Config::default();
        config.sites.insert("Acme".into(), site);
        ProfileRegistry::from_config(&config).get("Acme").unwrap()
    }

    #[test]
    fn generic_patterns_find_job_links() {
        let html = Html::parse_document(
            r#"<html><body>
                <a href="/careers/senior-engineer-42">Senior Engineer</a>
                <a href="/about">About us</a>
                <div class="job-card"><span>Product Manager</span><a href="/jobs/7">Apply</a></div>
            </body></html>"#,
        );
        let engine = ExtractionEngine::default();
        let listings = engine.extract(&html, None);

        assert!(listings.contains(&RawListing::new(
            "Senior Engineer",
            "/careers/senior-engineer-42"
        )));
        assert!(listings.contains(&RawListing::new("Product Manager Apply", "/jobs/7")));
        assert!(!listings.iter().any(|l| l.href == "/about"));
    }

    #[test]
    fn elements_without_links_are_dropped_in_pattern_mode() {
        let html = Html::parse_document(r#"<div class="job-title">Staff Engineer</div>"#);
        let listings = ExtractionEngine::default().extract(&html, None);
        assert!(listings.is_empty());
    }

    #[test]
    fn ats_hosts_are_matched() {
        let html = Html::parse_document(
            r#"<a href="https://jobs.lever.co/acme/4f1c-data">Data Analyst</a>"#,
        );
        let listings = ExtractionEngine::default().extract(&html, None);
        assert_eq!(
            listings,
            vec![RawListing::new(
                "Data Analyst",
                "https://jobs.lever.co/acme/4f1c-data"
            )]
        );
    }

    #[test]
    fn site_patterns_run_before_generic() {
        let html = Html::parse_document(
            r#"<ul><li class="posting"><a href="/p/1">Lead Designer</a></li></ul>
               <a href="/jobs/2">Senior Analyst</a>"#,
        );
        let profile = profile(SiteProfileConfig {
            selectors: vec!["li.posting a".into()],
            ..Default::default()
        });
        let listings = ExtractionEngine::default().extract(&html, Some(&*profile));
        assert_eq!(listings[0], RawListing::new("Lead Designer", "/p/1"));
        assert_eq!(listings[1], RawListing::new("Senior Analyst", "/jobs/2"));
    }

    #[test]
    fn custom_profile_replaces_patterns() {
        let html = Html::parse_document(
            r#"<div class="row"><h3>Backend Engineer</h3><a class="go" href="/x/1">View</a></div>
               <div class="row"><h3>Frontend Engineer</h3></div>
               <a href="/jobs/9">Senior Analyst</a>"#,
        );
        let profile = profile(SiteProfileConfig {
            custom: Some(CustomExtractionConfig {
                container: "div.row".into(),
                title: Some("h3".into()),
                link: Some("a.go".into()),
                title_only: false,
            }),
            ..Default::default()
        });
        let listings = ExtractionEngine::default().extract(&html, Some(&*profile));
        assert_eq!(listings, vec![RawListing::new("Backend Engineer", "/x/1")]);
    }

    #[test]
    fn custom_title_only_keeps_anchorless_rows() {
        let html = Html::parse_document(
            r#"<div class="t">Senior Platform Engineer</div><div class="t"></div>"#,
        );
        let profile = profile(SiteProfileConfig {
            custom: Some(CustomExtractionConfig {
                container: "div.t".into(),
                title_only: true,
                ..Default::default()
            }),
            wait_timeout_secs: Some(20),
            ..Default::default()
        });
        assert_eq!(profile.wait_timeout, Duration::from_secs(20));
        let listings = ExtractionEngine::default().extract(&html, Some(&*profile));
        assert_eq!(
            listings,
            vec![RawListing::title_only("Senior Platform Engineer")]
        );
    }
}
