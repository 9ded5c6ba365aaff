//! Site profile registry.
//!
//! Maps company identity to its fetch strategy and extraction rules.
//! Selectors are compiled once when the registry is built; a selector that
//! fails to compile is reported and skipped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use scraper::Selector;
use tracing::warn;

use crate::config::{Config, CustomExtractionConfig, SiteProfileConfig};
use crate::models::FetchStrategy;

/// A compiled structural pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub source: String,
    pub selector: Selector,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, String> {
        Selector::parse(source)
            .map(|selector| Self {
                source: source.to_string(),
                selector,
            })
            .map_err(|e| format!("invalid selector {:?}: {:?}", source, e))
    }
}

/// Compile a list of selectors, collecting failures instead of aborting.
pub fn compile_patterns(sources: &[String]) -> (Vec<Pattern>, Vec<String>) {
    let mut patterns = Vec::with_capacity(sources.len());
    let mut problems = Vec::new();
    for source in sources {
        match Pattern::parse(source) {
            Ok(p) => patterns.push(p),
            Err(e) => problems.push(e),
        }
    }
    (patterns, problems)
}

/// Profile-specific extraction: container, title and link sub-selectors.
#[derive(Debug, Clone)]
pub struct CustomExtraction {
    pub container: Selector,
    pub title: Option<Selector>,
    pub link: Option<Selector>,
    pub title_only: bool,
}

impl CustomExtraction {
    fn compile(config: &CustomExtractionConfig) -> Result<Self, String> {
        let parse_opt = |s: &Option<String>| -> Result<Option<Selector>, String> {
            s.as_deref()
                .map(|src| Pattern::parse(src).map(|p| p.selector))
                .transpose()
        };
        Ok(Self {
            container: Pattern::parse(&config.container)?.selector,
            title: parse_opt(&config.title)?,
            link: parse_opt(&config.link)?,
            title_only: config.title_only,
        })
    }
}

/// Rule for advancing through paginated listings.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationRule {
    pub next_selector: String,
    pub max_pages: u32,
    pub settle: Duration,
}

/// Resolved per-company profile.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub name: String,
    pub strategy: FetchStrategy,
    pub wait_for_selector: Option<String>,
    pub wait_timeout: Duration,
    /// Site-specific patterns, tried before the generic list.
    pub patterns: Vec<Pattern>,
    pub custom: Option<CustomExtraction>,
    pub pagination: Option<PaginationRule>,
}

impl SiteProfile {
    fn compile(
        name: &str,
        config: &SiteProfileConfig,
        defaults: &Config,
        problems: &mut Vec<String>,
    ) -> Self {
        let (patterns, pattern_problems) = compile_patterns(&config.selectors);
        problems.extend(pattern_problems.into_iter().map(|p| format!("{}: {}", name, p)));

        let custom = config
            .custom
            .as_ref()
            .and_then(|c| match CustomExtraction::compile(c) {
                Ok(custom) => Some(custom),
                Err(e) => {
                    problems.push(format!("{}: custom extraction disabled, {}", name, e));
                    None
                }
            });

        let pagination = config.pagination.as_ref().map(|p| PaginationRule {
            next_selector: p.next_selector.clone(),
            max_pages: p.max_pages.max(1),
            settle: Duration::from_millis(p.settle_ms.unwrap_or(defaults.browser.settle_ms)),
        });

        Self {
            name: name.to_string(),
            strategy: config.strategy,
            wait_for_selector: config.wait_for_selector.clone(),
            wait_timeout: Duration::from_secs(
                config
                    .wait_timeout_secs
                    .unwrap_or(defaults.browser.wait_timeout_secs),
            ),
            patterns,
            custom,
            pagination,
        }
    }
}

/// Company name → compiled profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: HashMap<String, Arc<SiteProfile>>,
    problems: Vec<String>,
}

impl ProfileRegistry {
    pub fn from_config(config: &Config) -> Self {
        let mut problems = Vec::new();
        let mut profiles = HashMap::new();

        for (name, site) in &config.sites {
            let profile = SiteProfile::compile(name, site, config, &mut problems);
            profiles.insert(normalize_key(name), Arc::new(profile));
        }

        for problem in &problems {
            warn!("Site profile problem: {}", problem);
        }

        Self { profiles, problems }
    }

    pub fn get(&self, company: &str) -> Option<Arc<SiteProfile>> {
        self.profiles.get(&normalize_key(company)).cloned()
    }

    /// Static unless the company is registered as needing client-side rendering.
    pub fn strategy_for(&self, company: &str) -> FetchStrategy {
        self.get(company)
            .map(|p| p.strategy)
            .unwrap_or(FetchStrategy::Static)
    }

    /// Selector compile failures found while building the registry.
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaginationConfig;

    fn config_with(name: &str, site: SiteProfileConfig) -> Config {
        let mut config = Config::default();
        config.sites.insert(name.to_string(), site);
        config
    }

    #[test]
    fn unknown_company_defaults_to_static() {
        let registry = ProfileRegistry::from_config(&Config::default());
        assert_eq!(registry.strategy_for("Nobody"), FetchStrategy::Static);
        assert!(registry.get("Nobody").is_none());
    }

    #[test]
    fn lookup_ignores_case() {
        let config = config_with(
            "Big Corp",
            SiteProfileConfig {
                strategy: FetchStrategy::Dynamic,
                pagination: Some(PaginationConfig {
                    next_selector: "button.next".into(),
                    max_pages: 45,
                    settle_ms: None,
                }),
                ..Default::default()
            },
        );
        let registry = ProfileRegistry::from_config(&config);
        assert_eq!(registry.strategy_for(" big corp "), FetchStrategy::Dynamic);

        let profile = registry.get("BIG CORP").unwrap();
        let rule = profile.pagination.as_ref().unwrap();
        assert_eq!(rule.max_pages, 45);
        assert_eq!(rule.settle, Duration::from_millis(config.browser.settle_ms));
        assert_eq!(profile.wait_timeout, Duration::from_secs(30));
    }

    #[test]
    fn bad_selectors_are_reported_not_fatal() {
        let config = config_with(
            "Acme",
            SiteProfileConfig {
                selectors: vec!["a.ok".into(), "a[[".into()],
                custom: Some(CustomExtractionConfig {
                    container: "div((".into(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let registry = ProfileRegistry::from_config(&config);
        let profile = registry.get("acme").unwrap();
        assert_eq!(profile.patterns.len(), 1);
        assert!(profile.custom.is_none());
        assert_eq!(registry.problems().len(), 2);
    }
}
