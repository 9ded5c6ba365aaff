use std::io::Write;

use careerscout::config::{Config, DiscoveryPolicy};
use careerscout::models::{CompanyRef, DiscoveryResult, FetchStrategy};
use careerscout::profiles::ProfileRegistry;
use careerscout::roster;

fn temp_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn loads_line_roster() {
    let file = temp_file(
        ".csv",
        "company,url\nAcme,https://careers.acme.com/\nFoo,\n",
    );
    let companies = roster::load(file.path()).await.unwrap();
    assert_eq!(
        companies,
        vec![
            CompanyRef::new("Acme", Some("https://careers.acme.com/".into())),
            CompanyRef::new("Foo", None),
        ]
    );
}

#[tokio::test]
async fn loads_json_roster_and_discovery_output() {
    let file = temp_file(
        ".json",
        r#"[{"name": "Acme", "direct_career_url": "https://acme.com/careers"}]"#,
    );
    let companies = roster::load(file.path()).await.unwrap();
    assert_eq!(companies[0].known_url.as_deref(), Some("https://acme.com/careers"));

    let discovery = temp_file(
        ".json",
        r#"[
            {"company_name": "Acme", "career_page_url": "https://acme.com/careers", "status": "SUCCESS"},
            {"company_name": "Foo", "career_page_url": null, "status": "ERROR_DISCOVERY: timed out"}
        ]"#,
    );
    let results = roster::load_discovery(discovery.path()).await.unwrap();
    assert_eq!(
        results[0],
        DiscoveryResult::success("Acme", "https://acme.com/careers".into())
    );
    assert_eq!(results[1], DiscoveryResult::error("Foo", "timed out"));
}

#[tokio::test]
async fn missing_roster_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(roster::load(&dir.path().join("absent.csv")).await.is_err());
}

#[tokio::test]
async fn loads_toml_config_with_profiles() {
    let file = temp_file(
        ".toml",
        r#"
[discovery]
policy = "best"

[filters]
min_title_words = 2

[sites.Globex]
strategy = "dynamic"
wait_for_selector = "li.opening"
selectors = ["li.opening a"]

[sites.Globex.pagination]
next_selector = "a[rel=next]"
max_pages = 10
"#,
    );
    let config = Config::load_from_path(file.path()).await.unwrap();
    assert_eq!(config.discovery.policy, DiscoveryPolicy::Best);
    assert_eq!(config.filters.min_title_words, 2);
    assert_eq!(config.source_path.as_deref(), Some(file.path()));

    let registry = ProfileRegistry::from_config(&config);
    assert!(registry.problems().is_empty());
    assert_eq!(registry.strategy_for("globex"), FetchStrategy::Dynamic);
    let profile = registry.get("Globex").unwrap();
    assert_eq!(profile.patterns.len(), 1);
    assert_eq!(profile.pagination.as_ref().unwrap().max_pages, 10);
}
