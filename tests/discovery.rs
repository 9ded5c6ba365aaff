use std::sync::Arc;

use careerscout::config::{Config, DiscoveryPolicy};
use careerscout::discovery::{CareerPageDiscoverer, DuckDuckGoProvider, SearchProvider};
use careerscout::http_client::HttpClient;
use careerscout::models::{CompanyRef, DiscoveryStatus};
use careerscout::rate_limiter::{RateLimitConfig, RateLimiter};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.discovery.search_url = format!("{}/html/", server.uri());
    config.discovery.query_delay_ms = 0;
    config.rate_limit.base_delay_ms = 0;
    config
}

fn discoverer(config: &Config) -> CareerPageDiscoverer {
    let limiter = RateLimiter::with_config(RateLimitConfig::from(&config.rate_limit));
    CareerPageDiscoverer::from_config(config, limiter).expect("discoverer")
}

fn results_page(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<div class="result"><a class="result__a" href="{}">r</a></div>"#, l))
        .collect();
    format!("<html><body>{}</body></html>", anchors)
}

async fn mount_results(server: &MockServer, query: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/html/"))
        .and(query_param("q", query))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(results_page(links), "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn skips_unrelated_domain() {
    let server = MockServer::start().await;
    mount_results(
        &server,
        "Acme careers",
        &[
            "https://unrelated.com/careers",
            "//duckduckgo.com/l/?uddg=https%3A%2F%2Facme.com%2Fcareers%2Flist&rut=x",
        ],
    )
    .await;

    let result = discoverer(&test_config(&server))
        .discover(&CompanyRef::new("Acme", None))
        .await;

    assert_eq!(result.status, DiscoveryStatus::Success);
    assert_eq!(result.url.as_deref(), Some("https://acme.com/careers/list"));
}

#[tokio::test]
async fn known_url_issues_no_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = discoverer(&test_config(&server))
        .discover(&CompanyRef::new(
            "Acme",
            Some("https://careers.acme.com/".into()),
        ))
        .await;

    assert!(result.is_success());
    assert_eq!(result.url.as_deref(), Some("https://careers.acme.com/"));
}

#[tokio::test]
async fn search_errors_fall_through_to_later_queries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .and(query_param("q", "Foo careers"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_results(&server, "Foo jobs", &["http://foojobs.com/careers/open"]).await;

    let result = discoverer(&test_config(&server))
        .discover(&CompanyRef::new("Foo", None))
        .await;

    assert_eq!(result.url.as_deref(), Some("http://foojobs.com/careers/open"));
}

#[tokio::test]
async fn exhausting_queries_fails_discovery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(results_page(&[]), "text/html"),
        )
        .expect(5)
        .mount(&server)
        .await;

    let result = discoverer(&test_config(&server))
        .discover(&CompanyRef::new("Nobody", None))
        .await;

    assert_eq!(result.status, DiscoveryStatus::FailedDiscovery);
    assert_eq!(result.url, None);
}

#[tokio::test]
async fn best_policy_waits_for_strongest_candidate() {
    let server = MockServer::start().await;
    mount_results(&server, "Acme careers", &["https://jobs.board.io/acme/careers"]).await;
    mount_results(&server, "Acme jobs", &["https://www.acme.com/jobs"]).await;

    let mut config = test_config(&server);
    config.discovery.policy = DiscoveryPolicy::Best;

    let result = discoverer(&config)
        .discover(&CompanyRef::new("Acme", None))
        .await;
    assert_eq!(result.url.as_deref(), Some("https://www.acme.com/jobs"));
}

#[tokio::test]
async fn provider_reports_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = HttpClient::new(
        &config.http,
        RateLimiter::with_config(RateLimitConfig::from(&config.rate_limit)),
    )
    .unwrap();
    let provider: Arc<dyn SearchProvider> = Arc::new(DuckDuckGoProvider::new(
        client,
        config.discovery.search_url.clone(),
    ));

    assert!(provider.search("Acme careers").await.is_err());
}
