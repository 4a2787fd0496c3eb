#![allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]

use async_trait::async_trait;
use docmcp_core::assist::Enhancer;
use docmcp_core::deep_crawl::{DeepCrawlPage, DeepCrawler};
use docmcp_core::{
    AuthType, Clock, CrawlConfig, CrawlInput, CrawlSession, Crawler, Endpoint, Error, ManualClock,
    McpSpec,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn local_config() -> CrawlConfig {
    CrawlConfig {
        allow_private_network: true,
        ..CrawlConfig::default()
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(format!("<html><body>{body}</body></html>"), "text/html")
}

async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

fn keys(endpoints: &[Endpoint]) -> Vec<String> {
    endpoints.iter().map(Endpoint::key).collect()
}

fn petstore() -> serde_json::Value {
    json!({
        "openapi": "3.0.0",
        "info": {"title": "Petstore"},
        "servers": [{"url": "https://petstore.example.com/v1"}],
        "components": {"securitySchemes": {"key": {"type": "apiKey", "in": "header", "name": "X-Api-Key"}}},
        "paths": {
            "/pets": {
                "get": {"operationId": "listPets", "summary": "List pets"},
                "post": {"operationId": "createPet"}
            }
        }
    })
}

struct FailingEnhancer;

#[async_trait]
impl Enhancer for FailingEnhancer {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn enhance(&self, _endpoints: &[Endpoint]) -> docmcp_core::Result<Vec<Endpoint>> {
        Err(Error::Enhancement("model unavailable".into()))
    }
}

struct RewordingEnhancer;

#[async_trait]
impl Enhancer for RewordingEnhancer {
    fn name(&self) -> &'static str {
        "rewording"
    }

    async fn enhance(&self, endpoints: &[Endpoint]) -> docmcp_core::Result<Vec<Endpoint>> {
        Ok(endpoints
            .iter()
            .cloned()
            .map(|mut e| {
                e.description = Some(format!("Better words for {}", e.path));
                e
            })
            .collect())
    }
}

struct StaticDeepCrawler;

#[async_trait]
impl DeepCrawler for StaticDeepCrawler {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn crawl(&self, _session: &CrawlSession, seed: &str) -> docmcp_core::Result<Vec<DeepCrawlPage>> {
        Ok(vec![DeepCrawlPage {
            url: format!("{seed}/rendered"),
            content: "<p>GET /deep/items returns every item.</p>".to_string(),
        }])
    }
}

struct StalledDeepCrawler;

#[async_trait]
impl DeepCrawler for StalledDeepCrawler {
    fn name(&self) -> &'static str {
        "stalled"
    }

    async fn crawl(&self, _session: &CrawlSession, _seed: &str) -> docmcp_core::Result<Vec<DeepCrawlPage>> {
        tokio::time::sleep(Duration::from_secs(6)).await;
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_spec_link_is_followed_before_pages() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/docs",
        html(r#"<h1>Docs</h1><a href="/openapi.json">Download the OpenAPI spec</a><a href="/docs/guide">Guide</a>"#),
    )
    .await;
    serve(&server, "/openapi.json", ResponseTemplate::new(200).set_body_json(petstore())).await;
    serve(
        &server,
        "/docs/guide",
        html("<p>Use GET /pets to list pets and DELETE /pets/{petId} to remove one.</p>"),
    )
    .await;

    let seed = format!("{}/docs", server.uri());
    let result = Crawler::new(local_config())
        .unwrap()
        .crawl(CrawlInput::Url(seed.clone()))
        .await
        .unwrap();

    assert_eq!(keys(&result.endpoints), vec!["GET:/pets", "POST:/pets", "DELETE:/pets/{petId}"]);
    assert_eq!(result.endpoints[0].summary.as_deref(), Some("List pets"));
    assert_eq!(result.base_url, "https://petstore.example.com/v1");
    assert_eq!(result.auth_type, AuthType::ApiKey);
    assert_eq!(result.source_urls[0], seed);
    assert_eq!(result.source_urls[1], format!("{}/openapi.json", server.uri()));
    assert!(!result.timed_out);
    assert!(result.logs.iter().any(|l| l.starts_with("[OpenAPI] Parsed 2 endpoints")));
    assert!(result.logs.iter().any(|l| l.contains("stopping the crawl")));
}

#[tokio::test]
async fn test_curl_page_yields_schema_and_base_url() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/reference",
        html(
            r#"<h2>Create an item</h2><p>Authenticate with a Bearer token.</p>
            <pre><code>curl -X POST https://api.example.com/api/items -H "Content-Type: application/json" -d '{"name": "Widget"}'</code></pre>"#,
        ),
    )
    .await;

    let result = Crawler::new(local_config())
        .unwrap()
        .crawl(CrawlInput::Url(format!("{}/reference", server.uri())))
        .await
        .unwrap();

    assert_eq!(keys(&result.endpoints), vec!["POST:/api/items"]);
    let body = result.endpoints[0].request_body.as_ref().unwrap();
    assert_eq!(body.schema["properties"]["name"]["type"], "string");
    assert_eq!(result.base_url, "https://api.example.com");
    assert_eq!(result.auth_type, AuthType::Bearer);

    let manifest = McpSpec::from_result(&result);
    assert_eq!(manifest.tools.len(), 1);
    assert_eq!(manifest.tools[0].input_schema["properties"]["name"]["type"], "string");
}

#[tokio::test]
async fn test_cross_origin_links_are_never_fetched() {
    let seed_server = MockServer::start().await;
    let other = MockServer::start().await;
    let other_origin = other.uri().replace("127.0.0.1", "localhost");
    serve(
        &seed_server,
        "/docs",
        html(&format!(
            r#"<p>GET /pets</p><a href="{other_origin}/docs/elsewhere">Elsewhere</a>
            <a href="{other_origin}/openapi.json">OpenAPI</a>"#
        )),
    )
    .await;

    let result = Crawler::new(local_config())
        .unwrap()
        .crawl(CrawlInput::Url(format!("{}/docs", seed_server.uri())))
        .await
        .unwrap();

    assert_eq!(keys(&result.endpoints), vec!["GET:/pets"]);
    assert!(other.received_requests().await.unwrap().is_empty());
    assert!(result.source_urls.iter().all(|u| !u.contains("localhost")));
}

#[tokio::test]
async fn test_empty_site_reports_suggestions() {
    let server = MockServer::start().await;
    serve(&server, "/docs", html("<p>Welcome to our product.</p>")).await;

    let seed = format!("{}/docs", server.uri());
    let err = Crawler::new(local_config())
        .unwrap()
        .crawl(CrawlInput::Url(seed.clone()))
        .await
        .unwrap_err();

    let report = match err {
        Error::NoEndpointsFound(report) => report,
        other => panic!("expected NoEndpointsFound, got {other:?}"),
    };
    assert_eq!(report.suggestions.len(), 4);
    assert_eq!(report.source_urls, vec![seed]);
    assert!(report.logs.iter().any(|l| l.starts_with("[Fallback]")));
}

#[tokio::test]
async fn test_spec_probe_fallback() {
    let server = MockServer::start().await;
    serve(&server, "/", html("<p>Nothing to see.</p>")).await;
    serve(
        &server,
        "/swagger.json",
        ResponseTemplate::new(200).set_body_json(json!({
            "swagger": "2.0",
            "host": "api.example.com",
            "basePath": "/v2",
            "paths": {"/orders/{id}": {"get": {"summary": "Get an order"}}}
        })),
    )
    .await;

    let result = Crawler::new(local_config())
        .unwrap()
        .crawl(CrawlInput::Url(server.uri()))
        .await
        .unwrap();

    assert_eq!(keys(&result.endpoints), vec!["GET:/v2/orders/{id}"]);
    assert_eq!(result.base_url, "https://api.example.com");
    assert!(result.source_urls.contains(&format!("{}/swagger.json", server.uri())));

    let requests = server.received_requests().await.unwrap();
    let spec_request = requests.iter().find(|r| r.url.path() == "/swagger.json").unwrap();
    let accept = spec_request.headers.get("accept").unwrap().to_str().unwrap();
    assert!(accept.starts_with("application/json"));
}

#[tokio::test]
async fn test_rest_prefix_fallback_adds_placeholder() {
    let server = MockServer::start().await;
    serve(&server, "/docs", html("<p>Nothing to see.</p>")).await;
    Mock::given(method("HEAD"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = Crawler::new(local_config())
        .unwrap()
        .crawl(CrawlInput::Url(format!("{}/docs", server.uri())))
        .await
        .unwrap();

    assert_eq!(keys(&result.endpoints), vec!["GET:/api"]);
    assert_eq!(result.endpoints[0].summary.as_deref(), Some("API root at /api"));
    assert_eq!(result.base_url, server.uri());
}

#[tokio::test]
async fn test_deep_crawl_is_last_resort() {
    let server = MockServer::start().await;
    serve(&server, "/docs", html("<div id=\"root\"></div>")).await;

    let seed = format!("{}/docs", server.uri());
    let result = Crawler::new(local_config())
        .unwrap()
        .with_deep_crawler(Arc::new(StaticDeepCrawler))
        .crawl(CrawlInput::Url(seed.clone()))
        .await
        .unwrap();

    assert_eq!(keys(&result.endpoints), vec!["GET:/deep/items"]);
    assert!(result.source_urls.contains(&format!("{seed}/rendered")));
    assert!(result.logs.iter().any(|l| l.starts_with("[DeepCrawl] static added 1 endpoints")));
}

#[tokio::test]
async fn test_deep_crawl_is_cut_off_by_the_budget() {
    let server = MockServer::start().await;
    serve(&server, "/docs", html("<div id=\"root\"></div>")).await;

    let config = CrawlConfig {
        total_budget_ms: 1500,
        ..local_config()
    };
    let started = std::time::Instant::now();
    let result = Crawler::new(config)
        .unwrap()
        .with_deep_crawler(Arc::new(StalledDeepCrawler))
        .crawl(CrawlInput::Url(format!("{}/docs", server.uri())))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(result.timed_out);
    assert!(result.endpoints.is_empty());
    assert!(result
        .logs
        .iter()
        .any(|l| l == "[DeepCrawl] stalled did not finish within the time budget"));
}

#[tokio::test]
async fn test_slow_site_returns_partial_result() {
    let server = MockServer::start().await;
    serve(&server, "/docs", html("<p>GET /slow</p>").set_delay(Duration::from_secs(3))).await;

    let config = CrawlConfig {
        total_budget_ms: 300,
        ..local_config()
    };
    let result = Crawler::new(config)
        .unwrap()
        .crawl(CrawlInput::Url(format!("{}/docs", server.uri())))
        .await
        .unwrap();

    assert!(result.timed_out);
    assert!(result.endpoints.is_empty());
    assert!(result.logs.iter().any(|l| l.contains("timed out")));
}

#[tokio::test]
async fn test_page_budget_and_batch_size_bound_the_crawl() {
    let server = MockServer::start().await;
    let links: String = (1..=6).map(|n| format!(r#"<a href="/docs/p{n}">Page {n}</a>"#)).collect();
    serve(&server, "/docs", html(&links)).await;
    for n in 1..=6 {
        serve(
            &server,
            &format!("/docs/p{n}"),
            html(&format!("<p>GET /items{n}</p>")).set_delay(Duration::from_millis(250)),
        )
        .await;
    }

    let config = CrawlConfig {
        max_pages: 5,
        max_parallel: 2,
        ..local_config()
    };
    let started = std::time::Instant::now();
    let result = Crawler::new(config)
        .unwrap()
        .crawl(CrawlInput::Url(format!("{}/docs", server.uri())))
        .await
        .unwrap();

    // Two delayed batches of two pages each, never one batch of four.
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(server.received_requests().await.unwrap().len(), 5);
    assert_eq!(keys(&result.endpoints), vec!["GET:/items1", "GET:/items2", "GET:/items3", "GET:/items4"]);
    assert!(result.logs.iter().any(|l| l == "[Crawler] Page budget of 5 reached"));
    assert!(result.logs.iter().any(|l| l.contains("respect_robots is set")));
}

#[tokio::test]
async fn test_links_beyond_max_depth_are_not_fetched() {
    let server = MockServer::start().await;
    serve(&server, "/docs", html(r#"<a href="/docs/a">A</a>"#)).await;
    serve(&server, "/docs/a", html(r#"<p>GET /shallow</p><a href="/docs/a/b">B</a>"#)).await;
    serve(&server, "/docs/a/b", html("<p>GET /deep</p>")).await;

    let config = CrawlConfig {
        max_depth: 1,
        ..local_config()
    };
    let result = Crawler::new(config)
        .unwrap()
        .crawl(CrawlInput::Url(format!("{}/docs", server.uri())))
        .await
        .unwrap();

    assert_eq!(keys(&result.endpoints), vec!["GET:/shallow"]);
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/docs/a/b"));
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_exhausted_clock_makes_no_requests() {
    let server = MockServer::start().await;
    serve(&server, "/docs", html("<p>GET /pets</p>")).await;

    let clock = Arc::new(ManualClock::new());
    clock.advance(Duration::from_secs(60));
    let crawler = Crawler::new(local_config())
        .unwrap()
        .with_clock(Arc::clone(&clock) as Arc<dyn Clock>);
    let result = crawler
        .crawl(CrawlInput::Url(format!("{}/docs", server.uri())))
        .await
        .unwrap();

    assert!(result.timed_out);
    assert!(result.endpoints.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failing_enhancer_leaves_manifest_unchanged() {
    let spec = petstore().to_string();
    let plain = Crawler::new(CrawlConfig::default())
        .unwrap()
        .crawl(CrawlInput::Paste(spec.clone()))
        .await
        .unwrap();
    let enhanced = Crawler::new(CrawlConfig::default())
        .unwrap()
        .with_enhancer(Arc::new(FailingEnhancer))
        .crawl(CrawlInput::Paste(spec))
        .await
        .unwrap();

    let tools = |result: &docmcp_core::CrawlResult| serde_json::to_value(McpSpec::from_result(result).tools).unwrap();
    assert_eq!(tools(&plain), tools(&enhanced));
    assert!(enhanced
        .logs
        .iter()
        .any(|l| l.starts_with("[Enhancer] failing enhancement failed, keeping originals")));
}

#[tokio::test]
async fn test_enhancer_descriptions_reach_manifest() {
    let result = Crawler::new(CrawlConfig::default())
        .unwrap()
        .with_enhancer(Arc::new(RewordingEnhancer))
        .crawl(CrawlInput::Paste(petstore().to_string()))
        .await
        .unwrap();

    let manifest = McpSpec::from_result(&result);
    assert!(manifest.tools.iter().all(|t| t.description == "Better words for /pets"));
}

#[tokio::test]
async fn test_recrawl_is_stable() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/docs",
        html(r#"<table><tr><td>GET</td><td>/users</td></tr><tr><td>POST</td><td>/users</td></tr></table>
            <a href="/docs/more">More</a>"#),
    )
    .await;
    serve(&server, "/docs/more", html("<p>PATCH /users/{id} and GET /users</p>")).await;

    let crawler = Crawler::new(local_config()).unwrap();
    let seed = format!("{}/docs", server.uri());
    let first = crawler.crawl(CrawlInput::Url(seed.clone())).await.unwrap();
    let second = crawler.crawl(CrawlInput::Url(seed)).await.unwrap();

    assert_eq!(keys(&first.endpoints), vec!["GET:/users", "POST:/users", "PATCH:/users/{id}"]);
    assert_eq!(keys(&first.endpoints), keys(&second.endpoints));
    assert_eq!(first.source_urls, second.source_urls);
}
