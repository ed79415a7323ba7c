//! Static fetch and web search against mock HTTP servers.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use courier_types::{CourierError, SecretString};
use courier_web::{SearchClient, SearchHit, StaticFetcher, UrlPolicy};

fn fetcher() -> StaticFetcher {
    StaticFetcher::new(UrlPolicy::default(), "courier-test")
}

#[tokio::test]
async fn static_fetch_extracts_paragraphs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .and(header("user-agent", "courier-test"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><nav>menu</nav><p>Brasília is the capital.</p><p>It was founded in 1960.</p></body></html>",
        ))
        .mount(&server)
        .await;

    let text = fetcher()
        .fetch_static(&format!("{}/article", server.uri()), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(text, "Brasília is the capital.\nIt was founded in 1960.");
}

#[tokio::test]
async fn static_fetch_without_paragraphs_is_empty_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<div id=\"app\"></div>"))
        .mount(&server)
        .await;

    let text = fetcher()
        .fetch_static(&server.uri(), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(text, "");
}

#[tokio::test]
async fn static_fetch_non_success_status_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/missing", server.uri());
    match fetcher().fetch_static(&url, Duration::from_secs(5)).await.unwrap_err() {
        CourierError::FetchFailed { url: u, cause } => {
            assert_eq!(u, url);
            assert!(cause.contains("404"), "{cause}");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn static_fetch_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<p>late</p>")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let err = fetcher()
        .fetch_static(&server.uri(), Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(err, CourierError::FetchFailed { .. }));
}

#[tokio::test]
async fn static_fetch_respects_allow_list() {
    let f = StaticFetcher::new(UrlPolicy::new(vec!["example.com".into()]), "t");
    let err = f
        .fetch_static("http://127.0.0.1:9/", Duration::from_secs(1))
        .await
        .unwrap_err();
    match err {
        CourierError::FetchFailed { cause, .. } => assert!(cause.contains("allowed_domains")),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn search_posts_query_and_cap() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("authorization", "Bearer tvly-key"))
        .and(body_partial_json(json!({"query": "capital of Brazil", "max_results": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": "capital of Brazil",
            "results": [
                {"title": "Brasília", "url": "https://a.example", "content": "Brasília is the capital", "score": 0.98},
                {"title": "Brazil", "url": "https://b.example", "content": "Country in South America", "score": 0.7},
                {"title": "Rio", "url": "https://c.example", "content": "Former capital", "score": 0.5},
                {"title": "Extra", "url": "https://d.example", "content": "beyond cap", "score": 0.1}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SearchClient::new(format!("{}/search", server.uri()), SecretString::new("tvly-key"), 3);
    let hits = client.search("capital of Brazil").await.unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(
        hits[0],
        SearchHit {
            title: "Brasília".into(),
            url: "https://a.example".into(),
            content: "Brasília is the capital".into(),
        }
    );
}

#[tokio::test]
async fn search_error_status_is_search_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": {"error": "Unauthorized"}})))
        .mount(&server)
        .await;

    let client = SearchClient::new(server.uri(), SecretString::new("bad"), 3);
    match client.search("anything").await.unwrap_err() {
        CourierError::SearchFailed { query, cause } => {
            assert_eq!(query, "anything");
            assert!(cause.contains("401"), "{cause}");
        }
        other => panic!("unexpected: {other:?}"),
    }
}
