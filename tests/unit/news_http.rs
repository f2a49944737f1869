//! Unit tests for NewsHttpClient against a mock listing endpoint

use chrono::NaiveDate;
use newsfeed_archiver::fetcher::news_http::NewsHttpClient;
use newsfeed_archiver::fetcher::{FetcherError, PageFetcher, PageRequest};
use newsfeed_archiver::{DisplayOutput, SortDirection, SortField};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(page: u32) -> PageRequest {
    PageRequest::first(NaiveDate::from_ymd_opt(2020, 4, 2).unwrap(), 100).with_page(page)
}

#[tokio::test]
async fn test_first_page_sends_day_filter_and_omits_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/news"))
        .and(header("accept", "application/json"))
        .and(query_param("token", "secret"))
        .and(query_param("date", "2020-04-02"))
        .and(query_param("pageSize", "100"))
        .and(query_param("sort", "created:asc"))
        .and(query_param("displayOutput", "full"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "first", "created": "Thu, 02 Apr 2020 09:00:00 -0400"},
            {"id": 2, "title": "second", "stocks": [{"name": "AAPL"}]}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = NewsHttpClient::new(server.uri(), "secret");
    let stories = client.fetch_page(&request(0)).await.unwrap();

    assert_eq!(stories.len(), 2);
    assert_eq!(stories[0].title, "first");
    assert!(stories[0].created_at().is_some());
    assert_eq!(stories[1].stocks[0].name, "AAPL");
}

#[tokio::test]
async fn test_later_pages_send_page_and_custom_sort() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/news"))
        .and(query_param("page", "3"))
        .and(query_param("sort", "updated:desc"))
        .and(query_param("displayOutput", "headline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut req = request(3);
    req.sort_field = SortField::Updated;
    req.sort_direction = SortDirection::Desc;
    req.display = DisplayOutput::Headline;

    let client = NewsHttpClient::new(server.uri(), "secret");
    let stories = client.fetch_page(&req).await.unwrap();
    assert!(stories.is_empty());
}

#[tokio::test]
async fn test_non_success_status_keeps_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/news"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;

    let client = NewsHttpClient::new(server.uri(), "secret");
    let err = client.fetch_page(&request(0)).await.unwrap_err();

    match err {
        FetcherError::UnexpectedResponse { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad token");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/news"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = NewsHttpClient::new(server.uri(), "secret");
    let err = client.fetch_page(&request(0)).await.unwrap_err();
    assert!(matches!(err, FetcherError::ParseError(_)));
}

#[tokio::test]
async fn test_zero_page_size_is_rejected_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let mut req = request(0);
    req.page_size = 0;

    let client = NewsHttpClient::new(server.uri(), "secret");
    let err = client.fetch_page(&req).await.unwrap_err();
    assert!(matches!(err, FetcherError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_endpoint_url_never_contains_token() {
    let client = NewsHttpClient::new("http://localhost:1/", "secret");
    let url = client.endpoint_url(&request(2));

    assert!(url.starts_with("http://localhost:1/api/v2/news?"));
    assert!(url.contains("page=2"));
    assert!(!url.contains("secret"));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error_without_token() {
    let client = NewsHttpClient::new("http://127.0.0.1:1", "secret");
    let err = client.fetch_page(&request(0)).await.unwrap_err();

    match err {
        FetcherError::NetworkError(message) => assert!(!message.contains("secret")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_null_fields_do_not_fail_the_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/news"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "author": null, "image": null, "body": null, "stocks": [{"cusip": "x"}]},
            {"id": 2, "title": "second"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = NewsHttpClient::new(server.uri(), "secret");
    let stories = client.fetch_page(&request(0)).await.unwrap();

    assert_eq!(stories.len(), 2);
    assert_eq!(stories[0].author, "");
    assert!(stories[0].image.is_empty());
    assert_eq!(stories[0].stocks[0].name, "");
}
