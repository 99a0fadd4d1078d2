//! Remote API client tests against a mock server

use serde_json::json;
use tweetpipe_core::config::TwitterConfig;
use tweetpipe_core::extract::{ExtractError, TwitterClient};
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn client(server: &MockServer) -> TwitterClient {
    TwitterClient::new(&TwitterConfig {
        api_url: server.uri(),
        bearer_token: Some("test-token".to_string()),
        timeout_secs: 5,
    })
    .expect("client should build")
}

fn timeline() -> serde_json::Value {
    json!([
        {"id": 2, "full_text": "second", "user": {"id": 9}},
        {"id": 1, "full_text": "first", "user": {"id": 9}}
    ])
}

#[tokio::test]
async fn test_fetch_wraps_items_with_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/user_timeline.json"))
        .and(query_param("screen_name", "alice"))
        .and(query_param("count", "2"))
        .and(query_param("tweet_mode", "extended"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline()))
        .expect(1)
        .mount(&server)
        .await;

    let extraction = client(&server).fetch("alice", 2).await.expect("fetch should succeed");

    assert!(extraction.key.starts_with("alice/"));
    assert!(extraction.key.ends_with("Z.json"));

    let document = extraction.document.as_map();
    assert_eq!(document["tweets"].as_array().map(Vec::len), Some(2));
    assert_eq!(document["tweetpipe_metadata"]["username"], "alice");
    assert_eq!(document["tweetpipe_metadata"]["count"], 2);
    assert!(document["tweetpipe_metadata"]["fetched_at"].is_string());
}

#[tokio::test]
async fn test_api_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/user_timeline.json"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = client(&server).user_timeline("alice", 5).await.unwrap_err();
    match err {
        ExtractError::Api { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Unauthorized");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_unexpected_payload() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/user_timeline.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errors": []})))
        .mount(&server)
        .await;

    let err = client(&server).user_timeline("alice", 5).await.unwrap_err();
    assert!(matches!(err, ExtractError::UnexpectedPayload(_)));
}
