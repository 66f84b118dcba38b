#![allow(clippy::unwrap_used)]
// Integration tests for `GraphqlClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hostmirror_api::{Error, GraphqlClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, GraphqlClient) {
    let server = MockServer::start().await;
    let key = SecretString::from("test-key".to_string());
    let client =
        GraphqlClient::from_api_key(&server.uri(), &key, &TransportConfig::default()).unwrap();
    (server, client)
}

// ── Query tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_query_sends_key_and_returns_data() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("x-api-key", "test-key"))
        .and(body_partial_json(json!({ "query": "query {\n        online\n}\n" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "online": true }
        })))
        .mount(&server)
        .await;

    let data = client.query("query {\n        online\n}\n").await.unwrap();
    assert_eq!(data.get("online"), Some(&json!(true)));
}

#[tokio::test]
async fn test_query_unauthorized_maps_to_invalid_key() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.query("query { online }").await;
    assert!(
        matches!(result, Err(Error::InvalidApiKey)),
        "expected InvalidApiKey, got: {result:?}"
    );
}

#[tokio::test]
async fn test_query_remote_errors_without_data() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "Cannot query field \"vms\"" }]
        })))
        .mount(&server)
        .await;

    let result = client.query("query { vms { domain { name } } }").await;
    assert!(matches!(result, Err(Error::Graphql { .. })), "got: {result:?}");
}

#[tokio::test]
async fn test_query_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = client.query("query { online }").await.unwrap_err();
    assert!(matches!(err, Error::Http { status: 502, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_query_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let result = client.query("query { online }").await;
    assert!(matches!(result, Err(Error::Deserialization { .. })));
}

#[tokio::test]
async fn test_query_server_error_with_json_body_is_not_data() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "message": "service unavailable" })),
        )
        .mount(&server)
        .await;

    let result = client.query("query { online }").await;
    assert!(
        matches!(result, Err(Error::Http { status: 503, .. })),
        "expected HTTP 503 error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_query_malformed_multibyte_body_is_reported() {
    let (server, client) = setup().await;

    let body = format!("{}é…", "x".repeat(199));
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&server)
        .await;

    let err = client.query("query { online }").await.unwrap_err();
    match err {
        Error::Deserialization { body: raw, .. } => assert_eq!(raw, body),
        other => panic!("expected Deserialization, got: {other:?}"),
    }
}
