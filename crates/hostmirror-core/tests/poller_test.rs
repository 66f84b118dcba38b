#![allow(clippy::unwrap_used)]
// Poller tests against a mocked GraphQL endpoint.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hostmirror_core::{Catalog, CoreError, MemoryStore, Poller, PollerConfig};

fn config(server: &MockServer, domains: &[&str]) -> PollerConfig {
    PollerConfig {
        address: Some(server.uri().parse().unwrap()),
        api_key: Some(SecretString::from("secret".to_string())),
        domains: domains.iter().map(|d| (*d).to_owned()).collect(),
        ..PollerConfig::default()
    }
}

#[tokio::test]
async fn test_run_once_mirrors_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "online": true,
                "docker": { "containers": [{ "names": ["/web"], "state": "running" }] }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new("hostmirror.0"));
    let mut poller = Poller::new(
        config(&server, &["system.online", "docker"]),
        Catalog::builtin(),
        Arc::clone(&store),
    );
    let reports = poller.subscribe();

    let report = poller.run_once().await.unwrap();
    assert_eq!(report.cycle, 1);
    assert_eq!(store.value("system.online"), Some(json!(true)));
    assert_eq!(store.value("docker.containers.web.running"), Some(json!(true)));
    assert_eq!(store.value("info.connection"), Some(json!(true)));
    assert!(reports.borrow().is_some());
}

#[tokio::test]
async fn test_failed_fetch_marks_disconnected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new("hostmirror.0"));
    let mut poller = Poller::new(
        config(&server, &["system.online"]),
        Catalog::builtin(),
        Arc::clone(&store),
    );

    let err = poller.run_once().await.unwrap_err();
    assert!(err.is_transient(), "unexpected error: {err:?}");
    assert_eq!(store.value("info.connection"), Some(json!(false)));
    assert_eq!(store.value("system.online"), Some(serde_json::Value::Null));
}

#[tokio::test]
async fn test_rejected_key_is_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut poller = Poller::new(
        config(&server, &["system.online"]),
        Catalog::builtin(),
        Arc::new(MemoryStore::new("hostmirror.0")),
    );
    let err = poller.run_once().await.unwrap_err();
    assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn test_spawned_poller_cycles_and_shuts_down() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "online": true } })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new("hostmirror.0"));
    let handle = Poller::new(
        config(&server, &["system.online"]),
        Catalog::builtin(),
        Arc::clone(&store),
    )
    .spawn();

    let mut reports = handle.reports();
    tokio::time::timeout(Duration::from_secs(5), reports.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(store.value("system.online"), Some(json!(true)));

    assert!(handle.shutdown(Duration::from_secs(5)).await);
}

#[tokio::test]
async fn test_incomplete_config_idles_until_cancelled() {
    let store = Arc::new(MemoryStore::new("hostmirror.0"));
    let handle = Poller::new(PollerConfig::default(), Catalog::builtin(), Arc::clone(&store)).spawn();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.is_empty());
    assert!(handle.reports().borrow().is_none());
    assert!(handle.shutdown(Duration::from_secs(5)).await);
}

#[tokio::test]
async fn test_server_error_with_json_body_keeps_mirrored_tree() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "docker": { "containers": [{ "names": ["/web"], "state": "running" }] } }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "message": "service unavailable" })),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new("hostmirror.0"));
    let mut poller = Poller::new(config(&server, &["docker"]), Catalog::builtin(), Arc::clone(&store));

    poller.run_once().await.unwrap();
    assert_eq!(store.value("docker.containers.web.running"), Some(json!(true)));

    let err = poller.run_once().await.unwrap_err();
    assert!(err.is_transient(), "unexpected error: {err:?}");
    assert!(store.contains("docker.containers.web"));
    assert_eq!(store.value("docker.containers.web.running"), Some(json!(true)));
    assert_eq!(store.value("docker.containerCount"), Some(json!(1)));
    assert_eq!(store.value("info.connection"), Some(json!(false)));
}

#[tokio::test]
async fn test_failed_cycle_still_schedules_the_next() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "online": true } })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new("hostmirror.0"));
    let handle = Poller::new(
        PollerConfig {
            interval: Duration::from_millis(50),
            ..config(&server, &["system.online"])
        },
        Catalog::builtin(),
        Arc::clone(&store),
    )
    .spawn();

    let mut reports = handle.reports();
    tokio::time::timeout(Duration::from_secs(5), reports.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(reports.borrow().is_some());
    assert_eq!(store.value("system.online"), Some(json!(true)));
    assert_eq!(store.value("info.connection"), Some(json!(true)));
    assert!(server.received_requests().await.unwrap().len() >= 2);

    assert!(handle.shutdown(Duration::from_secs(5)).await);
}
