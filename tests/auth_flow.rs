// Integration tests for the auth flow: login and logout side effects, token
// persistence, and credential propagation on later requests.

use std::sync::Arc;

use lectern::api::{self, auth as auth_api};
use lectern::auth::{MemoryTokenStore, TokenStore};
use lectern::cache::{CacheStatus, SyncConfig};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> SyncConfig {
    let base = Url::parse(&format!("{}/api/v1", server.uri())).expect("base url");
    SyncConfig::new(base)
}

#[tokio::test]
async fn test_login_with_payload_token_persists_and_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"_id": "u1", "name": "Ada", "role": "instructor"},
            "token": "tok-1"
        })))
        .mount(&server)
        .await;
    // Only matches when the bearer header made it onto the wire.
    Mock::given(method("GET"))
        .and(path("/api/v1/user/profile"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"user": {"_id": "u1", "name": "Ada"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryTokenStore::new());
    let api = api::build(config_for(&server), storage.clone()).expect("build");

    let settled = api
        .client
        .mutate(auth_api::LOGIN, json!({"email": "ada@example.com", "password": "pw"}))
        .await
        .expect("mutate");
    assert!(settled.is_success());

    let snapshot = api.auth.snapshot();
    assert!(snapshot.is_authenticated());
    assert_eq!(snapshot.user.as_ref().and_then(|u| u.name.as_deref()), Some("Ada"));
    assert_eq!(snapshot.token.as_deref(), Some("tok-1"));
    assert_eq!(storage.load().expect("load"), Some("tok-1".to_string()));

    let mut profile = api.client.query(auth_api::LOAD_USER, Value::Null).expect("subscribe");
    assert_eq!(profile.settled().await.status, CacheStatus::Success);
}

#[tokio::test]
async fn test_login_falls_back_to_session_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/user/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"user": {"_id": "u1", "name": "Ada"}}))
                .insert_header("set-cookie", "token=cookie-tok; Path=/; HttpOnly"),
        )
        .mount(&server)
        .await;
    // The captured cookie must be replayed on the next request.
    Mock::given(method("GET"))
        .and(path("/api/v1/user/profile"))
        .and(header("cookie", "token=cookie-tok"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"user": {"_id": "u1", "name": "Ada"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryTokenStore::new());
    let api = api::build(config_for(&server), storage.clone()).expect("build");

    api.client
        .mutate(auth_api::LOGIN, json!({"email": "ada@example.com", "password": "pw"}))
        .await
        .expect("mutate");

    assert_eq!(storage.load().expect("load"), Some("cookie-tok".to_string()));
    assert_eq!(api.cookie_jar().get("token"), Some("cookie-tok".to_string()));

    let mut profile = api.client.query(auth_api::LOAD_USER, Value::Null).expect("subscribe");
    assert_eq!(profile.settled().await.status, CacheStatus::Success);
}

#[tokio::test]
async fn test_logout_clears_session_even_when_the_server_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"_id": "u1", "name": "Ada"},
            "token": "tok-1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryTokenStore::new());
    let api = api::build(config_for(&server), storage.clone()).expect("build");

    api.client
        .mutate(auth_api::LOGIN, json!({"email": "ada@example.com", "password": "pw"}))
        .await
        .expect("mutate");
    assert!(api.auth.is_authenticated());

    let settled = api.client.mutate(auth_api::LOGOUT, Value::Null).await.expect("mutate");
    assert!(!settled.is_success());

    // Logout is best-effort: the local session ends regardless.
    let snapshot = api.auth.snapshot();
    assert!(!snapshot.is_authenticated());
    assert!(snapshot.user.is_none());
    assert!(snapshot.token.is_none());
    assert_eq!(storage.load().expect("load"), None);
}

#[tokio::test]
async fn test_profile_load_restores_user_and_keeps_persisted_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/profile"))
        .and(header("authorization", "Bearer persisted"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"user": {"_id": "u1", "name": "Ada"}})),
        )
        .mount(&server)
        .await;

    // A restarted process: durable token, no in-memory user yet.
    let storage = Arc::new(MemoryTokenStore::with_token("persisted"));
    let api = api::build(config_for(&server), storage.clone()).expect("build");
    assert!(!api.auth.is_authenticated());

    let mut profile = api.client.query(auth_api::LOAD_USER, Value::Null).expect("subscribe");
    assert_eq!(profile.settled().await.status, CacheStatus::Success);

    let snapshot = api.auth.snapshot();
    assert!(snapshot.is_authenticated());
    assert_eq!(snapshot.token.as_deref(), Some("persisted"));
    assert_eq!(storage.load().expect("load"), Some("persisted".to_string()));
}

#[tokio::test]
async fn test_login_refetches_subscribed_profile_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/profile"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"user": {"_id": "u1", "name": "Ada"}})),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"_id": "u1", "name": "Ada"},
            "token": "tok-1"
        })))
        .mount(&server)
        .await;

    let api = api::build(config_for(&server), Arc::new(MemoryTokenStore::new())).expect("build");

    let mut profile = api.client.query(auth_api::LOAD_USER, Value::Null).expect("subscribe");
    assert_eq!(profile.settled().await.generation, 1);

    // Login invalidates the Auth tag; the subscribed profile query refetches.
    api.client
        .mutate(auth_api::LOGIN, json!({"email": "ada@example.com", "password": "pw"}))
        .await
        .expect("mutate");

    loop {
        let snapshot = profile.changed().await.expect("entry alive");
        if snapshot.generation >= 2 {
            assert_eq!(snapshot.status, CacheStatus::Success);
            break;
        }
    }
}
