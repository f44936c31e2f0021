// Integration tests for the cache engine over the real endpoint registry.
// These verify end-to-end dedup, invalidation, and transform behavior
// against a mock HTTP server; unit tests for the engine internals live in
// src/client.rs and src/cache/.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use lectern::api::{self, course};
use lectern::auth::MemoryTokenStore;
use lectern::cache::{CacheStatus, SyncConfig};
use lectern::client::SyncClient;
use lectern::cookie::CookieJar;
use lectern::endpoint::{EndpointDescriptor, Registry};
use lectern::fetch::Fetcher;
use lectern::hooks::Dispatcher;
use lectern::request::RequestSpec;
use lectern::tag::Tag;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn api_against(server: &MockServer) -> api::Api {
    let base = Url::parse(&format!("{}/api/v1", server.uri())).expect("base url");
    api::build(SyncConfig::new(base), Arc::new(MemoryTokenStore::new())).expect("build")
}

#[tokio::test]
async fn test_concurrent_queries_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/course/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"courseTitle": "Rust"}]))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = api_against(&server).await;

    let mut subs: Vec<_> = (0..3)
        .map(|_| api.client.query(course::GET_COURSES, Value::Null).expect("subscribe"))
        .collect();

    let snapshots = join_all(subs.iter_mut().map(|sub| sub.settled())).await;
    for snapshot in &snapshots {
        assert_eq!(snapshot.status, CacheStatus::Success);
        assert_eq!(snapshot.data, Some(json!([{"courseTitle": "Rust"}])));
    }

    // A later query is a cache hit; still one request on the wire.
    let mut third = api.client.query(course::GET_COURSES, Value::Null).expect("subscribe");
    assert_eq!(third.settled().await.generation, 1);
}

#[tokio::test]
async fn test_create_lecture_refetches_subscribed_lecture_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/course/C1/lecture"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"lectures": [{"lectureTitle": "Old"}]})),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/course/C1/lecture"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_against(&server).await;

    let mut lectures = api
        .client
        .query(course::GET_LECTURES, json!({"courseId": "C1"}))
        .expect("subscribe");
    let initial = lectures.settled().await;
    assert_eq!(initial.generation, 1);
    assert_eq!(initial.data, Some(json!([{"lectureTitle": "Old"}])));

    let settled = api
        .client
        .mutate(
            course::CREATE_LECTURE,
            json!({"courseId": "C1", "formData": {"lectureTitle": "Intro"}}),
        )
        .await
        .expect("mutate");
    assert!(settled.is_success());

    // No explicit refetch: the invalidation fan-out drives it.
    loop {
        let snapshot = lectures.changed().await.expect("entry alive");
        if snapshot.generation >= 2 {
            assert_eq!(snapshot.status, CacheStatus::Success);
            break;
        }
    }
}

#[tokio::test]
async fn test_unsubscribed_entries_go_stale_without_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/course/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/course/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let api = api_against(&server).await;

    let mut courses = api.client.query(course::GET_COURSES, Value::Null).expect("subscribe");
    courses.settled().await;
    let key = courses.key().clone();
    courses.unsubscribe();

    api.client
        .mutate(course::CREATE_COURSE, json!({"courseTitle": "New"}))
        .await
        .expect("mutate");

    // Stale, not refetched: nobody is watching.
    let snapshot = api.client.snapshot(&key).expect("entry retained");
    assert_eq!(snapshot.status, CacheStatus::Stale);
    assert_eq!(snapshot.generation, 1);
}

#[tokio::test]
async fn test_item_tags_do_not_cross_ids_or_bare_types() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/course/5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"course": {"courseTitle": "Keep"}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/course/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let api = api_against(&server).await;

    let mut course5 = api
        .client
        .query(course::GET_COURSE, json!({"courseId": "5"}))
        .expect("subscribe");
    course5.settled().await;

    // Invalidates Courses and Course:7; Course:5 must stay untouched even
    // though it has an active subscriber.
    api.client
        .mutate(course::UPDATE_COURSE, json!({"courseId": "7", "data": {"courseTitle": "x"}}))
        .await
        .expect("mutate");

    let snapshot = api.client.snapshot(course5.key()).expect("entry");
    assert_eq!(snapshot.status, CacheStatus::Success);
    assert_eq!(snapshot.generation, 1);
}

#[tokio::test]
async fn test_failed_mutation_leaves_cache_intact() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/course/9"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"course": {"courseTitle": "Safe"}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/course/9"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "forbidden"})))
        .mount(&server)
        .await;

    let api = api_against(&server).await;

    let mut course9 = api
        .client
        .query(course::GET_COURSE, json!({"courseId": "9"}))
        .expect("subscribe");
    course9.settled().await;

    let settled = api
        .client
        .mutate(course::UPDATE_COURSE, json!({"courseId": "9", "data": {}}))
        .await
        .expect("mutate");
    assert!(!settled.is_success());
    assert_eq!(settled.error().map(|e| e.message()), Some("forbidden"));

    // Failure means no invalidation: the cached course is still current.
    let snapshot = api.client.snapshot(course9.key()).expect("entry");
    assert_eq!(snapshot.status, CacheStatus::Success);
    assert_eq!(snapshot.data, Some(json!({"courseTitle": "Safe"})));
}

#[tokio::test]
async fn test_malformed_filtered_collection_defaults_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/course/"))
        .and(query_param("category", "HTML"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": "shape"})))
        .mount(&server)
        .await;

    let api = api_against(&server).await;

    let mut filtered = api
        .client
        .query(course::GET_COURSES_WITH_FILTER, json!({"category": "HTML"}))
        .expect("subscribe");

    let snapshot = filtered.settled().await;
    assert_eq!(snapshot.status, CacheStatus::Success);
    assert_eq!(snapshot.data, Some(json!([])));
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_refetch_overwrites_the_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/course/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"courseTitle": "v1"}])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/course/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"courseTitle": "v2"}])))
        .mount(&server)
        .await;

    let api = api_against(&server).await;

    let mut courses = api.client.query(course::GET_COURSES, Value::Null).expect("subscribe");
    let first = courses.settled().await;
    assert_eq!(first.data, Some(json!([{"courseTitle": "v1"}])));

    api.client.refetch(courses.key()).expect("refetch");
    loop {
        let snapshot = courses.changed().await.expect("entry alive");
        if snapshot.generation >= 2 {
            assert_eq!(snapshot.data, Some(json!([{"courseTitle": "v2"}])));
            break;
        }
    }
}

#[tokio::test]
async fn test_later_completion_wins_over_a_superseded_exchange() {
    let server = MockServer::start().await;
    // One of the two concurrent requests hits the delayed mock; whichever
    // it is, that exchange settles last and must own the entry.
    Mock::given(method("GET"))
        .and(path("/api/v1/course/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"courseTitle": "settled-last"}]))
                .set_delay(Duration::from_millis(200)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/course/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"courseTitle": "settled-first"}])))
        .mount(&server)
        .await;

    let api = api_against(&server).await;

    let mut courses = api.client.query(course::GET_COURSES, Value::Null).expect("subscribe");
    // Refetch before the first exchange settles: nothing is cancelled, both
    // results land in completion order.
    api.client.refetch(courses.key()).expect("refetch");

    loop {
        let snapshot = courses.changed().await.expect("entry alive");
        if snapshot.generation >= 2 {
            assert_eq!(snapshot.status, CacheStatus::Success);
            assert_eq!(snapshot.data, Some(json!([{"courseTitle": "settled-last"}])));
            break;
        }
    }
}

#[tokio::test]
async fn test_result_derived_tags_join_invalidation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "1"}, {"id": "2"}])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/catalog/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let mut registry = Registry::new();
    registry
        .register(
            EndpointDescriptor::query("catalog.list", |_| Ok(RequestSpec::get("/catalog")))
                .provides(|result, _| {
                    let mut tags = vec![Tag::of("Catalog")];
                    if let Some(items) = result.as_array() {
                        for item in items {
                            if let Some(id) = item.get("id").and_then(Value::as_str) {
                                tags.push(Tag::item("Catalog", id));
                            }
                        }
                    }
                    tags
                }),
        )
        .expect("register");
    registry
        .register(
            EndpointDescriptor::mutation("catalog.touch", |args| {
                Ok(RequestSpec::put(format!(
                    "/catalog/{}",
                    args.get("id").and_then(Value::as_str).unwrap_or_default()
                )))
            })
            .invalidates(|_| vec![Tag::item("Catalog", "2")]),
        )
        .expect("register");

    let base = Url::parse(&format!("{}/api/v1", server.uri())).expect("base url");
    let config = SyncConfig::new(base);
    let fetcher = Fetcher::new(
        config.base_url.clone(),
        Arc::new(MemoryTokenStore::new()),
        Arc::new(CookieJar::new()),
        config.retry.clone(),
    );
    let client = SyncClient::new(registry, fetcher, Dispatcher::new(), config);

    let mut list = client.query("catalog.list", Value::Null).expect("subscribe");
    assert_eq!(list.settled().await.generation, 1);

    // Catalog:2 is only known from the response body; the mutation's
    // invalidation must still reach the subscribed list and refetch it.
    let settled = client.mutate("catalog.touch", json!({"id": "2"})).await.expect("mutate");
    assert!(settled.is_success());

    loop {
        let snapshot = list.changed().await.expect("entry alive");
        if snapshot.generation >= 2 {
            assert_eq!(snapshot.status, CacheStatus::Success);
            break;
        }
    }
}
