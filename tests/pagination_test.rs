//! Paginated document fetch: page chaining, ordering, caching, and
//! partial-result degradation.

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stacksmith::api::{CatalogClient, NoRefresh, RequestEngine, TokenRefresher};
use stacksmith::cache::{CacheKind, CollectionCache};
use stacksmith::profile::{ConnectionProfile, JsonProfileStore, SharedProfile};
use stacksmith::types::{LogSink, MemorySink};

const DOCS_PATH: &str = "/integration/v2/document/";

fn docs_page(range: std::ops::Range<i64>) -> serde_json::Value {
    serde_json::Value::Array(
        range
            .map(|id| serde_json::json!({ "id": id, "title": format!("doc-{}", id) }))
            .collect(),
    )
}

struct Harness {
    client: CatalogClient,
    sink: Arc<MemorySink>,
    cache_dir: tempfile::TempDir,
    _profile_dir: tempfile::TempDir,
}

fn harness(server: &MockServer) -> Harness {
    let profile_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();

    let profile = SharedProfile::new(
        ConnectionProfile {
            base_url: server.uri(),
            access_token: "token".into(),
            refresh_token: "refresh".into(),
            user_id: None,
        },
        Arc::new(JsonProfileStore::new(profile_dir.path().join("config.json"))),
    );
    let engine = Arc::new(RequestEngine::new(profile));
    let refresher: Arc<dyn TokenRefresher> = Arc::new(NoRefresh);
    let sink = Arc::new(MemorySink::new());
    let log: Arc<dyn LogSink> = Arc::clone(&sink) as Arc<dyn LogSink>;

    let client = CatalogClient::new(
        engine,
        refresher,
        CollectionCache::new(cache_dir.path()),
        "/integration/visual_config/".into(),
        log,
    );

    Harness { client, sink, cache_dir, _profile_dir: profile_dir }
}

#[tokio::test]
async fn test_documents_follow_next_page_header_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOCS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(docs_page(0..400))
                .insert_header("X-Next-Page", format!("{}{}page2/", server.uri(), DOCS_PATH)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}page2/", DOCS_PATH)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(docs_page(400..800))
                .insert_header("X-Next-Page", format!("{}{}page3/", server.uri(), DOCS_PATH)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}page3/", DOCS_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(docs_page(800..1000)))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let documents = h.client.documents(true).await;

    assert_eq!(documents.len(), 1000);
    let ids: Vec<i64> = documents.iter().map(|d| d.id).collect();
    assert_eq!(ids, (0..1000).collect::<Vec<i64>>());

    // The full set was cached for the next hour
    let cache = CollectionCache::new(h.cache_dir.path());
    assert!(cache.path(CacheKind::Documents).exists());
}

#[tokio::test]
async fn test_second_fetch_served_from_cache() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOCS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(docs_page(0..5)))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    assert_eq!(h.client.documents(false).await.len(), 5);
    assert_eq!(h.client.documents(false).await.len(), 5);

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert!(h.sink.contains("Loaded 5 documents from cache."));
}

#[tokio::test]
async fn test_mid_pagination_failure_keeps_partial_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOCS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(docs_page(0..400))
                .insert_header("X-Next-Page", format!("{}{}page2/", server.uri(), DOCS_PATH)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}page2/", DOCS_PATH)))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let documents = h.client.documents(true).await;

    assert_eq!(documents.len(), 400);
    assert!(h.sink.contains("stopped early"));
}

#[tokio::test]
async fn test_partial_result_is_never_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOCS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(docs_page(0..1))
                .insert_header("X-Next-Page", format!("{}{}page2/", server.uri(), DOCS_PATH)),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}page2/", DOCS_PATH)))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(2)
        .mount(&server)
        .await;

    let h = harness(&server);
    assert_eq!(h.client.documents(true).await.len(), 1);

    let cache = CollectionCache::new(h.cache_dir.path());
    assert!(
        !cache.path(CacheKind::Documents).exists(),
        "an incomplete snapshot must not be cached"
    );

    // The next fetch goes back to the API instead of serving the
    // truncated list for the rest of the expiry window.
    assert_eq!(h.client.documents(false).await.len(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
    assert!(!h.sink.contains("from cache"));
}

#[tokio::test]
async fn test_fetch_error_yields_empty_list_not_panic() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/integration/v1/custom_template/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("nope"))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    assert!(h.client.templates(true).await.is_empty());
    assert!(h.sink.contains("Error fetching templates"));
}
