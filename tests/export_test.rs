//! Hub structure export against a mock catalog.

use std::sync::Arc;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stacksmith::api::{CatalogClient, NoRefresh, RequestEngine, TokenRefresher};
use stacksmith::cache::CollectionCache;
use stacksmith::export::export_hub_structure;
use stacksmith::profile::{ConnectionProfile, JsonProfileStore, SharedProfile};
use stacksmith::types::{LogSink, MemorySink};

fn client(
    server: &MockServer,
    profile_dir: &tempfile::TempDir,
    cache_dir: &tempfile::TempDir,
    sink: Arc<MemorySink>,
) -> CatalogClient {
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

    CatalogClient::new(
        engine,
        refresher,
        CollectionCache::new(cache_dir.path()),
        "/integration/visual_config/".into(),
        sink as Arc<dyn LogSink>,
    )
}

#[tokio::test]
async fn test_export_creates_sanitized_directory_tree() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/integration/v2/document_hub/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 7,
            "title": "Fin/ance: Q3"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/integration/v2/folder/"))
        .and(query_param("document_hub_id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 1, "title": "Ops (2024)" },
            { "id": 2 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let profile_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let client = client(&server, &profile_dir, &cache_dir, Arc::clone(&sink));

    let exported = export_hub_structure(&client, sink.as_ref(), 7, out_dir.path())
        .await
        .unwrap();

    assert_eq!(exported.root, out_dir.path().join("Finance Q3"));
    assert!(exported.root.is_dir());
    assert_eq!(exported.folder_dirs.len(), 2);
    assert!(out_dir.path().join("Finance Q3/Ops 2024").is_dir());
    assert!(out_dir.path().join("Finance Q3/Untitled_Folder_2").is_dir());
    assert!(sink.contains("Processing Hub: 'Fin/ance: Q3' (ID: 7)"));
}

#[tokio::test]
async fn test_export_of_folderless_hub_creates_only_the_root() {
    let server = MockServer::start().await;

    // Hub details unavailable: the id-based fallback name is used
    Mock::given(method("GET"))
        .and(path("/integration/v2/folder/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let profile_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let client = client(&server, &profile_dir, &cache_dir, Arc::clone(&sink));

    let exported = export_hub_structure(&client, sink.as_ref(), 9, out_dir.path())
        .await
        .unwrap();

    assert_eq!(exported.root, out_dir.path().join("Hub_9"));
    assert!(exported.root.is_dir());
    assert!(exported.folder_dirs.is_empty());
    assert!(sink.contains("No sub-folders found within this hub."));
}
