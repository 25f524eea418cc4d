//! Auth-retry behavior of the request engine against a mock catalog.

use std::sync::Arc;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stacksmith::api::{ApiRequest, NoRefresh, RequestEngine, TokenManager, TokenRefresher};
use stacksmith::profile::{ConnectionProfile, JsonProfileStore, SharedProfile};
use stacksmith::StacksmithError;

const REFRESH_PATH: &str = "/integration/v1/createAPIAccessToken/";
const DOCS_PATH: &str = "/integration/v2/document/";

fn shared_profile(base_url: &str, dir: &tempfile::TempDir) -> SharedProfile {
    SharedProfile::new(
        ConnectionProfile {
            base_url: base_url.into(),
            access_token: "stale-token".into(),
            refresh_token: "refresh-me".into(),
            user_id: Some(7),
        },
        Arc::new(JsonProfileStore::new(dir.path().join("config.json"))),
    )
}

#[tokio::test]
async fn test_401_triggers_one_refresh_and_retry_with_new_token() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path(DOCS_PATH))
        .and(header("TOKEN", "stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "api_access_token": "fresh-token" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DOCS_PATH))
        .and(header("TOKEN", "fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let profile = shared_profile(&server.uri(), &dir);
    let engine = Arc::new(RequestEngine::new(profile.clone()));
    let refresher: Arc<dyn TokenRefresher> = Arc::new(TokenManager::new(
        Arc::clone(&engine),
        profile.clone(),
        REFRESH_PATH.into(),
    ));

    let response = engine
        .send(ApiRequest::get(DOCS_PATH), &refresher)
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // Refreshed credentials were persisted to the profile file
    let saved = std::fs::read_to_string(dir.path().join("config.json")).unwrap();
    assert!(saved.contains("fresh-token"));
    assert_eq!(profile.access_token(), "fresh-token");
}

#[tokio::test]
async fn test_persistent_401_stops_after_second_attempt() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    // The server refuses the fresh token too; the engine must hand the
    // second 401 back instead of refreshing again.
    Mock::given(method("GET"))
        .and(path(DOCS_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "api_access_token": "fresh-token" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let profile = shared_profile(&server.uri(), &dir);
    let engine = Arc::new(RequestEngine::new(profile.clone()));
    let refresher: Arc<dyn TokenRefresher> = Arc::new(TokenManager::new(
        Arc::clone(&engine),
        profile,
        REFRESH_PATH.into(),
    ));

    let response = engine
        .send(ApiRequest::get(DOCS_PATH), &refresher)
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn test_failed_refresh_surfaces_as_refresh_failed() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path(DOCS_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let profile = shared_profile(&server.uri(), &dir);
    let engine = RequestEngine::new(profile);
    let refresher: Arc<dyn TokenRefresher> = Arc::new(NoRefresh);

    match engine.send(ApiRequest::get(DOCS_PATH), &refresher).await {
        Err(StacksmithError::RefreshFailed(_)) => {}
        other => panic!("expected RefreshFailed, got {:?}", other.map(|r| r.status())),
    }
}

#[tokio::test]
async fn test_non_refreshing_path_returns_auth_failures_untouched() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    // Exactly one request may arrive: no retry, no refresh call.
    Mock::given(method("GET"))
        .and(path(DOCS_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let profile = shared_profile(&server.uri(), &dir);
    let engine = RequestEngine::new(profile);

    let response = engine
        .send_without_refresh(ApiRequest::get(DOCS_PATH))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unready_profile_refuses_to_send() {
    let dir = tempfile::tempdir().unwrap();
    let profile = SharedProfile::new(
        ConnectionProfile::default(),
        Arc::new(JsonProfileStore::new(dir.path().join("config.json"))),
    );
    let engine = RequestEngine::new(profile);

    match engine.send_without_refresh(ApiRequest::get(DOCS_PATH)).await {
        Err(StacksmithError::ProfileNotReady(_)) => {}
        other => panic!("expected ProfileNotReady, got {:?}", other.map(|r| r.status())),
    }
}
