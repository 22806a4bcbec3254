//! Integration tests for the transcriba-server HTTP API
//!
//! Every test runs against a fresh SQLite database in a temporary root
//! folder and an in-memory archive instead of remote HTTP sources.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method
use transcriba_common::config::{RootFolderInitializer, TranscribaConfig};
use transcriba_common::db::{init_database, users};
use transcriba_common::Result;
use transcriba_server::remote::RemoteSource;
use transcriba_server::services::rbac;
use transcriba_server::{build_router, AppState};

/// Archive serving a metadata record with explicit image dimensions
struct FixtureArchive;

#[async_trait]
impl RemoteSource for FixtureArchive {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let external_id = url.rsplit('/').next().unwrap_or(url);
        Ok(json!({
            "title": format!("Record {}", external_id),
            "mainAuthor": "Clara",
            "imageUrl": format!("http://images.example.org/{}.jpg", external_id),
            "width": 4096,
            "height": 3000,
        }))
    }

    async fn fetch_bytes(&self, _url: &str) -> Result<Vec<u8>> {
        Ok(vec![0xFF, 0xD8, 0xFF, 0xD9])
    }
}

/// Test helper: Create app state on a temporary root folder
async fn setup_state() -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let config = TranscribaConfig::default();
    let paths = RootFolderInitializer::new(dir.path().to_path_buf()).paths(&config);
    std::fs::create_dir_all(&paths.imports).expect("Should create import dir");

    let pool = init_database(&paths.database)
        .await
        .expect("Should create database");
    rbac::bootstrap(&pool, &config)
        .await
        .expect("Should bootstrap accounts");

    let state = AppState::new(pool, config, paths, Arc::new(FixtureArchive));
    (state, dir)
}

/// Test helper: Send a request and return status and JSON body
async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Test helper: GET a binary resource; returns status, content type and bytes
async fn fetch(app: &Router, uri: &str) -> (StatusCode, String, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    (status, content_type, bytes.to_vec())
}

/// Test helper: Register, confirm and log in a user; returns the token
async fn signed_up_user(app: &Router, state: &AppState, name: &str, score: i64) -> String {
    let (status, user) = send(
        app,
        "POST",
        "/api/AppUsers",
        None,
        Some(json!({"username": name, "email": format!("{}@example.org", name), "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = user["id"].as_str().unwrap().to_string();

    let stored = users::find_by_id(&state.db, &id).await.unwrap().unwrap();
    let token = stored.verification_token.unwrap();
    let (status, _) = send(
        app,
        "GET",
        &format!("/api/AppUsers/confirm?uid={}&token={}", id, token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    if score != 0 {
        users::add_score(&state.db, &id, score).await.unwrap();
    }
    login(app, name, "secret").await
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/AppUsers/login",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login of {} failed: {}", username, body);
    body["id"].as_str().unwrap().to_string()
}

/// Test helper: Create a source and import one record as admin; returns the object id
async fn import_record(app: &Router, admin: &str, external_id: &str) -> (String, String) {
    let (status, source) = send(
        app,
        "POST",
        "/api/Sources",
        Some(admin),
        Some(json!({"title": "Town Archive", "url": "http://archive.example.org/{id}", "logoUrl": "http://archive.example.org/logo.png"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let source_id = source["id"].as_str().unwrap().to_string();

    let (status, imported) = send(
        app,
        "POST",
        "/api/TranscribaObjects/import",
        Some(admin),
        Some(json!({"externalId": external_id, "sourceId": source_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "import failed: {}", imported);
    (source_id, imported.as_str().unwrap().to_string())
}

// =============================================================================
// Health and status
// =============================================================================

#[tokio::test]
async fn test_health_and_status() {
    let (state, _dir) = setup_state().await;
    let app = build_router(state);

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "transcriba-server");

    let (status, body) = send(&app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["started"].is_string());
    assert!(body["uptime"].is_number());
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test]
async fn test_register_confirm_login_flow() {
    let (state, _dir) = setup_state().await;
    let app = build_router(state.clone());

    let token = signed_up_user(&app, &state, "alice", 0).await;

    let (status, body) = send(&app, "GET", "/api/AppUsers/score", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 0);

    let (status, body) = send(&app, "POST", "/api/AppUsers/tutorial", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 15);

    let (status, body) = send(&app, "GET", "/api/AppUsers/leaderboard?maxNumOfUsers=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["username"], "alice");

    let (status, _) = send(&app, "POST", "/api/AppUsers/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, "GET", "/api/AppUsers/score", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let (state, _dir) = setup_state().await;
    let app = build_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/AppUsers")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).expect("Error body should be JSON");
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].as_str().unwrap().contains("JSON"));

    let (status, body) = send(&app, "GET", "/api/AppUsers/leaderboard?maxNumOfUsers=many", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_token_in_query_parameter() {
    let (state, _dir) = setup_state().await;
    let app = build_router(state.clone());
    let token = signed_up_user(&app, &state, "alice", 0).await;

    let uri = format!("/api/AppUsers/busy?access_token={}", token);
    let (status, body) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["busy"], false);
}

#[tokio::test]
async fn test_bot_login_forbidden() {
    let (state, _dir) = setup_state().await;
    let app = build_router(state);

    let (status, body) = send(
        &app,
        "POST",
        "/api/AppUsers/login",
        None,
        Some(json!({"username": "bot", "password": "bot"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_admin_endpoints_reject_regular_users() {
    let (state, _dir) = setup_state().await;
    let app = build_router(state.clone());
    let token = signed_up_user(&app, &state, "alice", 0).await;

    let (status, _) = send(&app, "GET", "/api/Sources", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "GET", "/api/Sources", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Sources, collections and import
// =============================================================================

#[tokio::test]
async fn test_import_summary_and_collection_progress() {
    let (state, _dir) = setup_state().await;
    let app = build_router(state.clone());
    let admin = login(&app, "admin", "admin").await;

    let (source_id, object_id) = import_record(&app, &admin, "R-1").await;

    let (status, summary) = send(&app, "GET", &format!("/api/Sources/{}/summary", source_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["title"], "Town Archive");
    assert!(summary.get("url").is_none());

    let (status, object) = send(&app, "GET", &format!("/api/TranscribaObjects/{}", object_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(object["title"], "Record R-1");
    assert_eq!(object["status"], "free");

    let (_, dimensions) = send(&app, "GET", &format!("/api/TranscribaObjects/{}/dimensions", object_id), None, None).await;
    assert_eq!(dimensions, json!([4096, 3000]));
    let (_, zoomsteps) = send(&app, "GET", &format!("/api/TranscribaObjects/{}/zoomsteps", object_id), None, None).await;
    assert_eq!(zoomsteps, json!(5));

    let (status, collections) = send(&app, "GET", "/api/Collections", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(collections[0]["locked"], true);
    assert_eq!(collections[0]["progress"], 0.0);

    let collection_id = collections[0]["id"].as_str().unwrap();
    let (status, page) = send(
        &app,
        "GET",
        &format!("/api/Collections/{}/transcribaObjects?page=1", collection_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["totalObjects"], 1);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/Collections/{}/transcribaObjects/rel/{}", collection_id, object_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        "/api/TranscribaObjects/import",
        Some(&admin),
        Some(json!({"externalId": "R-1", "sourceId": source_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE");
}

#[tokio::test]
async fn test_missing_images_are_not_found() {
    let (state, _dir) = setup_state().await;
    let app = build_router(state.clone());
    let admin = login(&app, "admin", "admin").await;
    let (_, object_id) = import_record(&app, &admin, "R-2").await;

    let (status, body) = send(&app, "GET", &format!("/api/TranscribaObjects/{}/thumbnail", object_id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(&app, "GET", "/api/TranscribaObjects/unknown/overview", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_image_paths_stay_inside_imports() {
    let (state, dir) = setup_state().await;
    let app = build_router(state.clone());
    let outside = dir.path().join("leak");
    std::fs::create_dir_all(&outside).unwrap();
    std::fs::write(outside.join("thumbnail.jpg"), b"outside of imports").unwrap();
    std::fs::write(outside.join("overview.jpg"), b"outside of imports").unwrap();

    for uri in [
        "/api/TranscribaObjects/..%2Fleak/thumbnail",
        "/api/TranscribaObjects/..%2Fleak/overview",
        "/api/TranscribaObjects/..%2F..%2Fleak/tiles?zoom=0&x=0&y=0",
    ] {
        let (status, _, bytes) = fetch(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} was served", uri);
        assert_ne!(bytes, b"outside of imports");
    }

    let absolute = format!(
        "/api/TranscribaObjects/{}/thumbnail",
        outside.display().to_string().replace('/', "%2F")
    );
    let (status, _, _) = fetch(&app, &absolute).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_tile_is_blank_png() {
    let (state, _dir) = setup_state().await;
    let app = build_router(state.clone());
    let admin = login(&app, "admin", "admin").await;
    let (_, object_id) = import_record(&app, &admin, "R-4").await;

    let (status, content_type, bytes) = fetch(
        &app,
        &format!("/api/TranscribaObjects/{}/tiles?zoom=9&x=40&y=40", object_id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "image/png");
    assert!(bytes.starts_with(b"\x89PNG"));

    let tile_dir = state.paths.imports.join(&object_id).join("tiled/0/0");
    std::fs::create_dir_all(&tile_dir).unwrap();
    std::fs::write(tile_dir.join("0.jpg"), b"tile").unwrap();
    let (status, content_type, bytes) = fetch(
        &app,
        &format!("/api/TranscribaObjects/{}/tiles?zoom=0&x=0&y=0", object_id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "image/jpeg");
    assert_eq!(bytes, b"tile");
}

// =============================================================================
// Editing and voting
// =============================================================================

#[tokio::test]
async fn test_occupy_save_publish_and_vote() {
    let (state, _dir) = setup_state().await;
    let app = build_router(state.clone());
    let admin = login(&app, "admin", "admin").await;
    let (_, object_id) = import_record(&app, &admin, "R-3").await;

    let writer = signed_up_user(&app, &state, "writer", 0).await;
    let first = signed_up_user(&app, &state, "first", 60).await;
    let second = signed_up_user(&app, &state, "second", 60).await;

    let (status, revision) = send(&app, "POST", &format!("/api/TranscribaObjects/{}/occupy", object_id), Some(&writer), None).await;
    assert_eq!(status, StatusCode::OK);
    let revision_id = revision["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "POST", &format!("/api/TranscribaObjects/{}/occupy", object_id), Some(&first), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "OCCUPIED");

    let content = json!({
        "type": "root",
        "properties": {},
        "isDirty": true,
        "children": [{"type": "line", "properties": {"value": "Dear Sir"}, "children": [], "isDirty": true}]
    });
    let (status, saved) = send(
        &app,
        "POST",
        &format!("/api/TranscribaObjects/{}/save", object_id),
        Some(&writer),
        Some(json!({"content": content})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["published"], false);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/TranscribaObjects/{}/publish", object_id),
        Some(&writer),
        Some(json!({"content": content})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, true);

    let (_, object) = send(&app, "GET", &format!("/api/TranscribaObjects/{}", object_id), None, None).await;
    assert_eq!(object["status"], "voting");

    let (_, permissions) = send(
        &app,
        "GET",
        &format!("/api/TranscribaObjects/{}/latestPermissions", object_id),
        Some(&writer),
        None,
    )
    .await;
    assert_eq!(permissions["allowVote"], false);
    assert_eq!(permissions["details"]["isOwner"], true);

    let (_, guest) = send(&app, "GET", &format!("/api/TranscribaObjects/{}/latestPermissions", object_id), None, None).await;
    assert_eq!(guest["allowVote"], false);

    for voter in [&first, &second] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/Votings/vote",
            Some(voter),
            Some(json!({"objectType": "Revision", "objectId": revision_id, "vote": "accept"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "vote failed: {}", body);
    }

    let (_, stable) = send(&app, "GET", &format!("/api/TranscribaObjects/{}/stable", object_id), None, None).await;
    assert_eq!(stable["id"], revision_id.as_str());
    let (_, score) = send(&app, "GET", "/api/AppUsers/score", Some(&writer), None).await;
    assert_eq!(score["score"], 10);

    let (status, outcome) = send(
        &app,
        "GET",
        &format!("/api/Votings/outcome?objectType=Revision&objectId={}", revision_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["accept"], 2);
    assert_eq!(outcome["refuse"], 0);

    let (_, chronic) = send(&app, "GET", &format!("/api/TranscribaObjects/{}/chronic", object_id), None, None).await;
    assert_eq!(chronic[0]["username"], "writer");
    assert_eq!(chronic.as_array().unwrap().len(), 2);
}

// =============================================================================
// Info pages and discussions
// =============================================================================

#[tokio::test]
async fn test_info_page_and_comments() {
    let (state, _dir) = setup_state().await;
    let app = build_router(state.clone());
    let admin = login(&app, "admin", "admin").await;
    let reader = signed_up_user(&app, &state, "reader", 0).await;

    let (status, page) = send(
        &app,
        "POST",
        "/api/InfoPages",
        Some(&admin),
        Some(json!({"name": "about", "title": "About", "content": "| a |\n|---|\n| 1 |\n"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let discussion_id = page["discussionId"].as_str().unwrap().to_string();

    let (status, parsed) = send(&app, "GET", "/api/InfoPages/about/parsed", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(parsed["content"].as_str().unwrap().contains("table-responsive"));

    let (status, _) = send(&app, "GET", "/api/InfoPages/imprint/parsed", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/Discussions/{}/comments", discussion_id);
    let (status, _) = send(&app, "POST", &uri, None, Some(json!({"content": "Hello"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, comment) = send(&app, "POST", &uri, Some(&reader), Some(json!({"content": "Hello"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comment["content"], "Hello");

    let (status, listing) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["totalComments"], 1);
}
