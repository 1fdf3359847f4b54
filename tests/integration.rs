//! End-to-end tests: a real HTTP server in front of a mock Feishu upstream.
//!
//! Each test spins up two ephemeral axum servers — a mock of the Feishu
//! open API (auth + fields + paginated records) and the quotes service
//! itself — and drives the public surface with reqwest.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use bitable_quotes::config::{CacheConfig, Config, ServerConfig, UpstreamConfig};
use bitable_quotes::server::{app, AppState};

const BASE_TOKEN: &str = "base123";
const TABLE_ID: &str = "tbl456";

/// Call counter shared with the mock upstream; one auth call per refresh
/// chain, so it counts how many times the service went upstream.
struct MockState {
    auth_calls: AtomicUsize,
}

async fn mock_auth(State(state): State<Arc<MockState>>) -> Json<Value> {
    state.auth_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "code": 0, "tenant_access_token": "tok-1" }))
}

async fn mock_fields(headers: HeaderMap) -> Json<Value> {
    if !headers.contains_key("authorization") {
        return Json(json!({ "code": 99, "msg": "missing token" }));
    }
    Json(json!({
        "code": 0,
        "data": {
            "items": [
                { "id": "fldA", "name": "内容", "type": "Text" },
                { "id": "fldB", "name": "作者", "type": "Text" },
            ]
        }
    }))
}

/// Two pages of records; the second is only reachable through the cursor.
async fn mock_records(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    if !headers.contains_key("authorization") {
        return Json(json!({ "code": 99, "msg": "missing token" }));
    }
    match params.get("page_token").map(String::as_str) {
        None => Json(json!({
            "code": 0,
            "data": {
                "items": [
                    { "record_id": "r1", "fields": { "内容": "Hello", "作者": [{ "text": "鲁迅" }] } },
                    { "record_id": "r2", "fields": {} },
                ],
                "has_more": true,
                "page_token": "p2",
            }
        })),
        Some("p2") => Json(json!({
            "code": 0,
            "data": {
                "items": [
                    { "record_id": "r3", "fields": { "内容": "World" } },
                ],
                "has_more": false,
            }
        })),
        Some(other) => Json(json!({ "code": 99, "msg": format!("bad cursor {other}") })),
    }
}

async fn spawn_mock_upstream() -> (String, Arc<MockState>) {
    let state = Arc::new(MockState {
        auth_calls: AtomicUsize::new(0),
    });

    let router = Router::new()
        .route(
            "/open-apis/auth/v3/tenant_access_token/internal",
            post(mock_auth),
        )
        .route(
            &format!("/open-apis/bitable/v1/apps/{BASE_TOKEN}/tables/{TABLE_ID}/fields"),
            get(mock_fields),
        )
        .route(
            &format!("/open-apis/bitable/v1/apps/{BASE_TOKEN}/tables/{TABLE_ID}/records"),
            get(mock_records),
        )
        .with_state(state.clone());

    (spawn(router).await, state)
}

/// An upstream whose auth endpoint always rejects the app.
async fn spawn_broken_upstream() -> String {
    async fn reject() -> Json<Value> {
        Json(json!({ "code": 10003, "msg": "app not found" }))
    }
    let router = Router::new().route(
        "/open-apis/auth/v3/tenant_access_token/internal",
        post(reject),
    );
    spawn(router).await
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn make_config(upstream_url: &str, cache_path: std::path::PathBuf) -> Config {
    Config {
        app_id: "app-id".to_string(),
        app_secret: "app-secret".to_string(),
        base_token: BASE_TOKEN.to_string(),
        table_id: TABLE_ID.to_string(),
        view_id: None,
        ttl_minutes: 30,
        server: ServerConfig::default(),
        cache: CacheConfig { path: cache_path },
        upstream: UpstreamConfig {
            base_url: upstream_url.to_string(),
            timeout_secs: 5,
        },
    }
}

async fn spawn_service(config: Config) -> String {
    spawn(app(AppState::new(config).unwrap())).await
}

/// Test environment: mock upstream + service + scratch cache dir.
async fn setup() -> (TempDir, String, Arc<MockState>) {
    let tmp = TempDir::new().unwrap();
    let (upstream_url, mock) = spawn_mock_upstream().await;
    let config = make_config(&upstream_url, tmp.path().join("quotes.json"));
    let service_url = spawn_service(config).await;
    (tmp, service_url, mock)
}

#[tokio::test]
async fn fetches_normalizes_and_paginates() {
    let (_tmp, url, mock) = setup().await;

    let resp = reqwest::get(format!("{url}/api/quotes")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["cache-control"],
        "public, max-age=60, stale-while-revalidate=300"
    );
    let etag = resp.headers()["etag"].to_str().unwrap().to_string();
    assert!(etag.starts_with("W/\""));
    assert!(resp.headers().contains_key("last-modified"));

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["source"], "feishu-bitable");
    assert_eq!(body["etag"], etag.as_str());

    // Both pages were consumed.
    assert_eq!(body["records"].as_array().unwrap().len(), 3);

    // r2 has no text and is dropped; ids stay contiguous.
    let quotes = body["quotes"].as_array().unwrap();
    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0]["id"], 1);
    assert_eq!(quotes[0]["text"], "Hello");
    assert_eq!(quotes[0]["author"], "鲁迅");
    assert_eq!(quotes[1]["id"], 2);
    assert_eq!(quotes[1]["text"], "World");

    assert_eq!(mock.auth_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_request_is_served_from_cache() {
    let (_tmp, url, mock) = setup().await;
    let client = reqwest::Client::new();

    let first: Value = client
        .get(format!("{url}/api/quotes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second: Value = client
        .get(format!("{url}/api/quotes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(first["etag"], second["etag"]);
    assert_eq!(first["updatedAt"], second["updatedAt"]);
    assert_eq!(mock.auth_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn conditional_request_gets_304_on_matching_etag() {
    let (_tmp, url, _mock) = setup().await;
    let client = reqwest::Client::new();

    let first = client.get(format!("{url}/api/quotes")).send().await.unwrap();
    let etag = first.headers()["etag"].to_str().unwrap().to_string();

    let revalidated = client
        .get(format!("{url}/api/quotes"))
        .header("if-none-match", &etag)
        .send()
        .await
        .unwrap();
    assert_eq!(revalidated.status(), 304);
    assert_eq!(revalidated.headers()["etag"].to_str().unwrap(), etag);
    assert!(revalidated.headers().contains_key("cache-control"));
    assert!(revalidated.bytes().await.unwrap().is_empty());

    let mismatched = client
        .get(format!("{url}/api/quotes"))
        .header("if-none-match", "W/\"deadbeef-1\"")
        .send()
        .await
        .unwrap();
    assert_eq!(mismatched.status(), 200);
}

#[tokio::test]
async fn forced_refresh_always_goes_upstream() {
    let (_tmp, url, mock) = setup().await;
    let client = reqwest::Client::new();

    client.get(format!("{url}/api/quotes")).send().await.unwrap();
    assert_eq!(mock.auth_calls.load(Ordering::SeqCst), 1);

    let forced = client
        .get(format!("{url}/api/quotes?refresh=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(forced.status(), 200);
    assert_eq!(mock.auth_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn fresh_seeded_cache_is_served_without_upstream_calls() {
    let tmp = TempDir::new().unwrap();
    let (upstream_url, mock) = spawn_mock_upstream().await;
    let cache_path = tmp.path().join("quotes.json");

    let seeded = json!({
        "source": "feishu-bitable",
        "updatedAt": chrono::Utc::now().to_rfc3339(),
        "schema": [],
        "records": [],
        "quotes": [{ "id": 1, "text": "stale but fresh", "author": "", "category": "" }],
        "etag": "W/\"seed-1\"",
    });
    std::fs::write(&cache_path, seeded.to_string()).unwrap();

    let url = spawn_service(make_config(&upstream_url, cache_path)).await;
    let body: Value = reqwest::get(format!("{url}/api/quotes"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["quotes"][0]["text"], "stale but fresh");
    assert_eq!(mock.auth_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn expired_cache_triggers_a_refresh() {
    let tmp = TempDir::new().unwrap();
    let (upstream_url, mock) = spawn_mock_upstream().await;
    let cache_path = tmp.path().join("quotes.json");

    let seeded = json!({
        "source": "feishu-bitable",
        "updatedAt": (chrono::Utc::now() - chrono::Duration::hours(2)).to_rfc3339(),
        "schema": [],
        "records": [],
        "quotes": [{ "id": 1, "text": "expired", "author": "", "category": "" }],
    });
    std::fs::write(&cache_path, seeded.to_string()).unwrap();

    let url = spawn_service(make_config(&upstream_url, cache_path)).await;
    let body: Value = reqwest::get(format!("{url}/api/quotes"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["quotes"][0]["text"], "Hello");
    assert_eq!(mock.auth_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn corrupt_cache_is_treated_as_a_miss() {
    let tmp = TempDir::new().unwrap();
    let (upstream_url, mock) = spawn_mock_upstream().await;
    let cache_path = tmp.path().join("quotes.json");
    std::fs::write(&cache_path, "{definitely not json").unwrap();

    let url = spawn_service(make_config(&upstream_url, cache_path)).await;
    let resp = reqwest::get(format!("{url}/api/quotes")).await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(mock.auth_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cache_write_failure_still_serves_the_response() {
    let tmp = TempDir::new().unwrap();
    let (upstream_url, _mock) = spawn_mock_upstream().await;

    // The cache path's parent is a regular file, so every write fails.
    let blocker = tmp.path().join("blocker");
    std::fs::write(&blocker, "in the way").unwrap();
    let cache_path = blocker.join("quotes.json");

    let url = spawn_service(make_config(&upstream_url, cache_path)).await;
    let resp = reqwest::get(format!("{url}/api/quotes")).await.unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["quotes"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn upstream_auth_failure_is_a_500() {
    let tmp = TempDir::new().unwrap();
    let upstream_url = spawn_broken_upstream().await;

    let url = spawn_service(make_config(&upstream_url, tmp.path().join("quotes.json"))).await;
    let resp = reqwest::get(format!("{url}/api/quotes")).await.unwrap();

    assert_eq!(resp.status(), 500);
    assert_eq!(resp.headers()["cache-control"], "no-store");
    let body: Value = resp.json().await.unwrap();
    assert!(
        body["error"].as_str().unwrap().contains("app not found"),
        "got {body}"
    );
}

#[tokio::test]
async fn health_reports_ok() {
    let (_tmp, url, _mock) = setup().await;

    let body: Value = reqwest::get(format!("{url}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
