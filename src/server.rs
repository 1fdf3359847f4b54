//! HTTP server for the cached quotes payload.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/quotes` | Cached, normalized quote payload |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `GET /api/quotes` honors `If-None-Match` and `If-Modified-Since` and
//! accepts `?refresh=1` to force an upstream refresh. Responses:
//!
//! - `200` — JSON [`QuotePayload`] with `ETag`, `Last-Modified`, and
//!   `Cache-Control: public, max-age=60, stale-while-revalidate=300`.
//! - `304` — no body, same cache headers, when the client's validators match
//!   a fresh cache entry. A forced or TTL-driven refresh never answers 304.
//! - `500` — `{"error": "..."}` with `Cache-Control: no-store` when
//!   configuration or the upstream chain fails.
//!
//! # Concurrency
//!
//! Handlers share one [`AppState`]; nothing serializes concurrent refreshes.
//! Two requests that both observe a stale cache each run the upstream chain
//! and the last write wins, which is harmless for an idempotent upstream.
//! Single-flight coalescing would be a compatible enhancement.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser tools can
//! consume the endpoint cross-origin.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::client::BitableClient;
use crate::config::Config;
use crate::error::QuoteError;
use crate::fingerprint::fingerprint;
use crate::service::QuoteService;
use crate::store::file::FileStore;
use crate::store::CacheStore;

const CACHE_CONTROL_FRESH: &str = "public, max-age=60, stale-while-revalidate=300";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    service: Arc<QuoteService>,
    store: Arc<dyn CacheStore>,
}

impl AppState {
    /// State backed by the configured file cache.
    pub fn new(config: Config) -> Result<Self, QuoteError> {
        let store = Arc::new(FileStore::new(config.cache.path.clone()));
        Self::with_store(config, store)
    }

    /// State with an explicit store backend (used by tests).
    pub fn with_store(config: Config, store: Arc<dyn CacheStore>) -> Result<Self, QuoteError> {
        let client = BitableClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            service: Arc::new(QuoteService::new(client)),
            store,
        })
    }
}

/// Build the router. Exposed separately from [`run_server`] so tests can
/// bind to an ephemeral port.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/quotes", get(handle_quotes))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState::new(config.clone())?;

    println!("quotes server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

// ============ GET /api/quotes ============

#[derive(Deserialize)]
struct QuotesQuery {
    refresh: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

async fn handle_quotes(
    State(state): State<AppState>,
    Query(query): Query<QuotesQuery>,
    headers: HeaderMap,
) -> Response {
    let force = query.refresh.as_deref() == Some("1");
    let now = Utc::now();

    let outcome = match state
        .service
        .read_through(state.store.as_ref(), state.config.ttl(), force, now)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return error_response(e),
    };

    let from_cache = outcome.from_cache();
    let payload = outcome.into_payload();
    let etag = payload
        .etag
        .clone()
        .unwrap_or_else(|| fingerprint(&payload.quotes));
    let updated = DateTime::parse_from_rfc3339(&payload.updated_at)
        .ok()
        .map(|dt| dt.with_timezone(&Utc));

    let cache_headers = [
        (header::ETAG, etag.clone()),
        (header::LAST_MODIFIED, http_date(updated.unwrap_or(now))),
        (header::CACHE_CONTROL, CACHE_CONTROL_FRESH.to_string()),
    ];

    if from_cache && not_modified(&headers, &etag, updated) {
        return (StatusCode::NOT_MODIFIED, cache_headers).into_response();
    }
    (StatusCode::OK, cache_headers, Json(payload)).into_response()
}

fn error_response(err: QuoteError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CACHE_CONTROL, "no-store".to_string())],
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// Evaluate the client's validators against the cached payload: an exact
/// `If-None-Match` match, or a cached `updated_at` at or before the
/// `If-Modified-Since` time.
fn not_modified(headers: &HeaderMap, etag: &str, updated: Option<DateTime<Utc>>) -> bool {
    if let Some(candidate) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    {
        if candidate == etag {
            return true;
        }
    }

    if let (Some(since), Some(updated)) = (
        headers
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok()),
        updated,
    ) {
        if let Ok(since) = DateTime::parse_from_rfc2822(since) {
            if updated <= since.with_timezone(&Utc) {
                return true;
            }
        }
    }

    false
}

/// IMF-fixdate, e.g. `Mon, 06 Jul 2026 08:00:00 GMT`.
fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
