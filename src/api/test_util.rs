//! Shared helpers for endpoint tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use tower::util::ServiceExt;

use crate::api::state::AppState;
use crate::api::build_router;
use crate::config::CacheConfig;
use crate::service::StatsService;
use crate::storage::Storage;

/// Build a router over a fresh temp-file database.
pub async fn test_app() -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.sqlite");
    let storage = Storage::connect(path.to_str().unwrap()).await.unwrap();
    storage.init_schema().await.unwrap();

    let cache = CacheConfig {
        ttl_seconds: 0,
        ..CacheConfig::default()
    };
    let state = AppState {
        service: Arc::new(StatsService::new(storage, &cache)),
        default_report_items: cache.default_report_items,
    };
    (build_router(state), dir)
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn put_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
