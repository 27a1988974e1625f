// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /api/data (verbatim body, cache headers, 404, 500)
// - GET /health
// - CORS

use std::sync::Arc;

use serde_json::{json, Value as Json};
use shuttle_axum::axum::{
    body::{self, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use risk_radar::api::{self, DATA_CACHE_CONTROL};

mod support;
use support::{FailingStore, MemoryStore};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

const STORED: &str = r#"{
  "news": {"risk": 14, "detail": "5 articles, 2 critical", "history": [14], "raw_data": {}},
  "total_risk": {"risk": 31, "history": [], "elevated_count": 1},
  "last_updated": "2026-03-02T10:00:00+01:00"
}"#;

fn router_with(body: Option<&str>) -> Router {
    api::router(Arc::new(MemoryStore::with_body(body.map(str::to_string))))
}

async fn get(app: Router, uri: &str) -> Response {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::ORIGIN, "https://dashboard.example.org")
        .body(Body::empty())
        .expect("build request");
    app.oneshot(req).await.expect("oneshot")
}

async fn body_string(resp: Response) -> String {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    String::from_utf8(bytes).expect("utf8")
}

#[tokio::test]
async fn data_is_served_verbatim_with_cache_headers() {
    let resp = get(router_with(Some(STORED)), "/api/data").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CACHE_CONTROL).unwrap(),
        DATA_CACHE_CONTROL
    );
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert!(resp
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert_eq!(body_string(resp).await, STORED);
}

#[tokio::test]
async fn data_is_404_before_first_cycle() {
    let resp = get(router_with(None), "/api/data").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let v: Json = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(v, json!({"error": "no data available"}));
}

#[tokio::test]
async fn data_is_500_when_store_fails() {
    let app = api::router(Arc::new(FailingStore {
        fail_load: true,
        fail_save: false,
    }));
    let resp = get(app, "/api/data").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let v: Json = serde_json::from_str(&body_string(resp).await).unwrap();
    assert!(v.get("error").is_some());
}

#[tokio::test]
async fn health_reports_last_update() {
    let resp = get(router_with(Some(STORED)), "/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let v: Json = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(
        v,
        json!({"status": "ok", "last_update": "2026-03-02T10:00:00+01:00"})
    );

    let resp = get(router_with(None), "/health").await;
    let v: Json = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(v, json!({"status": "ok", "last_update": null}));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let resp = get(router_with(Some(STORED)), "/api/other").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
