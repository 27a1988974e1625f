// src/api.rs
//! Read-only HTTP surface over the published document.

use std::sync::Arc;

use serde_json::{json, Value};
use shuttle_axum::axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::store::DocumentStore;

/// Browser cache for one minute, shared caches for five.
pub const DATA_CACHE_CONTROL: &str = "public, max-age=60, s-maxage=300";

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/data", get(get_data))
        .route("/health", get(health))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Shorthand used by the binary and the integration tests.
pub fn router(store: Arc<dyn DocumentStore>) -> Router {
    create_router(AppState::new(store))
}

/// The stored document, byte for byte.
async fn get_data(State(state): State<AppState>) -> Response {
    match state.store.load().await {
        Ok(Some(body)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::CACHE_CONTROL, DATA_CACHE_CONTROL),
            ],
            body,
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no data available" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(target: "radar", error = ?e, "reading published document failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to read data" })),
            )
                .into_response()
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let last_update = match state.store.load().await {
        Ok(Some(body)) => serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("last_updated").cloned())
            .unwrap_or(Value::Null),
        Ok(None) => Value::Null,
        Err(e) => {
            tracing::warn!(target: "radar", error = ?e, "health: store unreadable");
            Value::Null
        }
    };
    Json(json!({ "status": "ok", "last_update": last_update }))
}
