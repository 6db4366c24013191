//! Tests that span several modules.
//!
//! - **api_tests**: catalog endpoints driven through the full router
//! - **catalog_tests**: catalog queries at scale, Unicode search, read snapshots
//! - **seeding_tests**: TMDB import against recorded responses
//! - **error_tests**: `AppError` responses and field validators
//! - **config_tests**: layered configuration loading and validation
//! - **db_tests**: schema, constraints and cascades
//! - **health_api_tests**: health, readiness, metrics and version endpoints
//!
//! Run a single group with e.g. `cargo test api_tests`.

mod api_tests;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::state::AppState;

pub(crate) const TEST_KEY: &str = "test-secret";

/// Fresh in-memory database with the schema applied. A single connection that
/// never expires keeps the database alive for the whole test.
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(crate::db::connect_options("sqlite::memory:").unwrap())
        .await
        .unwrap();
    crate::db::init_db(&pool).await.unwrap();
    pool
}

pub(crate) async fn test_state(api_secret: Option<&str>) -> AppState {
    let mut config = AppConfig::default();
    config.auth.api_secret = api_secret.map(str::to_string);
    AppState::new(test_pool().await, config)
}

pub(crate) async fn test_app() -> (Router, AppState) {
    let state = test_state(Some(TEST_KEY)).await;
    (crate::routes::router(state.clone()), state)
}

/// Sends one request and returns the status plus the body parsed as JSON
/// (`Value::Null` for an empty body, `Value::String` for plain text).
pub(crate) async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    key: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header("authorization", format!("Bearer {}", key));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

pub(crate) async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, None).await
}

pub(crate) async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body), Some(TEST_KEY)).await
}

pub(crate) async fn patch(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PATCH, uri, Some(body), Some(TEST_KEY)).await
}

pub(crate) async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::DELETE, uri, None, Some(TEST_KEY)).await
}
