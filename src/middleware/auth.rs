use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppError;

/// Bytes compared without early exit on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

/// API key from `Authorization: Bearer <key>` or, failing that, `x-api-key`.
pub fn presented_key(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    bearer
        .or_else(|| headers.get("x-api-key").and_then(|h| h.to_str().ok()).map(str::trim))
        .filter(|k| !k.is_empty())
}

fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Guards every mutating request with the configured API secret.
///
/// Reads pass through. Without a configured secret no write can succeed.
pub async fn require_api_key(
    State(cfg): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    if is_read_only(req.method()) {
        return next.run(req).await;
    }
    let authorized = match (cfg.api_secret(), presented_key(req.headers())) {
        (Some(secret), Some(key)) => constant_time_eq(secret.as_bytes(), key.as_bytes()),
        _ => false,
    };
    if !authorized {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            "rejected write without valid API key"
        );
        return AppError::Unauthorized("Invalid API key".to_string()).into_response();
    }
    next.run(req).await
}
