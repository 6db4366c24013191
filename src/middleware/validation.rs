use axum::{
    extract::Request,
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::AppError;

const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Largest accepted request body in bytes, from `FILMREGAL_MAX_BODY_SIZE`
/// (clamped to 64 KiB..=10 MiB, default 1 MiB).
pub fn max_body_size() -> usize {
    std::env::var("FILMREGAL_MAX_BODY_SIZE")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_BODY_SIZE)
        .clamp(64 * 1024, 10 * 1024 * 1024)
}

/// Rejects obviously malformed requests before routing: traversal sequences in the
/// path and declared bodies above [`max_body_size`]. Suspicious user agents are only
/// logged.
pub async fn validate_request_middleware(req: Request, next: Next) -> Response {
    let uri_path = req.uri().path();
    if contains_path_traversal(uri_path) {
        tracing::warn!(path = %sanitize_for_logging(uri_path), "path traversal attempt");
        return AppError::BadRequest("Path traversal detected in request".to_string())
            .into_response();
    }

    if let Some(ua) = req.headers().get(header::USER_AGENT).and_then(|v| v.to_str().ok()) {
        if is_suspicious_user_agent(ua) {
            tracing::warn!("Suspicious user agent detected: {}", sanitize_for_logging(ua));
        }
    }

    if matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH) {
        let declared = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        let limit = max_body_size();
        if let Some(length) = declared.filter(|len| *len > limit) {
            tracing::debug!(length, limit, "request body too large");
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({
                    "error": {
                        "code": "PAYLOAD_TOO_LARGE",
                        "message": format!("Request body exceeds maximum size of {} bytes", limit),
                    },
                    "status": 413,
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })),
            )
                .into_response();
        }
    }

    next.run(req).await
}

fn contains_path_traversal(path: &str) -> bool {
    if path.contains("/..")
        || path.contains("\\..")
        || path.starts_with("..")
        || path.contains("/./")
    {
        return true;
    }
    let lower = path.to_lowercase();
    // single and double URL encoding of '.', '/', '\' and NUL
    ["%2e%2e", "%252e%252e", "%2e/", "/%2e", "%2f%2e", "%5c%2e", "%00"]
        .iter()
        .any(|p| lower.contains(p))
        || path.contains('\0')
}

fn is_suspicious_user_agent(ua: &str) -> bool {
    let ua = ua.to_lowercase();
    ["nikto", "sqlmap", "havij", "acunetix", "scanner"].iter().any(|needle| ua.contains(needle))
}

/// Strips control characters, bounds the length and escapes quotes so user input
/// can go into log lines.
pub fn sanitize_for_logging(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || *c == ' ')
        .take(200)
        .collect::<String>()
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}
