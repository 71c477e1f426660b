use axum::http::HeaderMap;

pub mod chat;
pub mod health;
pub mod persona;

/// Caller-supplied `X-Request-Id`, or `-` when absent.
pub(crate) fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get("X-Request-Id")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
}
