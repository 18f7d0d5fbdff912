//! Request handling at the inbound boundary.
//!
//! # Responsibilities
//! - Read the request id assigned by the request-id layer
//! - Turn an axum request into a `GatewayRequest`
//! - Decide whether the response should be streamed
//!
//! # Design Decisions
//! - The query string is kept undecoded
//! - Empty bodies are dropped except for POST/PUT/PATCH

use axum::body::{to_bytes, Body};
use axum::http::header::ACCEPT;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, Method};

use crate::error::GatewayError;
use crate::proxy::GatewayRequest;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const MULTIPART_REPLACE: &str = "multipart/x-mixed-replace";

/// Request id set by the request-id layer, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Blank becomes `/`; a leading `/` is always present.
pub fn normalize_path(path: &str) -> String {
    if path.trim().is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn keeps_empty_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Build the gateway request from already-split parts and the raw body.
pub async fn extract_request(
    parts: &Parts,
    body: Body,
    max_body_bytes: usize,
) -> Result<GatewayRequest, GatewayError> {
    let bytes = to_bytes(body, max_body_bytes)
        .await
        .map_err(|e| GatewayError::InvalidRequest(format!("unreadable request body: {e}")))?;

    let body = if !bytes.is_empty() || keeps_empty_body(&parts.method) {
        Some(bytes)
    } else {
        None
    };

    Ok(GatewayRequest {
        method: parts.method.clone(),
        path: normalize_path(parts.uri.path()),
        raw_query: parts.uri.query().map(str::to_string),
        headers: parts.headers.clone(),
        body,
    })
}

/// GET requests for `.../stream` or accepting `multipart/x-mixed-replace`
/// are relayed as streams.
pub fn is_streaming_request(method: &Method, path: &str, headers: &HeaderMap) -> bool {
    if method != Method::GET {
        return false;
    }
    if path.ends_with("/stream") {
        return true;
    }
    headers.get_all(ACCEPT).iter().any(|value| {
        value
            .to_str()
            .map(|v| v.to_ascii_lowercase().contains(MULTIPART_REPLACE))
            .unwrap_or(false)
    })
}
