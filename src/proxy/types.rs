//! Inbound-leg request and response values.

use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;

use crate::downstream::ByteStream;

/// Request as delivered by the inbound transport.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    /// Always starts with `/`.
    pub path: String,
    /// Undecoded query string, without the leading `?`.
    pub raw_query: Option<String>,
    pub headers: HeaderMap,
    /// `None` is distinct from an empty body.
    pub body: Option<Bytes>,
}

impl GatewayRequest {
    /// Bodiless request with no headers.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            raw_query: None,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// Buffered response to render back to the caller.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Response whose body is relayed chunk by chunk.
pub struct GatewayStreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl std::fmt::Debug for GatewayStreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayStreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
