//! Outbound leg: calls to downstream services.
//!
//! # Data Flow
//! ```text
//! ProxyEngine
//!     → DownstreamRequest (absolute URL, filtered headers, optional body)
//!     → DownstreamClient::execute / execute_stream
//!         → Ok(response)
//!         → Err(DownstreamError::Http(..))   downstream answered with a failure response
//!         → Err(DownstreamError::Transport/Timeout/CircuitOpen/InvalidRequest)
//! ```
//!
//! The failure variants are explicit so the engine never has to dig through
//! error sources to find a response that should still be forwarded.

pub mod client;

use std::io;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use futures_util::Stream;
use thiserror::Error;

use crate::resilience::Retryable;

pub use client::HttpDownstreamClient;

/// Lazily produced body of a streamed response.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// A fully resolved outbound request.
#[derive(Debug, Clone)]
pub struct DownstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Buffered downstream response.
#[derive(Debug, Clone)]
pub struct DownstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Downstream response whose body is still arriving.
pub struct DownstreamStreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl std::fmt::Debug for DownstreamStreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownstreamStreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Body carried by a failure that already holds a complete HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedBody {
    Bytes(Bytes),
    Text(String),
    Absent,
}

impl EmbeddedBody {
    /// Best-effort body: raw bytes when present, else the text form, else nothing.
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            EmbeddedBody::Bytes(bytes) if !bytes.is_empty() => Some(bytes),
            EmbeddedBody::Text(text) if !text.trim().is_empty() => Some(Bytes::from(text)),
            _ => None,
        }
    }
}

/// A complete response attached to a failed call.
#[derive(Debug, Clone)]
pub struct EmbeddedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: EmbeddedBody,
}

/// Failure of a downstream call.
#[derive(Debug, Error)]
pub enum DownstreamError {
    /// The call failed but produced a response that should reach the caller.
    #[error("downstream failed with status {}", .0.status)]
    Http(EmbeddedResponse),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("downstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("circuit breaker is open")]
    CircuitOpen,

    #[error("invalid downstream request: {0}")]
    InvalidRequest(String),
}

impl Retryable for DownstreamError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            DownstreamError::Transport(_) | DownstreamError::Timeout(_)
        )
    }
}

/// Performs single downstream calls.
#[async_trait]
pub trait DownstreamClient: Send + Sync {
    /// Buffered call with the full resilience policy applied.
    async fn execute(
        &self,
        request: DownstreamRequest,
    ) -> Result<DownstreamResponse, DownstreamError>;

    /// Streamed call; only the connect timeout applies.
    async fn execute_stream(
        &self,
        request: DownstreamRequest,
    ) -> Result<DownstreamStreamResponse, DownstreamError>;
}
