//! Response rendering at the inbound boundary.
//!
//! # Responsibilities
//! - Turn gateway responses into axum responses
//! - Leave `Access-Control-*` to the CORS layer
//! - Relay streamed bodies chunk by chunk
//!
//! # Design Decisions
//! - Content-Type is set once from its first value
//! - Downstream `Access-Control-*` headers are dropped; the values a caller sees
//!   are the gateway CORS layer's (a downstream `*` never reaches the caller)
//! - A downstream read error ends a stream cleanly; the status line is already out

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::Stream;

use crate::downstream::ByteStream;
use crate::http::headers::is_cors_header;
use crate::proxy::{GatewayResponse, GatewayStreamResponse};

fn copy_headers(from: &HeaderMap, to: &mut HeaderMap) {
    if let Some(content_type) = from.get(CONTENT_TYPE) {
        to.insert(CONTENT_TYPE, content_type.clone());
    }
    for (name, value) in from {
        if name == CONTENT_TYPE || is_cors_header(name.as_str()) {
            continue;
        }
        to.append(name.clone(), value.clone());
    }
}

pub fn render_buffered(response: GatewayResponse) -> Response {
    let body = response.body.map(Body::from).unwrap_or_else(Body::empty);
    let mut rendered = (response.status, body).into_response();
    copy_headers(&response.headers, rendered.headers_mut());
    rendered
}

pub fn render_stream(response: GatewayStreamResponse) -> Response {
    let body = Body::from_stream(RelayStream::new(response.body));
    let mut rendered = (response.status, body).into_response();
    copy_headers(&response.headers, rendered.headers_mut());
    rendered
}

/// Downstream body relayed to the client; ends at the first read error.
pub struct RelayStream {
    inner: ByteStream,
    finished: bool,
}

impl RelayStream {
    pub fn new(inner: ByteStream) -> Self {
        Self {
            inner,
            finished: false,
        }
    }
}

impl Stream for RelayStream {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(Some(Err(e))) => {
                tracing::debug!(error = %e, "Downstream stream ended with error");
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
