//! reqwest-backed downstream client.
//!
//! # Responsibilities
//! - Translate a `DownstreamRequest` into an outbound HTTP call
//! - Apply timeout, retry and circuit breaker to buffered calls
//! - Hand streamed bodies back unbuffered
//!
//! # Design Decisions
//! - Redirects are never followed; a 3xx goes back to the caller as-is
//! - A body is only attached when non-empty
//! - Any HTTP status counts as a successful call for the breaker;
//!   only transport failures and timeouts count against it
//! - Two pooled clients: the streaming one has no overall deadline

use std::error::Error as StdError;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::redirect::Policy;

use crate::config::DownstreamConfig;
use crate::downstream::{
    DownstreamClient, DownstreamError, DownstreamRequest, DownstreamResponse,
    DownstreamStreamResponse,
};
use crate::resilience::{with_deadline, CircuitBreaker, Clock, RetryPolicy, SystemClock, TimedOut};

/// Downstream client with the gateway's resilience policy.
#[derive(Debug)]
pub struct HttpDownstreamClient {
    buffered: reqwest::Client,
    streaming: reqwest::Client,
    request_timeout: Duration,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl HttpDownstreamClient {
    pub fn new(config: &DownstreamConfig) -> Result<Self, reqwest::Error> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a client whose breaker reads time from `clock`.
    pub fn with_clock(
        config: &DownstreamConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        let buffered = reqwest::Client::builder()
            .redirect(Policy::none())
            .connect_timeout(config.connect_timeout())
            .build()?;
        let streaming = reqwest::Client::builder()
            .redirect(Policy::none())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            buffered,
            streaming,
            request_timeout: config.request_timeout(),
            retry: RetryPolicy::from_config(config),
            breaker: CircuitBreaker::with_clock(config.circuit_breaker.clone(), clock),
        })
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    fn prepare(
        client: &reqwest::Client,
        request: &DownstreamRequest,
    ) -> Result<reqwest::RequestBuilder, DownstreamError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| DownstreamError::InvalidRequest(format!("{}: {e}", request.url)))?;

        let mut builder = client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if let Some(body) = request.body.as_ref().filter(|b| !b.is_empty()) {
            builder = builder.body(body.clone());
        }
        Ok(builder)
    }

    async fn attempt(
        &self,
        request: &DownstreamRequest,
    ) -> Result<DownstreamResponse, DownstreamError> {
        let builder = Self::prepare(&self.buffered, request)?;
        let permit = self
            .breaker
            .try_acquire()
            .map_err(|_| DownstreamError::CircuitOpen)?;

        let outcome = with_deadline(self.request_timeout, async {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(DownstreamResponse {
                status,
                headers,
                body,
            })
        })
        .await;

        match outcome {
            Ok(Ok(response)) => {
                permit.record_success();
                Ok(response)
            }
            Ok(Err(err)) => {
                permit.record_failure();
                Err(transport_error(&err))
            }
            Err(TimedOut(limit)) => {
                permit.record_failure();
                Err(DownstreamError::Timeout(limit))
            }
        }
    }
}

#[async_trait]
impl DownstreamClient for HttpDownstreamClient {
    async fn execute(
        &self,
        request: DownstreamRequest,
    ) -> Result<DownstreamResponse, DownstreamError> {
        let request = &request;
        self.retry
            .run(|attempt| {
                tracing::debug!(
                    attempt,
                    method = %request.method,
                    url = %request.url,
                    "Calling downstream"
                );
                self.attempt(request)
            })
            .await
    }

    async fn execute_stream(
        &self,
        request: DownstreamRequest,
    ) -> Result<DownstreamStreamResponse, DownstreamError> {
        tracing::debug!(method = %request.method, url = %request.url, "Opening downstream stream");
        let response = Self::prepare(&self.streaming, &request)?
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map_err(io::Error::other);

        Ok(DownstreamStreamResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }
}

/// Flatten a reqwest error and its causes into one message.
fn transport_error(err: &reqwest::Error) -> DownstreamError {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    DownstreamError::Transport(message)
}
