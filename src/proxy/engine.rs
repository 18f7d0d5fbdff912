//! Proxy orchestration.
//!
//! # Responsibilities
//! - Resolve the route for a path against the current route snapshot
//! - Build the downstream request (URL, filtered headers, tenant, body)
//! - Relay downstream responses, including failures that carry a response
//!
//! # Design Decisions
//! - The route table is read once per request; a reload mid-request is not seen
//! - Retries happen only inside the downstream client, never here
//! - Embedded failure responses are only recovered on the buffered path

use std::sync::Arc;
use std::time::Instant;

use axum::http::{Method, StatusCode};

use crate::downstream::{DownstreamClient, DownstreamError, DownstreamRequest};
use crate::error::GatewayError;
use crate::http::headers::{filter_headers, force_streaming_headers, inject_tenant};
use crate::observability::metrics;
use crate::proxy::types::{GatewayRequest, GatewayResponse, GatewayStreamResponse};
use crate::routing::RouteSource;
use crate::tenancy::TenantContext;

const UNMATCHED_ROUTE: &str = "none";

/// Routes gateway requests to downstream services.
pub struct ProxyEngine {
    routes: Arc<dyn RouteSource>,
    downstream: Arc<dyn DownstreamClient>,
}

struct PreparedCall {
    route_id: String,
    request: DownstreamRequest,
}

impl ProxyEngine {
    pub fn new(routes: Arc<dyn RouteSource>, downstream: Arc<dyn DownstreamClient>) -> Self {
        Self { routes, downstream }
    }

    /// Forward a buffered request.
    pub async fn proxy(
        &self,
        request: GatewayRequest,
        tenant: &TenantContext,
    ) -> Result<GatewayResponse, GatewayError> {
        let start = Instant::now();
        let method = request.method.clone();

        let call = match self.prepare(request, tenant) {
            Ok(call) => call,
            Err(e) => {
                record(&method, e.status(), UNMATCHED_ROUTE, start);
                return Err(e);
            }
        };

        let route_id = call.route_id;
        let result = match self.downstream.execute(call.request).await {
            Ok(response) => Ok(GatewayResponse {
                status: response.status,
                headers: filter_headers(&response.headers),
                body: Some(response.body),
            }),
            Err(DownstreamError::Http(embedded)) => {
                tracing::info!(
                    route_id = %route_id,
                    status = %embedded.status,
                    "Relaying response carried by downstream failure"
                );
                Ok(GatewayResponse {
                    status: embedded.status,
                    headers: filter_headers(&embedded.headers),
                    body: embedded.body.into_bytes(),
                })
            }
            Err(e) => Err(GatewayError::from(e)),
        };

        let status = match &result {
            Ok(response) => response.status,
            Err(e) => e.status(),
        };
        record(&method, status, &route_id, start);
        result
    }

    /// Forward a request whose response is relayed as a stream.
    pub async fn proxy_stream(
        &self,
        request: GatewayRequest,
        tenant: &TenantContext,
    ) -> Result<GatewayStreamResponse, GatewayError> {
        let start = Instant::now();
        let method = request.method.clone();

        let call = match self.prepare(request, tenant) {
            Ok(call) => call,
            Err(e) => {
                record(&method, e.status(), UNMATCHED_ROUTE, start);
                return Err(e);
            }
        };

        match self.downstream.execute_stream(call.request).await {
            Ok(response) => {
                let mut headers = filter_headers(&response.headers);
                force_streaming_headers(&mut headers);
                record(&method, response.status, &call.route_id, start);
                Ok(GatewayStreamResponse {
                    status: response.status,
                    headers,
                    body: response.body,
                })
            }
            Err(e) => {
                let error = GatewayError::from(e);
                record(&method, error.status(), &call.route_id, start);
                Err(error)
            }
        }
    }

    fn prepare(
        &self,
        request: GatewayRequest,
        tenant: &TenantContext,
    ) -> Result<PreparedCall, GatewayError> {
        let table = self.routes.current_routes();
        let Some(matched) = table.find_best_match(&request.path) else {
            tracing::warn!(path = %request.path, "No route matched");
            return Err(GatewayError::RouteNotFound { path: request.path });
        };

        let downstream_path = matched.downstream_path(&request.path);
        let url = compose_url(
            matched.route.target().base_url(),
            &downstream_path,
            request.raw_query.as_deref(),
        );

        let mut headers = filter_headers(&request.headers);
        inject_tenant(&mut headers, tenant);

        tracing::debug!(
            route_id = %matched.route.id(),
            matched_prefix = %matched.matched_prefix,
            downstream_url = %url,
            "Route resolved"
        );

        Ok(PreparedCall {
            route_id: matched.route.id().to_string(),
            request: DownstreamRequest {
                method: request.method,
                url,
                headers,
                body: request.body,
            },
        })
    }
}

/// `base_url + path`, plus `?query` when the query is not blank. The query is
/// passed through without re-encoding.
pub fn compose_url(base_url: &str, path: &str, raw_query: Option<&str>) -> String {
    match raw_query.filter(|q| !q.trim().is_empty()) {
        Some(query) => format!("{base_url}{path}?{query}"),
        None => format!("{base_url}{path}"),
    }
}

fn record(method: &Method, status: StatusCode, route: &str, start: Instant) {
    metrics::record_request(method.as_str(), status.as_u16(), route, start);
}
