//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with the catch-all proxy handler
//! - Wire up middleware (request id, tracing, panic recovery, CORS, limits)
//! - Answer health checks ahead of the proxy route
//! - Resolve the tenant once per request
//! - Pick buffered or streamed forwarding
//! - Serve until the shutdown future resolves

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::validation::validate_config;
use crate::config::{ConfigError, CorsConfig, GatewayConfig};
use crate::downstream::{DownstreamClient, HttpDownstreamClient};
use crate::error::GatewayError;
use crate::health;
use crate::http::request::{extract_request, is_streaming_request, request_id};
use crate::http::response::{render_buffered, render_stream};
use crate::observability::metrics;
use crate::proxy::ProxyEngine;
use crate::routing::{RouteError, RouteSource, RouteTable, SharedRouteTable};
use crate::tenancy::{resolver_from_config, TenantResolver};

/// Failure to assemble the server from configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid route table: {0}")]
    Routes(#[from] RouteError),

    #[error("failed to build downstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProxyEngine>,
    pub tenants: Arc<dyn TenantResolver>,
    pub max_body_bytes: usize,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    routes: Arc<SharedRouteTable>,
    config: GatewayConfig,
}

impl HttpServer {
    /// Build the server and its downstream client from configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let routes = Arc::new(SharedRouteTable::new(RouteTable::from_config(&config.routes)?));
        let downstream = Arc::new(HttpDownstreamClient::new(&config.downstream)?);
        let tenants = resolver_from_config(&config.tenancy);
        Ok(Self::with_parts(config, routes, downstream, tenants))
    }

    /// Build the server around externally supplied collaborators.
    ///
    /// `config` is expected to have passed validation.
    pub fn with_parts(
        config: GatewayConfig,
        routes: Arc<SharedRouteTable>,
        downstream: Arc<dyn DownstreamClient>,
        tenants: Arc<dyn TenantResolver>,
    ) -> Self {
        let engine = Arc::new(ProxyEngine::new(routes.clone(), downstream));
        let state = AppState {
            engine,
            tenants,
            max_body_bytes: config.listener.max_body_bytes,
        };
        let router = Self::build_router(&config, state, routes.clone());
        Self {
            router,
            routes,
            config,
        }
    }

    /// Build the axum router with all middleware layers.
    fn build_router(
        config: &GatewayConfig,
        state: AppState,
        routes: Arc<SharedRouteTable>,
    ) -> Router {
        // One semaphore shared by every route, so the bound is gateway-wide.
        let mut proxy = Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(GlobalConcurrencyLimitLayer::new(
                config.listener.max_concurrent_requests,
            ));

        if config.cors.enabled {
            proxy = proxy.layer(cors_layer(&config.cors));
        }

        health::router(&config.listener, routes)
            .merge(proxy)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(request.headers()),
                    method = %request.method(),
                    path = %request.uri().path(),
                    tenant_id = tracing::field::Empty,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Handle for swapping the route table on reload.
    pub fn routes(&self) -> Arc<SharedRouteTable> {
        self.routes.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.current_routes().len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// CORS handled by the gateway itself; an empty origin list mirrors the caller.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Render a panic anywhere in request handling as an opaque 500.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "panic with non-string payload".to_string());
    GatewayError::Internal(detail).into_response()
}

/// Main proxy handler.
/// Resolves the tenant, extracts the request and forwards it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let tenant = match state.tenants.resolve(&parts) {
        Ok(tenant) => tenant,
        Err(e) => return reject(&parts.method, GatewayError::from(e), start),
    };
    if let Some(tenant_id) = tenant.tenant_id() {
        tracing::Span::current().record("tenant_id", tracing::field::display(tenant_id));
    }

    let request = match extract_request(&parts, body, state.max_body_bytes).await {
        Ok(request) => request,
        Err(e) => return reject(&parts.method, e, start),
    };

    if is_streaming_request(&request.method, &request.path, &request.headers) {
        tracing::debug!(path = %request.path, "Relaying as stream");
        match state.engine.proxy_stream(request, &tenant).await {
            Ok(response) => render_stream(response),
            Err(e) => e.into_response(),
        }
    } else {
        match state.engine.proxy(request, &tenant).await {
            Ok(response) => render_buffered(response),
            Err(e) => e.into_response(),
        }
    }
}

/// Failure before the engine saw the request.
fn reject(method: &axum::http::Method, error: GatewayError, start: Instant) -> Response {
    metrics::record_request(method.as_str(), error.status().as_u16(), "none", start);
    error.into_response()
}
