//! HTTP API gateway library.
//!
//! Routes inbound requests to downstream services by longest path-prefix
//! match, with header filtering, tenant propagation, buffered or streamed
//! forwarding, and timeout/retry/circuit-breaker protection.

// Core pipeline
pub mod config;
pub mod downstream;
pub mod http;
pub mod proxy;
pub mod routing;
pub mod tenancy;

// Cross-cutting concerns
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::ProxyEngine;
