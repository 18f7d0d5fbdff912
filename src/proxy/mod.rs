//! Request routing and forwarding pipeline.
//!
//! # Data Flow
//! ```text
//! GatewayRequest + TenantContext
//!     → RouteTable::find_best_match (404 when nothing matches)
//!     → rewrite path, compose downstream URL
//!     → filter headers, inject tenant
//!     → DownstreamClient::execute / execute_stream
//!     → filter response headers
//!     → GatewayResponse / GatewayStreamResponse
//! ```

pub mod engine;
pub mod types;

pub use engine::{compose_url, ProxyEngine};
pub use types::{GatewayRequest, GatewayResponse, GatewayStreamResponse};
