//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, middleware, tenant resolution)
//!     → request.rs (extract GatewayRequest, streaming detection)
//!     → proxy engine (route, forward)
//!     → response.rs (render headers and body or stream)
//!     → Send to client
//! ```
//!
//! headers.rs holds the header policy used on both legs.

pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, ServerError};
