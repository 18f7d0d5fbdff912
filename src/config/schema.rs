//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Route definitions, in matching order.
    pub routes: Vec<RouteConfig>,

    /// Downstream client and resilience settings.
    pub downstream: DownstreamConfig,

    /// CORS handling on the inbound side.
    pub cors: CorsConfig,

    /// How the tenant of a request is determined.
    pub tenancy: TenancyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum requests processed concurrently (backpressure).
    pub max_concurrent_requests: usize,

    /// Maximum inbound request body size in bytes.
    pub max_body_bytes: usize,

    /// Liveness check path, answered by the gateway itself.
    pub health_path: String,

    /// Readiness check path, answered by the gateway itself.
    pub ready_path: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_concurrent_requests: 1024,
            max_body_bytes: 10 * 1024 * 1024,
            health_path: "/healthz".to_string(),
            ready_path: "/readyz".to_string(),
        }
    }
}

/// Route configuration mapping path prefixes to a downstream target.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub id: String,

    /// Literal path prefixes this route answers for.
    pub path_prefixes: Vec<String>,

    /// Remove the matched prefix before forwarding.
    #[serde(default)]
    pub strip_prefix: bool,

    /// Where matching requests are sent.
    pub target: TargetConfig,
}

/// Downstream target of a route.
///
/// Either `base_url` or `service_name` must be set; `base_url` wins when both are.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Absolute base URL (e.g., "http://users:8080").
    pub base_url: Option<String>,

    /// Service host name, combined with `scheme` and `port`.
    pub service_name: Option<String>,

    /// Scheme used with `service_name`.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Optional port used with `service_name`.
    pub port: Option<u16>,
}

fn default_scheme() -> String {
    "http".to_string()
}

impl TargetConfig {
    /// Target pointing at an absolute base URL.
    pub fn from_base_url(url: impl Into<String>) -> Self {
        Self {
            base_url: Some(url.into()),
            ..Self::default()
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            service_name: None,
            scheme: default_scheme(),
            port: None,
        }
    }
}

/// Downstream client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Total time for a buffered request/response in milliseconds.
    pub request_timeout_ms: u64,

    /// Additional attempts after a failed buffered call.
    pub max_retries: u32,

    /// Fixed delay between attempts in milliseconds.
    pub retry_delay_ms: u64,

    /// Circuit breaker guarding buffered calls.
    pub circuit_breaker: CircuitBreakerConfig,
}

impl DownstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            request_timeout_ms: 8_000,
            max_retries: 2,
            retry_delay_ms: 200,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Size of the rolling window; the breaker only trips on a full window.
    pub request_volume_threshold: usize,

    /// Failure ratio over the window above which the breaker opens, in (0, 1).
    pub failure_ratio: f64,

    /// Time the breaker stays open before allowing trial calls, in milliseconds.
    pub delay_ms: u64,

    /// Concurrent trial calls allowed while half-open.
    pub half_open_max_calls: u32,

    /// Successful trial calls needed to close again.
    pub success_threshold: u32,
}

impl CircuitBreakerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            request_volume_threshold: 8,
            failure_ratio: 0.5,
            delay_ms: 5_000,
            half_open_max_calls: 1,
            success_threshold: 1,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Emit CORS headers from the gateway.
    pub enabled: bool,

    /// Allowed origins. Empty mirrors the request `Origin`.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: Vec::new(),
        }
    }
}

/// Tenant resolution strategy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TenancyConfig {
    /// No tenant header is ever added.
    #[default]
    None,
    /// Tenant taken from the authenticated identity's claims.
    Claims,
    /// Every request is stamped with the same tenant.
    Fixed { tenant_id: Uuid },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
