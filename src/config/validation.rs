//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every route resolves to a valid target
//! - Validate value ranges (timeouts > 0, ratios in range)
//! - Detect duplicate route ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::routing::{RouteDefinition, RouteError};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("routes[{index}]: {source}")]
    Route { index: usize, source: RouteError },

    #[error("route id `{0}` is declared more than once")]
    DuplicateRouteId(String),

    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("{field} `{path}` must be an absolute path other than `/`")]
    HealthPath { field: &'static str, path: String },

    #[error("listener.health_path and listener.ready_path must differ")]
    HealthPathsCollide,

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("downstream.circuit_breaker.failure_ratio must be in (0, 1), got {0}")]
    FailureRatio(f64),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_concurrent_requests == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_concurrent_requests" });
    }

    let listener = &config.listener;
    for (field, path) in [
        ("listener.health_path", &listener.health_path),
        ("listener.ready_path", &listener.ready_path),
    ] {
        if !is_health_path(path) {
            errors.push(ValidationError::HealthPath { field, path: path.clone() });
        }
    }
    if listener.health_path == listener.ready_path {
        errors.push(ValidationError::HealthPathsCollide);
    }

    let mut ids = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if let Err(source) = RouteDefinition::from_config(route) {
            errors.push(ValidationError::Route { index, source });
        }
        if !route.id.trim().is_empty() && !ids.insert(route.id.as_str()) {
            errors.push(ValidationError::DuplicateRouteId(route.id.clone()));
        }
    }

    let downstream = &config.downstream;
    if downstream.connect_timeout_ms == 0 {
        errors.push(ValidationError::Zero { field: "downstream.connect_timeout_ms" });
    }
    if downstream.request_timeout_ms == 0 {
        errors.push(ValidationError::Zero { field: "downstream.request_timeout_ms" });
    }

    let breaker = &downstream.circuit_breaker;
    if breaker.request_volume_threshold == 0 {
        errors.push(ValidationError::Zero {
            field: "downstream.circuit_breaker.request_volume_threshold",
        });
    }
    // The breaker trips on a ratio strictly above this value, so 1.0 would never trip.
    if !(breaker.failure_ratio > 0.0 && breaker.failure_ratio < 1.0) {
        errors.push(ValidationError::FailureRatio(breaker.failure_ratio));
    }
    if breaker.half_open_max_calls == 0 {
        errors.push(ValidationError::Zero {
            field: "downstream.circuit_breaker.half_open_max_calls",
        });
    }
    if breaker.success_threshold == 0 {
        errors.push(ValidationError::Zero {
            field: "downstream.circuit_breaker.success_threshold",
        });
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Health paths are literal axum routes: absolute, not the root, no captures.
fn is_health_path(path: &str) -> bool {
    path.len() > 1 && path.starts_with('/') && !path.contains(['{', '}', '*'])
}
