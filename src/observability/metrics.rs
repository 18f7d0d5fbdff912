//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_downstream_retries_total` (counter): retried downstream calls
//! - `gateway_circuit_breaker_state` (gauge): 0 closed, 1 open, 2 half-open
//! - `gateway_route_reloads_total` (counter): reloads by outcome
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram, Label};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("route", route.to_string()),
    ];
    counter!("gateway_requests_total", labels.clone()).increment(1);
    histogram!("gateway_request_duration_seconds", labels).record(start.elapsed().as_secs_f64());
}

pub fn record_retry() {
    counter!("gateway_downstream_retries_total").increment(1);
}

pub fn record_circuit_state(state: CircuitState) {
    gauge!("gateway_circuit_breaker_state").set(state.as_gauge());
}

pub fn record_route_reload(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("gateway_route_reloads_total", "outcome" => outcome).increment(1);
}
