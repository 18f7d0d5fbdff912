//! Liveness and readiness endpoints.
//!
//! # Design Decisions
//! - Served by the gateway itself, never forwarded downstream
//! - Registered ahead of the catch-all proxy route and outside its
//!   concurrency limit, so health checks answer while the proxy is saturated
//! - Readiness means "there is at least one route to forward to"

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::config::ListenerConfig;
use crate::routing::{RouteSource, SharedRouteTable};

#[derive(Clone)]
struct HealthState {
    routes: Arc<SharedRouteTable>,
}

/// Router answering the configured liveness and readiness paths.
pub fn router(config: &ListenerConfig, routes: Arc<SharedRouteTable>) -> Router {
    Router::new()
        .route(&config.health_path, get(liveness))
        .route(&config.ready_path, get(readiness))
        .with_state(HealthState { routes })
}

async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "UP" })))
}

async fn readiness(State(state): State<HealthState>) -> impl IntoResponse {
    let routes = state.routes.current_routes().len();
    let status = if routes > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let label = if status.is_success() { "UP" } else { "DOWN" };
    (status, Json(json!({ "status": label, "routes": routes })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{RouteDefinition, RouteTable, TargetDefinition};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn table(count: usize) -> RouteTable {
        let routes = (0..count)
            .map(|i| {
                RouteDefinition::new(
                    format!("r{i}"),
                    vec![format!("/r{i}")],
                    false,
                    TargetDefinition::new("http://localhost:9000").unwrap(),
                )
                .unwrap()
            })
            .collect();
        RouteTable::new(routes).unwrap()
    }

    async fn get_json(router: Router, path: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn liveness_is_always_up() {
        let routes = Arc::new(SharedRouteTable::new(RouteTable::default()));
        let (status, body) = get_json(router(&ListenerConfig::default(), routes), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "UP");
    }

    #[tokio::test]
    async fn readiness_follows_route_table() {
        let routes = Arc::new(SharedRouteTable::new(RouteTable::default()));
        let app = router(&ListenerConfig::default(), routes.clone());

        let (status, body) = get_json(app.clone(), "/readyz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "DOWN");

        routes.replace(table(2));
        let (status, body) = get_json(app, "/readyz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["routes"], 2);
    }

    #[tokio::test]
    async fn paths_are_configurable() {
        let config = ListenerConfig {
            health_path: "/q/health/live".into(),
            ready_path: "/q/health/ready".into(),
            ..ListenerConfig::default()
        };
        let routes = Arc::new(SharedRouteTable::new(table(1)));
        let (status, _) = get_json(router(&config, routes), "/q/health/live").await;
        assert_eq!(status, StatusCode::OK);
    }
}
