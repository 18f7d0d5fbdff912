//! Request-level error taxonomy and its HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::downstream::DownstreamError;
use crate::tenancy::TenantError;

/// Terminal failure of a proxied request.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("No route matches path {path}")]
    RouteNotFound { path: String },

    #[error("Downstream service unavailable: {source}")]
    DownstreamUnavailable {
        #[source]
        source: DownstreamError,
    },

    #[error(transparent)]
    Tenant(#[from] TenantError),

    #[error("Bad request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Body of every synthesized failure response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub tag: String,
    pub message: String,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::DownstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Tenant(_) => StatusCode::FORBIDDEN,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable tag.
    pub fn tag(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound { .. } => "GATEWAY.ROUTE_NOT_FOUND",
            GatewayError::DownstreamUnavailable { .. } => "GATEWAY.DOWNSTREAM_ERROR",
            GatewayError::Tenant(TenantError::Missing) => "TENANCY.ERRORS.TENANT_ID_MISSING",
            GatewayError::Tenant(TenantError::Invalid) => "TENANCY.ERRORS.TENANT_ID_INVALID",
            GatewayError::InvalidRequest(_) => "GATEWAY.BAD_REQUEST",
            GatewayError::Internal(_) => "GATEWAY.UNEXPECTED_ERROR",
        }
    }

    pub fn body(&self) -> ErrorBody {
        let message = match self {
            GatewayError::Internal(_) => "Unexpected error".to_string(),
            other => other.to_string(),
        };
        ErrorBody {
            tag: self.tag().to_string(),
            message,
        }
    }
}

impl From<DownstreamError> for GatewayError {
    fn from(source: DownstreamError) -> Self {
        GatewayError::DownstreamUnavailable { source }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            GatewayError::Internal(detail) => {
                tracing::error!(error = %detail, "Unexpected error while proxying");
            }
            GatewayError::DownstreamUnavailable { .. } => {
                tracing::warn!(error = %self, "Downstream unavailable");
            }
            _ => tracing::debug!(error = %self, status = %status, "Request rejected"),
        }
        (status, Json(self.body())).into_response()
    }
}
