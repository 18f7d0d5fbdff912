//! Tenant identification.
//!
//! # Data Flow
//! ```text
//! inbound request parts
//!     → TenantResolver::resolve (once per request, in the handler)
//!     → TenantContext (Option<TenantId>)
//!     → ProxyEngine stamps X-Tenant-Id on the outbound headers
//! ```
//!
//! A resolver may fail; the failure becomes a 403 response, never a 502.

pub mod claims;

use std::fmt;
use std::sync::Arc;

use axum::http::request::Parts;
use axum::http::HeaderName;
use thiserror::Error;
use uuid::Uuid;

use crate::config::TenancyConfig;

pub use claims::{ClaimsTenantResolver, Identity};

/// Header carrying the tenant id to downstream services.
pub const TENANT_ID_HEADER: HeaderName = HeaderName::from_static("x-tenant-id");

/// Identifier of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantId(Uuid);

impl TenantId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Failures at the identity boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TenantError {
    #[error("Tenant id is missing from the authenticated identity")]
    Missing,

    #[error("Tenant id is not a valid UUID")]
    Invalid,
}

/// Tenant of the request being proxied, computed once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: Option<TenantId>,
}

impl TenantContext {
    pub fn new(tenant_id: Option<TenantId>) -> Self {
        Self { tenant_id }
    }

    /// No tenant; nothing is injected.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }
}

/// Determines the tenant of an inbound request.
pub trait TenantResolver: Send + Sync {
    /// `Ok(None)` means the request has no tenant, which is not an error.
    fn current_tenant_id(&self, parts: &Parts) -> Result<Option<TenantId>, TenantError>;

    fn resolve(&self, parts: &Parts) -> Result<TenantContext, TenantError> {
        self.current_tenant_id(parts).map(TenantContext::new)
    }
}

/// Never yields a tenant.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTenancy;

impl TenantResolver for NoTenancy {
    fn current_tenant_id(&self, _parts: &Parts) -> Result<Option<TenantId>, TenantError> {
        Ok(None)
    }
}

/// Always yields the same tenant.
#[derive(Debug, Clone, Copy)]
pub struct FixedTenant(pub TenantId);

impl TenantResolver for FixedTenant {
    fn current_tenant_id(&self, _parts: &Parts) -> Result<Option<TenantId>, TenantError> {
        Ok(Some(self.0))
    }
}

/// Build the resolver selected by configuration.
pub fn resolver_from_config(config: &TenancyConfig) -> Arc<dyn TenantResolver> {
    match config {
        TenancyConfig::None => Arc::new(NoTenancy),
        TenancyConfig::Claims => Arc::new(ClaimsTenantResolver),
        TenancyConfig::Fixed { tenant_id } => Arc::new(FixedTenant(TenantId::new(*tenant_id))),
    }
}
