//! Tenant resolution from an authenticated identity's claims.

use axum::http::request::Parts;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::tenancy::{TenantError, TenantId, TenantResolver};

const TENANT_ID_CLAIM: &str = "tenant_id";
const ORGANIZATION_CLAIM: &str = "organization";
const ORGANIZATION_ID_FIELD: &str = "id";

/// Identity established by the authentication layer in front of the proxy
/// handler, stored as a request extension.
#[derive(Debug, Clone, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated {
        /// Token claims.
        claims: Map<String, Value>,
        /// Extra attributes attached by the authentication layer.
        attributes: Map<String, Value>,
    },
}

impl Identity {
    pub fn with_claims(claims: Map<String, Value>) -> Self {
        Identity::Authenticated {
            claims,
            attributes: Map::new(),
        }
    }
}

/// Reads the tenant from the `Identity` request extension.
///
/// Lookup order: the `tenant_id` claim, the `tenant_id` attribute, then the
/// first non-blank `id` found depth-first inside the `organization` claim.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClaimsTenantResolver;

impl TenantResolver for ClaimsTenantResolver {
    fn current_tenant_id(&self, parts: &Parts) -> Result<Option<TenantId>, TenantError> {
        let Some(Identity::Authenticated { claims, attributes }) = parts.extensions.get::<Identity>()
        else {
            return Ok(None);
        };

        let raw = non_blank(claims.get(TENANT_ID_CLAIM))
            .or_else(|| non_blank(attributes.get(TENANT_ID_CLAIM)))
            .or_else(|| claims.get(ORGANIZATION_CLAIM).and_then(organization_id))
            .ok_or(TenantError::Missing)?;

        Uuid::parse_str(&normalize(&raw))
            .map(|id| Some(TenantId::new(id)))
            .map_err(|_| TenantError::Invalid)
    }
}

fn claim_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(value) => Some(claim_text(value)).filter(|s| !s.trim().is_empty()),
    }
}

fn organization_id(claim: &Value) -> Option<String> {
    match claim {
        Value::Object(fields) => non_blank(fields.get(ORGANIZATION_ID_FIELD))
            .or_else(|| fields.values().find_map(organization_id)),
        Value::Array(items) => items.iter().find_map(organization_id),
        _ => None,
    }
}

/// Strip the quoting layers identity providers sometimes wrap ids in.
fn normalize(raw: &str) -> String {
    let mut s = raw.trim().to_string();
    for _ in 0..4 {
        s = s.trim().to_string();
        if s.len() >= 4 && s.starts_with("\\\"") && s.ends_with("\\\"") {
            s = s[2..s.len() - 2].to_string();
        } else if s.len() >= 2
            && ((s.starts_with('"') && s.ends_with('"'))
                || (s.starts_with('\'') && s.ends_with('\'')))
        {
            s = s[1..s.len() - 1].to_string();
        } else if s.contains("\\\"") {
            s = s.replace("\\\"", "\"");
        } else {
            break;
        }
    }
    s
}
