//! Header policy applied on both legs of a proxied call.
//!
//! # Responsibilities
//! - Drop hop-by-hop and framing headers so the transport recomputes them
//! - Keep protocol pseudo-headers out of header maps
//! - Stamp the tenant header on outbound requests
//! - Force no-buffering headers on streamed responses

use axum::http::header::{CACHE_CONTROL, PRAGMA};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::tenancy::{TenantContext, TENANT_ID_HEADER};

const HOP_BY_HOP: [&str; 10] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

const CORS_PREFIX: &str = "access-control-";

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// True for headers that must never cross a proxy hop.
pub fn is_hop_by_hop(name: &str) -> bool {
    name.starts_with(':') || HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// True for `Access-Control-*` headers, which the gateway's CORS layer owns.
pub fn is_cors_header(name: &str) -> bool {
    name.get(..CORS_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(CORS_PREFIX))
}

/// Copy `headers` without hop-by-hop entries, keeping every value of the rest.
pub fn filter_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop(name.as_str()) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}

/// Overwrite any caller-supplied tenant header with the resolved tenant.
pub fn inject_tenant(headers: &mut HeaderMap, tenant: &TenantContext) {
    let Some(tenant_id) = tenant.tenant_id() else {
        return;
    };
    match HeaderValue::from_str(&tenant_id.to_string()) {
        Ok(value) => {
            headers.insert(TENANT_ID_HEADER, value);
        }
        Err(e) => tracing::error!(error = %e, "Tenant id is not a valid header value"),
    }
}

/// Headers that stop intermediaries from buffering a long-lived stream.
pub fn force_streaming_headers(headers: &mut HeaderMap) {
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(X_ACCEL_BUFFERING, HeaderValue::from_static("no"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenancy::TenantId;
    use uuid::Uuid;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn hop_by_hop_names_match_case_insensitively() {
        for name in ["Connection", "HOST", "Content-Length", "transfer-encoding", "TE", ":authority"] {
            assert!(is_hop_by_hop(name), "{name}");
        }
        assert!(!is_hop_by_hop("accept"));
        assert!(!is_hop_by_hop("x-request-id"));
    }

    #[test]
    fn filter_drops_framing_and_keeps_multi_values() {
        let input = headers(&[
            ("connection", "keep-alive"),
            ("host", "gateway.local"),
            ("content-length", "12"),
            ("transfer-encoding", "chunked"),
            ("accept", "text/html"),
            ("accept", "application/json"),
            ("x-custom", "1"),
        ]);

        let filtered = filter_headers(&input);

        assert!(filtered.get("connection").is_none());
        assert!(filtered.get("host").is_none());
        assert!(filtered.get("content-length").is_none());
        assert!(filtered.get("transfer-encoding").is_none());
        let accept: Vec<_> = filtered.get_all("accept").iter().collect();
        assert_eq!(accept, vec!["text/html", "application/json"]);
        assert_eq!(filtered.get("x-custom").unwrap(), "1");
    }

    #[test]
    fn cors_headers_detected_by_prefix() {
        assert!(is_cors_header("access-control-allow-origin"));
        assert!(is_cors_header("Access-Control-Expose-Headers"));
        assert!(!is_cors_header("access"));
        assert!(!is_cors_header("x-access-control"));
    }

    #[test]
    fn tenant_header_overwrites_caller_value() {
        let mut map = headers(&[("x-tenant-id", "spoofed"), ("x-tenant-id", "again")]);
        let id = TenantId::new(Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap());

        inject_tenant(&mut map, &TenantContext::new(Some(id)));

        let values: Vec<_> = map.get_all("x-tenant-id").iter().collect();
        assert_eq!(values, vec!["11111111-1111-1111-1111-111111111111"]);
    }

    #[test]
    fn anonymous_context_leaves_headers_untouched() {
        let mut map = headers(&[("x-tenant-id", "caller")]);
        inject_tenant(&mut map, &TenantContext::anonymous());
        assert_eq!(map.get("x-tenant-id").unwrap(), "caller");
    }

    #[test]
    fn streaming_headers_replace_downstream_values() {
        let mut map = headers(&[("cache-control", "max-age=60")]);
        force_streaming_headers(&mut map);
        assert_eq!(map.get("cache-control").unwrap(), "no-cache");
        assert_eq!(map.get("pragma").unwrap(), "no-cache");
        assert_eq!(map.get("x-accel-buffering").unwrap(), "no");
        assert_eq!(map.get_all("cache-control").iter().count(), 1);
    }
}
