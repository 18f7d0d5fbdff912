//! Route and target definitions.
//!
//! Definitions are validated on construction and immutable afterwards;
//! a configuration reload builds a whole new set.

use thiserror::Error;
use url::Url;

use crate::config::{RouteConfig, TargetConfig};
use crate::routing::matcher;

/// Error raised when a route or target cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route id must not be blank")]
    BlankId,

    #[error("route `{route}` must declare at least one path prefix")]
    EmptyPrefixes { route: String },

    #[error("route `{route}` contains a blank path prefix")]
    BlankPrefix { route: String },

    #[error("route `{route}` target must define either base_url or service_name")]
    MissingTarget { route: String },

    #[error("target base URL must not be blank")]
    BlankBaseUrl,

    #[error("target base URL `{url}` is invalid: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("route id `{route}` is declared more than once")]
    DuplicateId { route: String },
}

/// Downstream target of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDefinition {
    base_url: String,
}

impl TargetDefinition {
    /// Create a target from an absolute base URL.
    ///
    /// Surrounding whitespace and every trailing `/` are removed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, RouteError> {
        let normalized = base_url.as_ref().trim().trim_end_matches('/');
        if normalized.is_empty() {
            return Err(RouteError::BlankBaseUrl);
        }

        let parsed = Url::parse(normalized).map_err(|e| RouteError::InvalidBaseUrl {
            url: normalized.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(RouteError::InvalidBaseUrl {
                url: normalized.to_string(),
                reason: "expected an absolute http(s) URL".to_string(),
            });
        }

        Ok(Self {
            base_url: normalized.to_string(),
        })
    }

    /// Resolve a target from configuration: `base_url` first, then
    /// `scheme://service_name[:port]`.
    pub fn from_config(route_id: &str, config: &TargetConfig) -> Result<Self, RouteError> {
        if let Some(base_url) = config.base_url.as_deref() {
            return Self::new(base_url);
        }

        match config.service_name.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() => {
                let port = config.port.map(|p| format!(":{p}")).unwrap_or_default();
                Self::new(format!("{}://{}{}", config.scheme.trim(), host, port))
            }
            _ => Err(RouteError::MissingTarget {
                route: route_id.to_string(),
            }),
        }
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// A route: a set of literal path prefixes mapped to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    id: String,
    path_prefixes: Vec<String>,
    strip_prefix: bool,
    target: TargetDefinition,
}

impl RouteDefinition {
    /// Create a validated route definition.
    pub fn new(
        id: impl Into<String>,
        path_prefixes: Vec<String>,
        strip_prefix: bool,
        target: TargetDefinition,
    ) -> Result<Self, RouteError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RouteError::BlankId);
        }
        if path_prefixes.is_empty() {
            return Err(RouteError::EmptyPrefixes { route: id });
        }
        if path_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(RouteError::BlankPrefix { route: id });
        }

        Ok(Self {
            id,
            path_prefixes,
            strip_prefix,
            target,
        })
    }

    /// Build a route from its configuration entry.
    pub fn from_config(config: &RouteConfig) -> Result<Self, RouteError> {
        if config.id.trim().is_empty() {
            return Err(RouteError::BlankId);
        }
        let target = TargetDefinition::from_config(&config.id, &config.target)?;
        Self::new(
            config.id.clone(),
            config.path_prefixes.clone(),
            config.strip_prefix,
            target,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path_prefixes(&self) -> &[String] {
        &self.path_prefixes
    }

    pub fn strip_prefix(&self) -> bool {
        self.strip_prefix
    }

    pub fn target(&self) -> &TargetDefinition {
        &self.target
    }

    /// Longest configured prefix of this route matching `path`.
    pub fn best_matching_prefix(&self, path: &str) -> Option<&str> {
        matcher::best_matching_prefix(&self.path_prefixes, path)
    }

    /// Downstream path for `path`, given the prefix it matched.
    pub fn rewrite_path(&self, path: &str, matched_prefix: &str) -> String {
        matcher::rewrite_path(path, matched_prefix, self.strip_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetDefinition {
        TargetDefinition::new("http://localhost:8080").unwrap()
    }

    #[test]
    fn test_construction_rejects_invalid_fields() {
        assert_eq!(
            RouteDefinition::new("r1", vec![], false, target()),
            Err(RouteError::EmptyPrefixes { route: "r1".into() })
        );
        assert_eq!(
            RouteDefinition::new("  ", vec!["/api".into()], false, target()),
            Err(RouteError::BlankId)
        );
        assert_eq!(
            RouteDefinition::new("r1", vec!["/api".into(), " ".into()], false, target()),
            Err(RouteError::BlankPrefix { route: "r1".into() })
        );
    }

    #[test]
    fn test_missing_target_fails_construction() {
        let config = RouteConfig {
            id: "r1".into(),
            path_prefixes: vec!["/api".into()],
            strip_prefix: false,
            target: TargetConfig::default(),
        };
        assert_eq!(
            RouteDefinition::from_config(&config),
            Err(RouteError::MissingTarget { route: "r1".into() })
        );
    }

    #[test]
    fn test_base_url_normalized() {
        let t = TargetDefinition::new("  http://users:8080/// ").unwrap();
        assert_eq!(t.base_url(), "http://users:8080");
    }

    #[test]
    fn test_base_url_rejected() {
        assert_eq!(TargetDefinition::new("   "), Err(RouteError::BlankBaseUrl));
        assert!(matches!(
            TargetDefinition::new("users:8080"),
            Err(RouteError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            TargetDefinition::new("ftp://files"),
            Err(RouteError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_target_from_service_name() {
        let config = TargetConfig {
            service_name: Some("users".into()),
            port: Some(9000),
            ..TargetConfig::default()
        };
        let t = TargetDefinition::from_config("r1", &config).unwrap();
        assert_eq!(t.base_url(), "http://users:9000");

        let config = TargetConfig {
            service_name: Some("billing".into()),
            scheme: "https".into(),
            ..TargetConfig::default()
        };
        let t = TargetDefinition::from_config("r1", &config).unwrap();
        assert_eq!(t.base_url(), "https://billing");
    }

    #[test]
    fn test_base_url_preferred_over_service_name() {
        let config = TargetConfig {
            base_url: Some("http://explicit/".into()),
            service_name: Some("ignored".into()),
            ..TargetConfig::default()
        };
        let t = TargetDefinition::from_config("r1", &config).unwrap();
        assert_eq!(t.base_url(), "http://explicit");
    }
}
