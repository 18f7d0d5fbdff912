//! Path prefix matching and rewriting.
//!
//! # Responsibilities
//! - Pick the longest configured prefix that matches a path
//! - Rewrite the path for the downstream call when the prefix is stripped
//!
//! # Design Decisions
//! - Prefixes are literal (`starts_with`), case-sensitive, no patterns
//! - Longest prefix wins; equal lengths keep the first configured prefix
//! - A rewritten path is never empty and always absolute

/// Return the longest prefix in `prefixes` that `path` starts with.
///
/// On equal lengths the earlier prefix is kept.
pub fn best_matching_prefix<'a>(prefixes: &'a [String], path: &str) -> Option<&'a str> {
    let mut best: Option<&'a str> = None;
    for prefix in prefixes {
        if !path.starts_with(prefix.as_str()) {
            continue;
        }
        if best.map_or(true, |current| prefix.len() > current.len()) {
            best = Some(prefix.as_str());
        }
    }
    best
}

/// Compute the downstream path for `path` matched by `matched_prefix`.
pub fn rewrite_path(path: &str, matched_prefix: &str, strip_prefix: bool) -> String {
    if !strip_prefix || matched_prefix.trim().is_empty() {
        return path.to_string();
    }

    let cut = matched_prefix.len().min(path.len());
    let remainder = path.get(cut..).unwrap_or_default();
    if remainder.is_empty() {
        "/".to_string()
    } else if remainder.starts_with('/') {
        remainder.to_string()
    } else {
        format!("/{remainder}")
    }
}
