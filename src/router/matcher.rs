//! Path matching against a route table.
//!
//! Both the request path and every pattern are split on `/`. A trailing empty
//! segment is dropped when there is more than one segment, so `/a/` matches
//! `/a` while `/` keeps its single empty segment. A pattern only matches paths
//! with the same number of segments; each pair of segments matches when
//!
//! - both are empty,
//! - the pattern segment is a parameter (`:name`), which binds the request
//!   segment to `name`, or
//! - they are literally equal.
//!
//! Paths are compared after percent-decoding, so parameters bind decoded text.
//! Each candidate binds into its own map and only the winner's bindings reach
//! the context: a candidate rejected part-way never leaks parameters.

use std::collections::HashMap;

use crate::router::RouteTable;

/// Prefix marking a named parameter segment.
pub const PARAM_SIGIL: char = ':';

/// Split a path into segments, dropping a trailing empty segment.
pub fn segments(path: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = path.split('/').collect();
    if parts.len() > 1 && parts.last() == Some(&"") {
        parts.pop();
    }
    parts
}

/// Match a single pattern against a path.
///
/// # Returns
///
/// The bound parameters on a match. A parameter name used twice keeps the
/// value of its last segment.
pub fn match_pattern(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern = segments(pattern);
    let path = segments(path);
    if pattern.len() != path.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (expected, actual) in pattern.iter().zip(path.iter()) {
        if actual.is_empty() && expected.is_empty() {
            continue;
        }
        if let Some(name) = expected.strip_prefix(PARAM_SIGIL) {
            params.insert(name.to_string(), actual.to_string());
            continue;
        }
        if expected != actual {
            return None;
        }
    }
    Some(params)
}

/// Find the first pattern in `table` that matches `path`.
///
/// `params` is always reset, then filled with the winning pattern's bindings.
/// Bindings from candidates that fail part-way are discarded.
///
/// # Returns
///
/// The matching pattern, or `None` when nothing matches.
pub fn match_route<'t>(table: &'t RouteTable, path: &str, params: &mut HashMap<String, String>) -> Option<&'t str> {
    params.clear();
    for pattern in table.patterns() {
        if let Some(bound) = match_pattern(pattern, path) {
            *params = bound;
            return Some(pattern);
        }
    }
    None
}
