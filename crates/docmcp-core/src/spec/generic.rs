//! Last-resort scan of arbitrary JSON for path-like strings.
//!
//! Any string value shaped like `/segment/{param}` becomes a synthetic `GET`
//! endpoint. False positives are likely, so this only runs when no
//! structured format was recognized. A bare `/` matches the pattern but is
//! skipped: it names no resource and shows up in most JSON config blobs.

use crate::endpoint::{Endpoint, EndpointSet, HttpMethod};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Absolute path made of word characters, dashes, slashes and braces.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static PATH_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[a-zA-Z0-9\-_/{}]*$").unwrap());

/// Walk `doc` and emit one `GET` endpoint per distinct path-like string.
#[must_use]
pub fn extract_endpoints_from_generic_json(doc: &Value) -> Vec<Endpoint> {
    let mut found = EndpointSet::new();
    walk(doc, &mut found);
    found.into_vec()
}

fn walk(value: &Value, found: &mut EndpointSet) {
    match value {
        Value::String(s) if s.len() > 1 && PATH_LIKE.is_match(s) => {
            found.insert(Endpoint::synthesize(HttpMethod::Get, s));
        },
        Value::Array(items) => items.iter().for_each(|item| walk(item, found)),
        Value::Object(map) => map.values().for_each(|item| walk(item, found)),
        _ => {},
    }
}
