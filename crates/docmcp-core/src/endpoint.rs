//! The canonical discovered-operation record and its dedup container.
//!
//! Every discovery path (spec parsers, HTML heuristics, fallbacks) produces
//! [`Endpoint`] values. Within one crawl they accumulate in an [`EndpointSet`],
//! which guarantees that a `(method, path)` pair appears at most once.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// HTTP method tokens recognized anywhere in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
    /// `TRACE`
    Trace,
}

impl HttpMethod {
    /// All method tokens, in the order used for iteration over path items.
    pub const ALL: [Self; 8] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Patch,
        Self::Head,
        Self::Options,
        Self::Trace,
    ];

    /// Uppercase token (`"GET"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
        }
    }

    /// Parse a method token, ignoring case. Returns `None` for anything else.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(token.trim()))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s).ok_or_else(|| crate::Error::Parse(format!("unknown HTTP method '{s}'")))
    }
}

/// Where a parameter is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    /// Templated path segment (`{id}`).
    Path,
    /// Query string.
    Query,
    /// Request header.
    Header,
    /// Request body field.
    Body,
}

impl ParamLocation {
    /// Map an OpenAPI `in` value. `formData` folds into `Body`; `cookie` has no slot.
    #[must_use]
    pub fn from_openapi(value: &str) -> Option<Self> {
        match value {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "body" | "formData" => Some(Self::Body),
            _ => None,
        }
    }
}

/// One input of an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Where the parameter travels.
    #[serde(rename = "in")]
    pub location: ParamLocation,
    /// JSON Schema primitive type name (`string`, `integer`, ...).
    #[serde(rename = "type")]
    pub param_type: String,
    /// Whether callers must supply it.
    #[serde(default)]
    pub required: bool,
    /// Default value, if documented.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    /// A required string path parameter, as produced for `{placeholder}` segments.
    #[must_use]
    pub fn path(name: &str) -> Self {
        Self {
            name: name.to_string(),
            location: ParamLocation::Path,
            param_type: "string".to_string(),
            required: true,
            default: None,
            description: None,
        }
    }

    /// An optional string query parameter.
    #[must_use]
    pub fn query(name: &str) -> Self {
        Self {
            name: name.to_string(),
            location: ParamLocation::Query,
            param_type: "string".to_string(),
            required: false,
            default: None,
            description: None,
        }
    }
}

/// A JSON Schema with an optional example payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySchema {
    /// JSON Schema document.
    pub schema: Value,
    /// Example payload, if one was documented or observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// One discovered `(method, path)` API operation with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Path starting with `/`; may contain `{param}` placeholders.
    pub path: String,
    /// Uppercase HTTP method.
    pub method: HttpMethod,
    /// Stable identifier; derived from method and path when undocumented.
    pub operation_id: String,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered parameters.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Request body schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<BodySchema>,
    /// Response schemas keyed by status code string.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub responses: BTreeMap<String, BodySchema>,
    /// Grouping tags.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

/// Status codes tried, in order, when picking the primary response body.
const SUCCESS_CODES: [&str; 4] = ["200", "201", "202", "204"];

impl Endpoint {
    /// A bare endpoint with only a derived operation id.
    #[must_use]
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            path: path.to_string(),
            method,
            operation_id: derive_operation_id(method, path),
            summary: None,
            description: None,
            parameters: Vec::new(),
            request_body: None,
            responses: BTreeMap::new(),
            tags: BTreeSet::new(),
        }
    }

    /// An endpoint filled with the templated fields used for heuristic discoveries:
    /// description from the last resource segment, a tag, and required path parameters.
    #[must_use]
    pub fn synthesize(method: HttpMethod, path: &str) -> Self {
        let mut endpoint = Self::new(method, path);
        endpoint.description = Some(derive_description(method, path));
        if let Some(tag) = derive_tag(path) {
            endpoint.tags.insert(tag);
        }
        endpoint.parameters = path_placeholders(path)
            .into_iter()
            .map(|name| Parameter::path(&name))
            .collect();
        endpoint
    }

    /// Identity key: `METHOD:path`, exact string match.
    #[must_use]
    pub fn key(&self) -> String {
        endpoint_key(self.method, &self.path)
    }

    /// The response body schema callers should expect on success.
    ///
    /// Tries 200, 201, 202, 204, then `default`; the first non-empty schema wins.
    #[must_use]
    pub fn primary_response(&self) -> Option<&BodySchema> {
        SUCCESS_CODES
            .iter()
            .copied()
            .chain(std::iter::once("default"))
            .filter_map(|code| self.responses.get(code))
            .find(|body| !is_empty_schema(&body.schema))
    }

    /// Fill absent optional fields from another discovery of the same operation.
    fn absorb(&mut self, other: Self) {
        if self.summary.is_none() {
            self.summary = other.summary;
        }
        if self.description.is_none() {
            self.description = other.description;
        }
        if self.parameters.is_empty() {
            self.parameters = other.parameters;
        }
        if self.request_body.is_none() {
            self.request_body = other.request_body;
        }
        for (code, body) in other.responses {
            self.responses.entry(code).or_insert(body);
        }
        if self.tags.is_empty() {
            self.tags = other.tags;
        }
    }
}

fn is_empty_schema(schema: &Value) -> bool {
    match schema {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Identity key for a method/path pair.
#[must_use]
pub fn endpoint_key(method: HttpMethod, path: &str) -> String {
    format!("{method}:{path}")
}

/// Insertion-ordered set of endpoints, unique by `(method, path)`.
///
/// A repeated key never adds a second record; its optional fields are merged
/// into the existing one instead.
#[derive(Debug, Default, Clone)]
pub struct EndpointSet {
    endpoints: Vec<Endpoint>,
    index: HashMap<String, usize>,
}

impl EndpointSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge. Returns `true` when the key was new.
    pub fn insert(&mut self, endpoint: Endpoint) -> bool {
        let key = endpoint.key();
        if let Some(&pos) = self.index.get(&key) {
            self.endpoints[pos].absorb(endpoint);
            false
        } else {
            self.index.insert(key, self.endpoints.len());
            self.endpoints.push(endpoint);
            true
        }
    }

    /// Insert many; returns how many keys were new.
    pub fn extend<I: IntoIterator<Item = Endpoint>>(&mut self, endpoints: I) -> usize {
        endpoints
            .into_iter()
            .map(|e| usize::from(self.insert(e)))
            .sum()
    }

    /// Number of unique endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether no endpoint has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Endpoints in discovery order.
    #[must_use]
    pub fn as_slice(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Consume into the ordered list.
    #[must_use]
    pub fn into_vec(self) -> Vec<Endpoint> {
        self.endpoints
    }
}

/// `{method_lower}_{segments}` with braces stripped and underscores collapsed.
///
/// ```rust
/// use docmcp_core::endpoint::{derive_operation_id, HttpMethod};
///
/// assert_eq!(derive_operation_id(HttpMethod::Get, "/users/{id}/posts"), "get_users_id_posts");
/// ```
#[must_use]
pub fn derive_operation_id(method: HttpMethod, path: &str) -> String {
    let raw = format!(
        "{}_{}",
        method.as_str().to_lowercase(),
        path.split('/').collect::<Vec<_>>().join("_")
    );
    let mut id = String::with_capacity(raw.len());
    for ch in raw.chars() {
        let ch = if ch.is_ascii_alphanumeric() { ch } else { '_' };
        if ch == '_' && id.ends_with('_') {
            continue;
        }
        id.push(ch);
    }
    id.trim_end_matches('_').to_string()
}

fn is_placeholder(segment: &str) -> bool {
    (segment.starts_with('{') && segment.ends_with('}')) || segment.starts_with(':')
}

/// Templated description from the last non-parameter segment.
#[must_use]
pub fn derive_description(method: HttpMethod, path: &str) -> String {
    let resource = path
        .split('/')
        .rev()
        .find(|s| !s.is_empty() && !is_placeholder(s))
        .unwrap_or("resource")
        .replace(['-', '_'], " ");
    match method {
        HttpMethod::Get => format!("Retrieve {resource}"),
        HttpMethod::Post => format!("Create new {resource}"),
        HttpMethod::Put => format!("Update {resource}"),
        HttpMethod::Patch => format!("Partially update {resource}"),
        HttpMethod::Delete => format!("Delete {resource}"),
        other => format!("{other} {resource}"),
    }
}

/// Second path segment (or the first), lowercased and alphanumeric-filtered.
#[must_use]
pub fn derive_tag(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let segment = segments.get(1).or_else(|| segments.first())?;
    let tag: String = segment
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase();
    (!tag.is_empty()).then_some(tag)
}

/// Names of `{placeholder}` segments, in path order.
#[must_use]
pub fn path_placeholders(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &rest[start + len + 1..];
    }
    names
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse(" Patch "), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::parse("parameters"), None);
        assert!("FETCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_operation_id_derivation() {
        assert_eq!(derive_operation_id(HttpMethod::Get, "/users"), "get_users");
        assert_eq!(
            derive_operation_id(HttpMethod::Delete, "/api/v1/users/{id}"),
            "delete_api_v1_users_id"
        );
        assert_eq!(
            derive_operation_id(HttpMethod::Post, "/user-profiles//{profile_id}/"),
            "post_user_profiles_profile_id"
        );
    }

    #[test]
    fn test_description_templates() {
        assert_eq!(derive_description(HttpMethod::Get, "/users/{id}"), "Retrieve users");
        assert_eq!(derive_description(HttpMethod::Post, "/api/items"), "Create new items");
        assert_eq!(
            derive_description(HttpMethod::Patch, "/order-lines"),
            "Partially update order lines"
        );
        assert_eq!(derive_description(HttpMethod::Get, "/"), "Retrieve resource");
    }

    #[test]
    fn test_tag_derivation() {
        assert_eq!(derive_tag("/api/users/{id}"), Some("users".to_string()));
        assert_eq!(derive_tag("/Users"), Some("users".to_string()));
        assert_eq!(derive_tag("/v1/user-groups"), Some("usergroups".to_string()));
        assert_eq!(derive_tag("/"), None);
    }

    #[test]
    fn test_synthesize_adds_required_path_params() {
        let endpoint = Endpoint::synthesize(HttpMethod::Get, "/orgs/{org}/repos/{repo}");
        let names: Vec<_> = endpoint.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["org", "repo"]);
        assert!(endpoint.parameters.iter().all(|p| p.required));
        assert!(
            endpoint
                .parameters
                .iter()
                .all(|p| p.location == ParamLocation::Path && p.param_type == "string")
        );
        assert_eq!(endpoint.operation_id, "get_orgs_org_repos_repo");
    }

    #[test]
    fn test_endpoint_set_dedups_and_merges() {
        let mut set = EndpointSet::new();
        assert!(set.insert(Endpoint::new(HttpMethod::Get, "/users")));

        let mut richer = Endpoint::new(HttpMethod::Get, "/users");
        richer.summary = Some("List users".to_string());
        assert!(!set.insert(richer));

        assert!(set.insert(Endpoint::new(HttpMethod::Post, "/users")));
        assert!(set.insert(Endpoint::new(HttpMethod::Get, "/users/")));

        assert_eq!(set.len(), 3);
        assert_eq!(set.as_slice()[0].summary.as_deref(), Some("List users"));
    }

    #[test]
    fn test_merge_never_overwrites_present_fields() {
        let mut set = EndpointSet::new();
        let mut first = Endpoint::new(HttpMethod::Get, "/a");
        first.description = Some("first".to_string());
        set.insert(first);

        let mut second = Endpoint::new(HttpMethod::Get, "/a");
        second.description = Some("second".to_string());
        set.insert(second);

        assert_eq!(set.as_slice()[0].description.as_deref(), Some("first"));
    }

    #[test]
    fn test_primary_response_order() {
        let mut endpoint = Endpoint::new(HttpMethod::Get, "/a");
        endpoint.responses.insert(
            "default".to_string(),
            BodySchema {
                schema: json!({"type": "object"}),
                example: None,
            },
        );
        endpoint.responses.insert(
            "200".to_string(),
            BodySchema {
                schema: json!({}),
                example: None,
            },
        );
        endpoint.responses.insert(
            "201".to_string(),
            BodySchema {
                schema: json!({"type": "array"}),
                example: None,
            },
        );
        assert_eq!(
            endpoint.primary_response().unwrap().schema,
            json!({"type": "array"})
        );
    }

    #[test]
    fn test_endpoint_serializes_camel_case() {
        let endpoint = Endpoint::new(HttpMethod::Get, "/users");
        let value = serde_json::to_value(&endpoint).unwrap();
        assert_eq!(value["method"], "GET");
        assert_eq!(value["operationId"], "get_users");
        assert!(value.get("requestBody").is_none());
    }

    proptest! {
        #[test]
        fn test_operation_id_has_no_double_underscores(path in "/[a-z{}/_-]{0,40}") {
            let id = derive_operation_id(HttpMethod::Get, &path);
            prop_assert!(!id.contains("__"));
            prop_assert!(id.starts_with("get"));
        }

        #[test]
        fn test_set_keys_are_unique(paths in proptest::collection::vec("/[a-c]{1,3}", 0..30)) {
            let mut set = EndpointSet::new();
            for p in &paths {
                set.insert(Endpoint::new(HttpMethod::Get, p));
            }
            let mut keys: Vec<String> = set.as_slice().iter().map(Endpoint::key).collect();
            let before = keys.len();
            keys.sort();
            keys.dedup();
            prop_assert_eq!(before, keys.len());
        }
    }
}
