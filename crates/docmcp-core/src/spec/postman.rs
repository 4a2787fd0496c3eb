//! Postman Collection (v2.x) parsing.

use super::{ParsedSpec, SpecKind};
use crate::endpoint::{BodySchema, Endpoint, EndpointSet, HttpMethod, Parameter};
use crate::extract::schema::infer_from_literal;
use crate::types::AuthType;
use crate::{Error, Result};
use serde_json::Value;
use url::Url;

/// A collection has a top-level `item` array.
#[must_use]
pub fn is_collection(doc: &Value) -> bool {
    doc.get("item").is_some_and(Value::is_array)
}

/// Parse a decoded collection.
///
/// Folders are walked depth-first; every leaf with a `request` yields one
/// endpoint tagged with its enclosing folder's name.
pub fn parse_value(doc: &Value) -> Result<ParsedSpec> {
    parse_postman_collection(doc)
}

/// Extract endpoints from a Postman collection document.
pub fn parse_postman_collection(doc: &Value) -> Result<ParsedSpec> {
    let Some(items) = doc.get("item").and_then(Value::as_array) else {
        return Err(Error::Parse("not a Postman collection".into()));
    };

    let mut walker = Walker::default();
    walker.walk(items, None);

    let info = doc.get("info");
    Ok(ParsedSpec {
        kind: SpecKind::Postman,
        endpoints: walker.endpoints.into_vec(),
        base_url: collection_base_url(doc).or(walker.first_origin),
        auth_type: doc
            .get("auth")
            .and_then(|a| a.get("type"))
            .and_then(Value::as_str)
            .and_then(auth_from_type),
        title: info
            .and_then(|i| i.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        description: info.and_then(|i| i.get("description")).and_then(text_of),
    })
}

#[derive(Default)]
struct Walker {
    endpoints: EndpointSet,
    first_origin: Option<String>,
}

impl Walker {
    fn walk(&mut self, items: &[Value], folder: Option<&str>) {
        for item in items {
            let name = item.get("name").and_then(Value::as_str);
            if let Some(children) = item.get("item").and_then(Value::as_array) {
                self.walk(children, name.or(folder));
                continue;
            }
            if let Some(request) = item.get("request") {
                if let Some(endpoint) = self.leaf(request, name, folder) {
                    self.endpoints.insert(endpoint);
                }
            }
        }
    }

    fn leaf(&mut self, request: &Value, name: Option<&str>, folder: Option<&str>) -> Option<Endpoint> {
        let (method, url) = match request {
            Value::String(url) => (HttpMethod::Get, Some(request_url_from_str(url))),
            _ => (
                request
                    .get("method")
                    .and_then(Value::as_str)
                    .and_then(HttpMethod::parse)
                    .unwrap_or(HttpMethod::Get),
                request.get("url").map(request_url),
            ),
        };
        let url = url?;
        if self.first_origin.is_none() {
            self.first_origin.clone_from(&url.origin);
        }

        let mut endpoint = Endpoint::synthesize(method, &url.path);
        if let Some(name) = name {
            endpoint.summary = Some(name.to_string());
        }
        endpoint.description = request
            .get("description")
            .and_then(text_of)
            .or_else(|| name.map(str::to_string))
            .or(endpoint.description);
        if let Some(folder) = folder {
            endpoint.tags.clear();
            endpoint.tags.insert(folder.to_string());
        }
        endpoint
            .parameters
            .extend(url.query.iter().map(|key| Parameter::query(key)));

        let raw_body = request
            .get("body")
            .filter(|b| b.get("mode").and_then(Value::as_str) == Some("raw"))
            .and_then(|b| b.get("raw"))
            .and_then(Value::as_str);
        if let Some((schema, example)) = raw_body.and_then(infer_from_literal) {
            endpoint.request_body = Some(BodySchema {
                schema,
                example: Some(example),
            });
        }
        Some(endpoint)
    }
}

struct RequestUrl {
    path: String,
    query: Vec<String>,
    origin: Option<String>,
}

fn request_url(url: &Value) -> RequestUrl {
    match url {
        Value::String(raw) => request_url_from_str(raw),
        Value::Object(_) => {
            let path = match url.get("path") {
                Some(Value::Array(segments)) => {
                    let joined: Vec<&str> = segments.iter().filter_map(Value::as_str).collect();
                    format!("/{}", joined.join("/"))
                },
                Some(Value::String(path)) => path.clone(),
                _ => url
                    .get("raw")
                    .and_then(Value::as_str)
                    .map(|raw| request_url_from_str(raw).path)
                    .unwrap_or_default(),
            };
            let query = url
                .get("query")
                .and_then(Value::as_array)
                .map(|params| {
                    params
                        .iter()
                        .filter(|p| !p.get("disabled").and_then(Value::as_bool).unwrap_or(false))
                        .filter_map(|p| p.get("key").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            let origin = url
                .get("raw")
                .and_then(Value::as_str)
                .and_then(|raw| request_url_from_str(raw).origin);
            RequestUrl {
                path: normalize_path(&path),
                query,
                origin,
            }
        },
        _ => RequestUrl {
            path: "/".to_string(),
            query: Vec::new(),
            origin: None,
        },
    }
}

fn request_url_from_str(raw: &str) -> RequestUrl {
    let raw = raw.trim();
    if let Ok(parsed) = Url::parse(raw) {
        if parsed.has_host() {
            return RequestUrl {
                path: normalize_path(parsed.path()),
                query: parsed.query_pairs().map(|(k, _)| k.into_owned()).collect(),
                origin: Some(parsed.origin().ascii_serialization()),
            };
        }
    }
    // `{{baseUrl}}/users/:id?x=1` style: drop the variable host.
    let without_host = strip_variable_host(raw);
    let (path, query) = without_host
        .split_once('?')
        .unwrap_or((without_host, ""));
    RequestUrl {
        path: normalize_path(path),
        query: query
            .split('&')
            .filter_map(|pair| pair.split('=').next())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        origin: None,
    }
}

fn strip_variable_host(raw: &str) -> &str {
    if raw.starts_with("{{") {
        if let Some(end) = raw.find("}}") {
            return &raw[end + 2..];
        }
    }
    raw
}

/// Rewrite Postman path variables (`:id`, `{{id}}`) as `{id}`.
fn normalize_path(path: &str) -> String {
    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if let Some(name) = segment
                .strip_prefix("{{")
                .and_then(|s| s.strip_suffix("}}"))
            {
                format!("{{{name}}}")
            } else {
                segment.to_string()
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}

fn collection_base_url(doc: &Value) -> Option<String> {
    doc.get("variable")?
        .as_array()?
        .iter()
        .filter(|v| {
            v.get("key")
                .and_then(Value::as_str)
                .is_some_and(|k| k.to_ascii_lowercase().contains("url"))
        })
        .filter_map(|v| v.get("value").and_then(Value::as_str))
        .find(|value| value.starts_with("http://") || value.starts_with("https://"))
        .map(|value| value.trim_end_matches('/').to_string())
}

fn auth_from_type(kind: &str) -> Option<AuthType> {
    match kind {
        "bearer" | "jwt" => Some(AuthType::Bearer),
        "apikey" | "basic" => Some(AuthType::ApiKey),
        "oauth1" | "oauth2" => Some(AuthType::OAuth),
        _ => None,
    }
}

/// Descriptions are either plain strings or `{content: ...}` objects.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(_) => value
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
