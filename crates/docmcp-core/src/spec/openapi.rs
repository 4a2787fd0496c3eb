//! OpenAPI 3.x and Swagger 2.0 parsing.
//!
//! Path items are walked in document-key order and every key that is an HTTP
//! method token becomes one [`Endpoint`]. Shared path-item keys (`parameters`,
//! `summary`, `servers`, ...) are skipped by the same membership test.
//!
//! Local `$ref`s (`#/components/...`, `#/definitions/...`, any JSON pointer)
//! are inlined up to [`MAX_REF_DEPTH`] hops. A reference that recurs on its
//! own expansion chain, one past the [`MAX_INLINED_REFS`] cap, and external
//! references are left in place.

use super::{ParsedSpec, SpecKind, load_document};
use crate::endpoint::{BodySchema, Endpoint, HttpMethod, ParamLocation, Parameter};
use crate::types::AuthType;
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// `$ref` hops followed before a reference is left unresolved.
pub const MAX_REF_DEPTH: usize = 5;

/// References inlined into a single schema before the rest are left in place.
pub const MAX_INLINED_REFS: usize = 64;

/// Whether the document looks like an OpenAPI or Swagger spec: a `paths`
/// map plus a `swagger`, `openapi` or `info` field.
#[must_use]
pub fn is_spec(doc: &Value) -> bool {
    doc.get("paths").is_some_and(Value::is_object)
        && ["swagger", "openapi", "info"]
            .iter()
            .any(|key| doc.get(key).is_some())
}

/// Parse spec text (JSON, YAML, or lenient YAML).
///
/// ```rust
/// use docmcp_core::spec::openapi::parse_openapi_or_swagger;
///
/// let spec = parse_openapi_or_swagger(r#"{"openapi":"3.0.0","paths":{"/users":{"get":{"operationId":"listUsers"}}}}"#)?;
/// assert_eq!(spec.endpoints[0].operation_id, "listUsers");
/// # Ok::<(), docmcp_core::Error>(())
/// ```
pub fn parse_openapi_or_swagger(text: &str) -> Result<ParsedSpec> {
    parse_value(&load_document(text)?)
}

/// Parse an already-decoded spec document.
pub fn parse_value(doc: &Value) -> Result<ParsedSpec> {
    if !is_spec(doc) {
        return Err(Error::Parse("not an OpenAPI or Swagger document".into()));
    }
    let swagger2 = doc.get("swagger").is_some();
    let refs = Refs { root: doc };

    let base_path = if swagger2 {
        str_field(doc, "basePath")
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string()
    } else {
        String::new()
    };

    let mut endpoints = Vec::new();
    if let Some(paths) = doc.get("paths").and_then(Value::as_object) {
        for (path, item) in paths {
            let item = refs.shallow(item);
            let Some(item) = item.as_object() else {
                continue;
            };
            let shared: &[Value] = item
                .get("parameters")
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice);
            let full_path = format!("{base_path}{path}");
            for (key, operation) in item {
                let Some(method) = HttpMethod::parse(key) else {
                    continue;
                };
                endpoints.push(parse_operation(
                    &refs,
                    method,
                    &full_path,
                    shared,
                    refs.shallow(operation),
                ));
            }
        }
    }

    let info = doc.get("info");
    Ok(ParsedSpec {
        kind: if swagger2 {
            SpecKind::Swagger2
        } else {
            SpecKind::OpenApi3
        },
        endpoints,
        base_url: if swagger2 {
            swagger2_base_url(doc)
        } else {
            openapi3_base_url(doc)
        },
        auth_type: detect_auth(doc),
        title: info.and_then(|i| str_field(i, "title")).map(str::to_string),
        description: info
            .and_then(|i| str_field(i, "description"))
            .map(str::to_string),
    })
}

fn parse_operation(
    refs: &Refs<'_>,
    method: HttpMethod,
    path: &str,
    shared: &[Value],
    operation: &Value,
) -> Endpoint {
    let mut endpoint = Endpoint::new(method, path);
    if let Some(id) = str_field(operation, "operationId").filter(|s| !s.trim().is_empty()) {
        endpoint.operation_id = id.to_string();
    }
    endpoint.summary = str_field(operation, "summary").map(str::to_string);
    endpoint.description = str_field(operation, "description").map(str::to_string);
    endpoint.tags = operation
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let own: &[Value] = operation
        .get("parameters")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice);
    for raw in shared.iter().chain(own) {
        match convert_parameter(refs, refs.shallow(raw)) {
            Converted::Param(param) => endpoint.parameters.push(param),
            Converted::Body(body) => endpoint.request_body = Some(body),
            Converted::Skipped => {},
        }
    }

    if let Some(body) = operation
        .get("requestBody")
        .map(|rb| refs.shallow(rb))
        .and_then(|rb| media_schema(refs, rb.get("content")))
    {
        endpoint.request_body = Some(body);
    }

    endpoint.responses = parse_responses(refs, operation.get("responses"));
    endpoint
}

enum Converted {
    Param(Parameter),
    Body(BodySchema),
    Skipped,
}

fn convert_parameter(refs: &Refs<'_>, raw: &Value) -> Converted {
    let Some(name) = str_field(raw, "name") else {
        return Converted::Skipped;
    };
    let location = str_field(raw, "in").unwrap_or_default();
    let schema = raw.get("schema").map(|s| refs.inline(s));

    if location == "body" {
        return schema.map_or(Converted::Skipped, |schema| {
            let example = schema.get("example").cloned();
            Converted::Body(BodySchema { schema, example })
        });
    }
    let Some(location) = ParamLocation::from_openapi(location) else {
        return Converted::Skipped;
    };

    let typed = schema.as_ref().unwrap_or(raw);
    let param_type = str_field(typed, "type")
        .map(str::to_string)
        .or_else(|| typed.get("properties").map(|_| "object".to_string()))
        .unwrap_or_else(|| "string".to_string());
    let default = typed.get("default").or_else(|| raw.get("default")).cloned();

    Converted::Param(Parameter {
        name: name.to_string(),
        location,
        param_type,
        required: location == ParamLocation::Path
            || raw.get("required").and_then(Value::as_bool).unwrap_or(false),
        default,
        description: str_field(raw, "description").map(str::to_string),
    })
}

/// JSON media entry of a v3 `content` map: `application/json` first, then
/// any other JSON-flavoured type.
fn media_schema(refs: &Refs<'_>, content: Option<&Value>) -> Option<BodySchema> {
    let content = content?.as_object()?;
    let media = content.get("application/json").or_else(|| {
        content
            .iter()
            .find(|(ty, _)| ty.contains("json"))
            .map(|(_, media)| media)
    })?;
    let schema = refs.inline(media.get("schema")?);
    let example = media
        .get("example")
        .cloned()
        .or_else(|| schema.get("example").cloned());
    Some(BodySchema { schema, example })
}

fn parse_responses(refs: &Refs<'_>, responses: Option<&Value>) -> BTreeMap<String, BodySchema> {
    let mut out = BTreeMap::new();
    let Some(responses) = responses.and_then(Value::as_object) else {
        return out;
    };
    for (status, response) in responses {
        let response = refs.shallow(response);
        let body = media_schema(refs, response.get("content")).or_else(|| {
            // Swagger 2 puts the schema directly on the response.
            response.get("schema").map(|schema| BodySchema {
                schema: refs.inline(schema),
                example: response
                    .get("examples")
                    .and_then(|e| e.get("application/json"))
                    .cloned(),
            })
        });
        if let Some(body) = body {
            out.insert(status.clone(), body);
        }
    }
    out
}

fn openapi3_base_url(doc: &Value) -> Option<String> {
    let server = doc.get("servers")?.as_array()?.first()?;
    let mut url = str_field(server, "url")?.to_string();
    // Substitute `{var}` server variables with their defaults.
    if let Some(vars) = server.get("variables").and_then(Value::as_object) {
        for (name, var) in vars {
            if let Some(default) = var.get("default").and_then(Value::as_str) {
                url = url.replace(&format!("{{{name}}}"), default);
            }
        }
    }
    Some(url.trim_end_matches('/').to_string())
}

fn swagger2_base_url(doc: &Value) -> Option<String> {
    let host = str_field(doc, "host")?;
    let scheme = doc
        .get("schemes")
        .and_then(Value::as_array)
        .and_then(|schemes| {
            let names: Vec<&str> = schemes.iter().filter_map(Value::as_str).collect();
            names
                .iter()
                .find(|s| **s == "https")
                .or_else(|| names.first())
                .map(|s| (*s).to_string())
        })
        .unwrap_or_else(|| "https".to_string());
    Some(format!("{scheme}://{}", host.trim_end_matches('/')))
}

/// Auth style declared by the spec's security schemes.
///
/// The first scheme named by the top-level `security` requirement wins;
/// otherwise the first declared scheme.
#[must_use]
pub fn detect_auth(doc: &Value) -> Option<AuthType> {
    let schemes = doc
        .get("components")
        .and_then(|c| c.get("securitySchemes"))
        .or_else(|| doc.get("securityDefinitions"))?
        .as_object()?;

    let required = doc
        .get("security")
        .and_then(Value::as_array)
        .and_then(|reqs| reqs.iter().find_map(Value::as_object))
        .and_then(|req| req.keys().find_map(|name| schemes.get(name)));

    required
        .and_then(scheme_auth)
        .or_else(|| schemes.values().find_map(scheme_auth))
}

fn scheme_auth(scheme: &Value) -> Option<AuthType> {
    match str_field(scheme, "type")? {
        "oauth2" | "openIdConnect" => Some(AuthType::OAuth),
        "apiKey" => Some(AuthType::ApiKey),
        "http" => match str_field(scheme, "scheme").map(str::to_ascii_lowercase).as_deref() {
            Some("bearer") => Some(AuthType::Bearer),
            _ => Some(AuthType::ApiKey),
        },
        "basic" => Some(AuthType::ApiKey),
        _ => None,
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

struct Refs<'a> {
    root: &'a Value,
}

impl<'a> Refs<'a> {
    fn lookup(&self, reference: &str) -> Option<&'a Value> {
        let pointer = reference.strip_prefix('#')?;
        self.root.pointer(pointer)
    }

    /// Follow a chain of `$ref`s at the top level only.
    fn shallow<'v>(&self, value: &'v Value) -> &'v Value
    where
        'a: 'v,
    {
        let mut current = value;
        for _ in 0..MAX_REF_DEPTH {
            match current
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| self.lookup(r))
            {
                Some(target) => current = target,
                None => break,
            }
        }
        current
    }

    /// Inline references throughout `value`.
    ///
    /// A reference already being expanded on the current chain is left as
    /// `{"$ref": ...}`, and at most [`MAX_INLINED_REFS`] targets are inlined
    /// per schema, so recursive and fan-out schemas stay small.
    fn inline(&self, value: &Value) -> Value {
        let mut budget = MAX_INLINED_REFS;
        self.deep(value, &mut Vec::new(), &mut budget)
    }

    fn deep(&self, value: &Value, chain: &mut Vec<String>, budget: &mut usize) -> Value {
        match value {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                    let expandable = *budget > 0
                        && chain.len() < MAX_REF_DEPTH
                        && !chain.iter().any(|r| r == reference);
                    if let Some(target) = self.lookup(reference).filter(|_| expandable) {
                        *budget -= 1;
                        chain.push(reference.to_string());
                        let inlined = self.deep(target, chain, budget);
                        chain.pop();
                        return inlined;
                    }
                    return value.clone();
                }
                Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), self.deep(v, chain, budget)))
                        .collect::<Map<String, Value>>(),
                )
            },
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.deep(item, chain, budget))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}
