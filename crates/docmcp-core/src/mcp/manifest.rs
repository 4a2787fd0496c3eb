//! MCP manifest assembly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashSet;

use crate::discovery::filter::hostname;
use crate::endpoint::{Endpoint, HttpMethod, ParamLocation, Parameter};
use crate::types::{AuthType, CrawlResult};

/// Manifest format version.
///
/// Bump this when making breaking changes to the manifest structure.
pub const MANIFEST_VERSION: &str = "1.0.0";

/// Authentication block describing how callers present credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpAuth {
    /// Detected auth style.
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    /// Header carrying the credential.
    pub header: String,
    /// Scheme prefix for the header value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Human-readable instructions.
    pub description: String,
}

impl McpAuth {
    /// Boilerplate block for `auth_type`.
    #[must_use]
    pub fn for_type(auth_type: AuthType) -> Self {
        let (header, scheme, description) = match auth_type {
            AuthType::Bearer => (
                "Authorization",
                Some("Bearer"),
                "Send the API token as `Authorization: Bearer <token>`.",
            ),
            AuthType::ApiKey => (
                "X-API-Key",
                None,
                "Send the API key in the `X-API-Key` header (or the header the provider documents).",
            ),
            AuthType::OAuth => (
                "Authorization",
                Some("Bearer"),
                "Obtain an OAuth 2.0 access token and send it as `Authorization: Bearer <token>`.",
            ),
        };
        Self {
            auth_type,
            header: header.to_string(),
            scheme: scheme.map(str::to_string),
            description: description.to_string(),
        }
    }
}

/// Conservative default request limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Sustained requests per minute.
    pub requests_per_minute: u32,
    /// Short burst allowance.
    pub burst: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            burst: 10,
        }
    }
}

/// One callable operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    /// Unique tool name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template relative to `base_url`.
    pub path: String,
    /// JSON Schema of the tool's arguments.
    pub input_schema: Value,
    /// JSON Schema of the successful response.
    pub output_schema: Value,
}

/// Tool manifest for an automation platform.
///
/// ```rust
/// use docmcp_core::endpoint::{Endpoint, HttpMethod};
/// use docmcp_core::mcp::McpSpec;
/// use docmcp_core::AuthType;
///
/// let endpoints = vec![Endpoint::synthesize(HttpMethod::Get, "/users/{id}")];
/// let spec = McpSpec::build(&endpoints, "https://api.example.com", AuthType::Bearer);
///
/// assert_eq!(spec.name, "api-example-com");
/// assert_eq!(spec.tools[0].name, "get_users_id");
/// assert_eq!(spec.tools[0].input_schema["required"][0], "id");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpSpec {
    /// Hostname with dots replaced by hyphens.
    pub name: String,
    /// Manifest format version.
    pub version: String,
    /// One-line summary.
    pub description: String,
    /// API origin the tool paths are relative to.
    pub base_url: String,
    /// Credential handling.
    pub auth: McpAuth,
    /// Request limits.
    pub rate_limit: RateLimit,
    /// One tool per endpoint.
    pub tools: Vec<McpTool>,
    /// When the manifest was generated.
    pub generated_at: DateTime<Utc>,
}

impl McpSpec {
    /// Manifest for a finished crawl.
    #[must_use]
    pub fn from_result(result: &CrawlResult) -> Self {
        Self::build(&result.endpoints, &result.base_url, result.auth_type)
    }

    /// Manifest for `endpoints` served from `base_url`.
    #[must_use]
    pub fn build(endpoints: &[Endpoint], base_url: &str, auth_type: AuthType) -> Self {
        let name = manifest_name(base_url);
        let mut used = HashSet::new();
        let tools: Vec<McpTool> = endpoints
            .iter()
            .map(|endpoint| {
                let mut tool = tool_for(endpoint);
                tool.name = unique_name(&tool.name, &mut used);
                tool
            })
            .collect();
        let host = hostname(base_url).unwrap_or_else(|| name.clone());
        Self {
            description: format!("MCP tools for the {host} API ({} operations)", tools.len()),
            name,
            version: MANIFEST_VERSION.to_string(),
            base_url: base_url.to_string(),
            auth: McpAuth::for_type(auth_type),
            rate_limit: RateLimit::default(),
            tools,
            generated_at: Utc::now(),
        }
    }
}

/// `api.example.com` becomes `api-example-com`. Unparseable URLs give `api`.
#[must_use]
pub fn manifest_name(base_url: &str) -> String {
    hostname(base_url).map_or_else(|| "api".to_string(), |host| host.replace('.', "-"))
}

/// Map one endpoint onto a tool.
#[must_use]
pub fn tool_for(endpoint: &Endpoint) -> McpTool {
    let description = endpoint
        .description
        .clone()
        .or_else(|| endpoint.summary.clone())
        .unwrap_or_else(|| format!("{} {}", endpoint.method, endpoint.path));
    McpTool {
        name: tool_name(&endpoint.operation_id),
        description,
        method: endpoint.method,
        path: endpoint.path.clone(),
        input_schema: input_schema(endpoint),
        output_schema: output_schema(endpoint),
    }
}

/// Object schema from path, query and body parameters plus request-body properties.
///
/// Parameters come first; body properties never replace a parameter of the
/// same name. A request body that is not an object becomes a `body` property.
#[must_use]
pub fn input_schema(endpoint: &Endpoint) -> Value {
    let mut properties = Map::new();
    let mut required: Vec<String> = Vec::new();

    for param in endpoint
        .parameters
        .iter()
        .filter(|p| p.location != ParamLocation::Header)
    {
        if properties.contains_key(&param.name) {
            continue;
        }
        properties.insert(param.name.clone(), parameter_schema(param));
        if param.required {
            required.push(param.name.clone());
        }
    }

    if let Some(body) = &endpoint.request_body {
        match body.schema.get("properties").and_then(Value::as_object) {
            Some(body_props) => {
                let body_required: HashSet<&str> = body
                    .schema
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|r| r.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                for (name, schema) in body_props {
                    if properties.contains_key(name) {
                        continue;
                    }
                    properties.insert(name.clone(), schema.clone());
                    if body_required.contains(name.as_str()) {
                        required.push(name.clone());
                    }
                }
            },
            None if !body.schema.is_null() => {
                if !properties.contains_key("body") {
                    properties.insert("body".to_string(), body.schema.clone());
                    required.push("body".to_string());
                }
            },
            None => {},
        }
    }

    json!({"type": "object", "properties": properties, "required": required})
}

fn parameter_schema(param: &Parameter) -> Value {
    let mut schema = Map::new();
    schema.insert("type".to_string(), Value::String(param.param_type.clone()));
    if let Some(description) = &param.description {
        schema.insert("description".to_string(), Value::String(description.clone()));
    }
    if let Some(default) = &param.default {
        schema.insert("default".to_string(), default.clone());
    }
    Value::Object(schema)
}

/// Primary success schema, or a permissive placeholder.
#[must_use]
pub fn output_schema(endpoint: &Endpoint) -> Value {
    endpoint.primary_response().map_or_else(
        || {
            json!({
                "type": "object",
                "description": "Response body",
                "additionalProperties": true
            })
        },
        |body| body.schema.clone(),
    )
}

fn tool_name(operation_id: &str) -> String {
    let cleaned: String = operation_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if cleaned.trim_matches('_').is_empty() {
        "operation".to_string()
    } else {
        cleaned
    }
}

fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{name}_{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
