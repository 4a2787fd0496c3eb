//! Parsers for machine-readable API descriptions.
//!
//! All parsers are pure: text or a decoded document in, endpoints out.
//! Documents are decoded with [`load_document`], which tries strict JSON,
//! then `serde_yaml`, then the lenient [`yaml`] reader. [`parse_document`]
//! picks the parser by document shape:
//!
//! 1. OpenAPI 3 / Swagger 2 ([`openapi`])
//! 2. Postman collections ([`postman`])
//! 3. A last-resort scan for path-like strings ([`generic`])

pub mod generic;
pub mod openapi;
pub mod postman;
pub mod yaml;

use crate::endpoint::Endpoint;
use crate::types::AuthType;
use crate::{Error, Result};
use serde_json::Value;

/// Which parser produced a [`ParsedSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    /// OpenAPI 3.x.
    OpenApi3,
    /// Swagger / OpenAPI 2.0.
    Swagger2,
    /// Postman collection.
    Postman,
    /// Path-like strings found in arbitrary JSON.
    Generic,
}

impl SpecKind {
    /// Log component name for this parser.
    #[must_use]
    pub const fn component(self) -> &'static str {
        match self {
            Self::OpenApi3 | Self::Swagger2 => "OpenAPI",
            Self::Postman => "Postman",
            Self::Generic => "GenericJSON",
        }
    }
}

/// Endpoints plus the document-level facts a spec can state outright.
#[derive(Debug, Clone)]
pub struct ParsedSpec {
    /// Parser that recognized the document.
    pub kind: SpecKind,
    /// Endpoints in document order.
    pub endpoints: Vec<Endpoint>,
    /// Declared API origin (servers, Swagger 2 scheme + host, collection variable).
    pub base_url: Option<String>,
    /// Declared authentication scheme.
    pub auth_type: Option<AuthType>,
    /// Document title.
    pub title: Option<String>,
    /// Document description.
    pub description: Option<String>,
}

impl ParsedSpec {
    pub(crate) const fn empty(kind: SpecKind) -> Self {
        Self {
            kind,
            endpoints: Vec::new(),
            base_url: None,
            auth_type: None,
            title: None,
            description: None,
        }
    }
}

/// Decode JSON or YAML into a JSON value.
///
/// JSON failure silently falls through to YAML. Scalars are rejected: prose
/// and HTML are valid YAML strings but never documents.
pub fn load_document(text: &str) -> Result<Value> {
    let text = text.trim_start_matches('\u{feff}');
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return structured(value);
    }
    if let Ok(value) = serde_yaml::from_str::<Value>(text) {
        if value.is_object() || value.is_array() {
            return Ok(value);
        }
    }
    structured(yaml::parse(text)?)
}

fn structured(value: Value) -> Result<Value> {
    if value.is_object() || value.is_array() {
        Ok(value)
    } else {
        Err(Error::Parse("document is a bare scalar".into()))
    }
}

/// Decode `text` and run the first parser that recognizes it.
pub fn parse_document(text: &str) -> Result<ParsedSpec> {
    let doc = load_document(text)?;
    parse_value(&doc)
}

/// Run the first parser that recognizes an already-decoded document.
///
/// Fails with [`Error::Parse`] when no structured format matches and the
/// generic scan finds nothing.
pub fn parse_value(doc: &Value) -> Result<ParsedSpec> {
    if openapi::is_spec(doc) {
        return openapi::parse_value(doc);
    }
    if postman::is_collection(doc) {
        return postman::parse_value(doc);
    }
    let endpoints = generic::extract_endpoints_from_generic_json(doc);
    if endpoints.is_empty() {
        return Err(Error::Parse("no recognizable API description".into()));
    }
    Ok(ParsedSpec {
        endpoints,
        ..ParsedSpec::empty(SpecKind::Generic)
    })
}

/// Whether `text` plausibly holds a JSON or YAML document rather than markup.
#[must_use]
pub fn looks_like_document(text: &str) -> bool {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return true;
    }
    if trimmed.starts_with('<') {
        return false;
    }
    trimmed
        .lines()
        .take(5)
        .any(|line| {
            let line = line.trim();
            ["openapi:", "swagger:", "info:", "paths:", "item:"]
                .iter()
                .any(|key| line.starts_with(key))
        })
}
