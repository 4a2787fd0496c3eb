//! JSON Schema inference from example payloads.

use serde_json::{Map, Value, json};

/// Infer a JSON Schema from one example value.
///
/// Objects list every observed key as a required property, arrays take the
/// schema of their first element, and numbers are `integer` when the value
/// has no fractional part.
///
/// ```rust
/// use docmcp_core::extract::schema::infer_schema;
/// use serde_json::json;
///
/// let schema = infer_schema(&json!({"name": "a", "qty": 2}));
/// assert_eq!(schema["properties"]["name"]["type"], "string");
/// assert_eq!(schema["properties"]["qty"]["type"], "integer");
/// ```
#[must_use]
pub fn infer_schema(example: &Value) -> Value {
    match example {
        Value::Null => json!({"type": "null"}),
        Value::Bool(_) => json!({"type": "boolean"}),
        Value::Number(n) => {
            let whole = n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0);
            json!({"type": if whole { "integer" } else { "number" }})
        },
        Value::String(_) => json!({"type": "string"}),
        Value::Array(items) => match items.first() {
            Some(first) => json!({"type": "array", "items": infer_schema(first)}),
            None => json!({"type": "array", "items": {}}),
        },
        Value::Object(map) => {
            let properties: Map<String, Value> = map
                .iter()
                .map(|(key, value)| (key.clone(), infer_schema(value)))
                .collect();
            let required: Vec<Value> = map.keys().cloned().map(Value::String).collect();
            json!({"type": "object", "properties": properties, "required": required})
        },
    }
}

/// Parse a request-body literal and infer its schema. Non-JSON bodies yield `None`.
#[must_use]
pub fn infer_from_literal(body: &str) -> Option<(Value, Value)> {
    let example: Value = serde_json::from_str(body.trim()).ok()?;
    if !(example.is_object() || example.is_array()) {
        return None;
    }
    Some((infer_schema(&example), example))
}
