//! Best-effort YAML reader for OpenAPI-shaped documents.
//!
//! Used only after both `serde_json` and `serde_yaml` have rejected a
//! document, which in practice means hand-edited specs with duplicate keys,
//! stray tabs or similar sloppiness. It understands:
//!
//! - block mappings and block sequences, nested by indentation
//! - `- key: value` sequence items that open a mapping
//! - plain, single-quoted and double-quoted scalars, typed as null, bool,
//!   integer, float or string
//! - `|` and `>` block scalars
//! - `[]`, `{}` and flat flow collections of scalars
//!
//! Not supported: anchors and aliases (kept as plain strings), nested flow
//! collections (kept as strings), multi-document streams (only the first
//! document is read). Duplicate keys keep the last value.

use crate::{Error, Result};
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone)]
struct Line {
    number: usize,
    indent: usize,
    content: String,
    raw: String,
}

/// Parse `text` into a JSON value.
pub fn parse(text: &str) -> Result<Value> {
    let mut lines = tokenize(text);
    let Some(first) = lines.first() else {
        return Err(Error::Parse("empty YAML document".into()));
    };
    let indent = first.indent;
    let mut parser = Parser {
        lines: &mut lines,
        pos: 0,
    };
    let value = parser.block(indent)?;
    if let Some(shape) = parser.peek() {
        return Err(unexpected_indent(shape.number));
    }
    Ok(value)
}

fn tokenize(text: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut seen_content = false;
    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim_end();
        if trimmed == "---" || trimmed == "..." {
            if seen_content {
                break;
            }
            continue;
        }
        let expanded = trimmed.replace('\t', "  ");
        let content = strip_comment(expanded.trim_start());
        if content.is_empty() {
            // Blank lines only matter inside block scalars.
            lines.push(Line {
                number: idx + 1,
                indent: usize::MAX,
                content: String::new(),
                raw: String::new(),
            });
            continue;
        }
        seen_content = true;
        lines.push(Line {
            number: idx + 1,
            indent: expanded.len() - expanded.trim_start().len(),
            content: content.to_string(),
            raw: expanded,
        });
    }
    while lines.last().is_some_and(|l| l.content.is_empty()) {
        lines.pop();
    }
    while lines.first().is_some_and(|l| l.content.is_empty()) {
        lines.remove(0);
    }
    lines
}

fn strip_comment(s: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev = ' ';
    for (i, ch) in s.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {},
            None if (ch == '"' || ch == '\'') && (i == 0 || prev == ' ' || prev == ':') => {
                quote = Some(ch);
            },
            None if ch == '#' && (i == 0 || prev == ' ') => return s[..i].trim_end(),
            None => {},
        }
        prev = ch;
    }
    s
}

#[derive(Debug, Clone, Copy)]
struct Shape {
    number: usize,
    indent: usize,
    item: bool,
}

fn unexpected_indent(number: usize) -> Error {
    Error::Parse(format!("unexpected indentation at line {number}"))
}

struct Parser<'a> {
    lines: &'a mut Vec<Line>,
    pos: usize,
}

impl Parser<'_> {
    fn skip_blank(&mut self) {
        while self
            .lines
            .get(self.pos)
            .is_some_and(|l| l.content.is_empty())
        {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<Shape> {
        self.skip_blank();
        self.lines.get(self.pos).map(|line| Shape {
            number: line.number,
            indent: line.indent,
            item: is_sequence_item(&line.content),
        })
    }

    fn block(&mut self, indent: usize) -> Result<Value> {
        match self.peek() {
            Some(shape) if shape.item => self.sequence(indent),
            Some(_) => self.mapping(indent),
            None => Ok(Value::Null),
        }
    }

    fn mapping(&mut self, indent: usize) -> Result<Value> {
        let mut map = Map::new();
        while let Some(shape) = self.peek() {
            if shape.indent < indent || (shape.indent == indent && shape.item) {
                break;
            }
            if shape.indent > indent {
                return Err(unexpected_indent(shape.number));
            }
            let Some((key, rest)) = split_key(&self.lines[self.pos].content) else {
                return Err(Error::Parse(format!(
                    "expected 'key: value' at line {}",
                    shape.number
                )));
            };
            self.pos += 1;
            let value = self.value_after_key(indent, &rest)?;
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }

    fn value_after_key(&mut self, indent: usize, rest: &str) -> Result<Value> {
        if let Some(style) = block_scalar_style(rest) {
            return Ok(Value::String(self.block_scalar(indent, style)));
        }
        if !rest.is_empty() {
            return Ok(scalar(rest));
        }
        match self.peek() {
            Some(next) if next.indent > indent => self.block(next.indent),
            // A sequence may sit at the same indent as its parent key.
            Some(next) if next.indent == indent && next.item => self.sequence(indent),
            _ => Ok(Value::Null),
        }
    }

    fn sequence(&mut self, indent: usize) -> Result<Value> {
        let mut items = Vec::new();
        while let Some(shape) = self.peek() {
            if shape.indent != indent || !shape.item {
                if shape.indent > indent {
                    return Err(unexpected_indent(shape.number));
                }
                break;
            }
            let pos = self.pos;
            let content = &self.lines[pos].content;
            let rest = content[1..].trim_start().to_string();
            let offset = content.len() - rest.len();

            if rest.is_empty() {
                self.pos += 1;
                let item = match self.peek() {
                    Some(next) if next.indent > indent => self.block(next.indent)?,
                    _ => Value::Null,
                };
                items.push(item);
            } else if split_key(&rest).is_some() || is_sequence_item(&rest) {
                // Re-read the remainder as the first line of a nested block.
                self.lines[pos].indent = indent + offset;
                self.lines[pos].content = rest;
                items.push(self.block(indent + offset)?);
            } else {
                self.pos += 1;
                items.push(scalar(&rest));
            }
        }
        Ok(Value::Array(items))
    }

    fn block_scalar(&mut self, parent_indent: usize, style: char) -> String {
        let mut body: Vec<String> = Vec::new();
        let mut block_indent: Option<usize> = None;
        while let Some(line) = self.lines.get(self.pos) {
            if line.content.is_empty() {
                body.push(String::new());
                self.pos += 1;
                continue;
            }
            if line.indent <= parent_indent {
                break;
            }
            let indent = *block_indent.get_or_insert(line.indent);
            let text = line.raw.get(indent.min(line.indent)..).unwrap_or_default();
            body.push(text.to_string());
            self.pos += 1;
        }
        while body.last().is_some_and(String::is_empty) {
            body.pop();
        }
        if style == '|' {
            let mut text = body.join("\n");
            text.push('\n');
            text
        } else {
            fold(&body)
        }
    }
}

fn fold(lines: &[String]) -> String {
    let mut out = String::new();
    for line in lines {
        if line.is_empty() {
            out.push('\n');
        } else {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push(' ');
            }
            out.push_str(line);
        }
    }
    out.push('\n');
    out
}

fn is_sequence_item(content: &str) -> bool {
    content == "-" || content.starts_with("- ")
}

fn block_scalar_style(rest: &str) -> Option<char> {
    let tail = rest.strip_prefix(['|', '>'])?;
    let style = rest.chars().next()?;
    tail.chars()
        .all(|c| matches!(c, '-' | '+' | '0'..='9'))
        .then_some(style)
}

/// Split `key: value` at the first unquoted `": "` (or a trailing `:`).
fn split_key(content: &str) -> Option<(String, String)> {
    if content.starts_with(['"', '\'']) {
        let quote = content.chars().next()?;
        let close = content[1..].find(quote)? + 1;
        let after = content[close + 1..].trim_start();
        let rest = after.strip_prefix(':')?;
        if !(rest.is_empty() || rest.starts_with(' ')) {
            return None;
        }
        return Some((content[1..close].to_string(), rest.trim().to_string()));
    }
    if content.starts_with(['[', '{']) {
        return None;
    }
    if let Some(key) = content.strip_suffix(':') {
        if !key.contains(": ") {
            return Some((key.trim().to_string(), String::new()));
        }
    }
    let idx = content.find(": ")?;
    Some((
        content[..idx].trim().to_string(),
        content[idx + 2..].trim().to_string(),
    ))
}

/// Type a scalar or flat flow collection.
fn scalar(text: &str) -> Value {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        if inner.contains(['[', '{']) {
            return Value::String(text.to_string());
        }
        return Value::Array(split_flow(inner).iter().map(|s| scalar(s)).collect());
    }
    if let Some(inner) = text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        if inner.contains(['[', '{']) {
            return Value::String(text.to_string());
        }
        let mut map = Map::new();
        for entry in split_flow(inner) {
            match split_key(&entry).or_else(|| {
                entry
                    .split_once(':')
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            }) {
                Some((k, v)) => map.insert(k, scalar(&v)),
                None => map.insert(entry, Value::Null),
            };
        }
        return Value::Object(map);
    }
    if let Some(inner) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        return Value::String(unescape_double(inner));
    }
    if let Some(inner) = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        return Value::String(inner.replace("''", "'"));
    }
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return Value::Null,
        "true" | "True" | "TRUE" => return Value::Bool(true),
        "false" | "False" | "FALSE" => return Value::Bool(false),
        _ => {},
    }
    if let Ok(int) = text.parse::<i64>() {
        return Value::Number(int.into());
    }
    if text.contains(['.', 'e', 'E']) && text.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '-') {
        if let Some(num) = text.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(num);
        }
    }
    Value::String(text.to_string())
}

fn split_flow(inner: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in inner.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                current.push(ch);
            },
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                current.push(ch);
            },
            None if ch == ',' => parts.push(std::mem::take(&mut current)),
            None => current.push(ch),
        }
    }
    parts.push(current);
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn unescape_double(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_mappings_and_scalars() {
        let doc = "\
openapi: 3.0.0
info:
  title: Pet Store
  version: '1.0'
  x-count: 3
  x-ratio: 0.5
  x-flag: true
  x-empty: ~
";
        let value = parse(doc).unwrap();
        assert_eq!(value["openapi"], "3.0.0");
        assert_eq!(value["info"]["title"], "Pet Store");
        assert_eq!(value["info"]["version"], "1.0");
        assert_eq!(value["info"]["x-count"], 3);
        assert_eq!(value["info"]["x-ratio"], 0.5);
        assert_eq!(value["info"]["x-flag"], true);
        assert!(value["info"]["x-empty"].is_null());
    }

    #[test]
    fn test_sequences_of_mappings() {
        let doc = "\
parameters:
  - name: id
    in: path
    required: true
  - name: limit
    in: query
tags:
- pets
- store
";
        let value = parse(doc).unwrap();
        assert_eq!(
            value["parameters"],
            json!([
                {"name": "id", "in": "path", "required": true},
                {"name": "limit", "in": "query"}
            ])
        );
        assert_eq!(value["tags"], json!(["pets", "store"]));
    }

    #[test]
    fn test_quoted_keys_and_comments() {
        let doc = "\
paths:
  \"/users/{id}\":   # user by id
    get:
      responses:
        '200':
          description: \"OK: found\"
";
        let value = parse(doc).unwrap();
        assert_eq!(
            value["paths"]["/users/{id}"]["get"]["responses"]["200"]["description"],
            "OK: found"
        );
    }

    #[test]
    fn test_block_scalars() {
        let doc = "\
literal: |
  line one
  line two
folded: >
  joined
  together
after: x
";
        let value = parse(doc).unwrap();
        assert_eq!(value["literal"], "line one\nline two\n");
        assert_eq!(value["folded"], "joined together\n");
        assert_eq!(value["after"], "x");
    }

    #[test]
    fn test_flow_collections() {
        let value = parse("a: []\nb: {}\nc: [GET, 'post', 3]\nd: {type: string, min: 1}\n").unwrap();
        assert_eq!(value["a"], json!([]));
        assert_eq!(value["b"], json!({}));
        assert_eq!(value["c"], json!(["GET", "post", 3]));
        assert_eq!(value["d"], json!({"type": "string", "min": 1}));
    }

    #[test]
    fn test_duplicate_keys_keep_last() {
        let value = parse("a: 1\na: 2\n").unwrap();
        assert_eq!(value["a"], 2);
    }

    #[test]
    fn test_only_first_document_is_read() {
        let value = parse("---\na: 1\n---\nb: 2\n").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_anchors_are_plain_strings() {
        let value = parse("base: &b hello\nother: *b\n").unwrap();
        assert_eq!(value["other"], "*b");
    }

    #[test]
    fn test_rejects_prose() {
        assert!(parse("Just some words\nwithout structure").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_rejects_bad_indentation() {
        assert!(parse("a: 1\n    b: 2\n").is_err());
    }

    #[test]
    fn test_tabs_tolerated() {
        let value = parse("info:\n\ttitle: Tabbed\n").unwrap();
        assert_eq!(value["info"]["title"], "Tabbed");
    }

    #[test]
    fn test_url_values_are_not_keys() {
        let value = parse("servers:\n  - url: https://api.example.com/v1\n").unwrap();
        assert_eq!(value["servers"][0]["url"], "https://api.example.com/v1");
    }
}
