//! cURL examples and bare `METHOD /path` lines in code blocks.

use super::schema::infer_from_literal;
use super::{Candidate, Extractor, Page, text};
use crate::endpoint::{BodySchema, HttpMethod};
use crate::error::{Error, Result};
use scraper::Selector;

/// Scans `<pre>` and `<code>` blocks. Pages without any fall back to
/// rendered-text lines that start with `curl`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeExtractor;

impl Extractor for CodeExtractor {
    fn name(&self) -> &'static str {
        "code"
    }

    fn extract(&self, page: &Page) -> Vec<Candidate> {
        let Ok(blocks) = Selector::parse("pre, code") else {
            return Vec::new();
        };
        let mut seen_block = false;
        let mut found = Vec::new();
        for block in page.document().select(&blocks) {
            seen_block = true;
            // `<pre><code>` is scanned once, through the `pre`.
            let nested = block
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name() == "pre"))
                .unwrap_or(false);
            if nested {
                continue;
            }
            let body: String = block.text().collect();
            found.extend(scan_block(&body));
        }
        if !seen_block {
            found.extend(curl_commands(page.text()).iter().filter_map(|c| parse_curl(c)));
        }
        found
    }
}

/// Candidates from one code block.
#[must_use]
pub fn scan_block(block: &str) -> Vec<Candidate> {
    let mut found: Vec<Candidate> = curl_commands(block)
        .iter()
        .filter_map(|command| parse_curl(command))
        .collect();
    found.extend(text::scan(block));
    found
}

/// Split a block into cURL commands.
///
/// Backslash-newline continuations are joined. A command runs to the end of
/// its line, or further while a quote is still open.
fn curl_commands(block: &str) -> Vec<String> {
    let joined = block.replace("\\\r\n", " ").replace("\\\n", " ");
    let mut commands: Vec<String> = Vec::new();
    let mut open = false;
    for line in joined.lines() {
        if open {
            if let Some(current) = commands.last_mut() {
                current.push('\n');
                current.push_str(line);
                open = tokenize_curl(current).is_err();
            }
            continue;
        }
        let trimmed = line.trim_start();
        let trimmed = trimmed.strip_prefix('$').map_or(trimmed, str::trim_start);
        if trimmed == "curl" || trimmed.starts_with("curl ") {
            open = tokenize_curl(trimmed).is_err();
            commands.push(trimmed.to_string());
        }
    }
    commands
}

/// Shell-style split honoring single quotes, double quotes and backslash escapes.
///
/// # Errors
///
/// Returns [`Error::Parse`] on an unterminated quote.
pub fn tokenize_curl(command: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;

    for c in command.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if !in_single => escaped = true,
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            c if c.is_whitespace() && !in_single && !in_double => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            },
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    if in_single || in_double {
        return Err(Error::Parse("Unterminated quote in curl command".to_string()));
    }
    Ok(tokens)
}

/// Flags whose next token is a value we do not use.
const VALUE_FLAGS: &[&str] = &[
    "-H",
    "--header",
    "-u",
    "--user",
    "-o",
    "--output",
    "-A",
    "--user-agent",
    "-b",
    "--cookie",
    "-e",
    "--referer",
    "-m",
    "--max-time",
    "--connect-timeout",
    "-w",
    "--write-out",
    "--cacert",
    "--cert",
    "--key",
];

const DATA_FLAGS: &[&str] = &[
    "-d",
    "--data",
    "--data-raw",
    "--data-binary",
    "--data-ascii",
    "--data-urlencode",
    "--json",
];

/// Method, target and body of one command. Unparseable commands yield `None`.
fn parse_curl(command: &str) -> Option<Candidate> {
    let tokens = tokenize_curl(command).ok()?;
    let mut method = None;
    let mut target: Option<String> = None;
    let mut data: Option<String> = None;
    let mut form = false;
    let mut force_get = false;

    let mut iter = tokens.iter().skip(1);
    while let Some(token) = iter.next() {
        let token = token.as_str();
        if matches!(token, "-X" | "--request") {
            method = iter.next().and_then(|m| HttpMethod::parse(m));
        } else if let Some(inline) = token.strip_prefix("-X").filter(|m| !m.is_empty()) {
            method = HttpMethod::parse(inline);
        } else if DATA_FLAGS.contains(&token) {
            data = iter.next().cloned();
        } else if matches!(token, "-F" | "--form") {
            form = true;
            iter.next();
        } else if matches!(token, "-G" | "--get") {
            force_get = true;
        } else if token == "--url" {
            target = iter.next().cloned();
        } else if VALUE_FLAGS.contains(&token) {
            iter.next();
        } else if !token.starts_with('-') && target.is_none() {
            target = Some(token.to_string());
        }
    }

    let method = method.unwrap_or(if force_get {
        HttpMethod::Get
    } else if data.is_some() || form {
        HttpMethod::Post
    } else {
        HttpMethod::Get
    });
    let mut candidate = Candidate::new(method, &normalize_target(target.as_deref()?))?;
    candidate.request_body = data
        .as_deref()
        .and_then(infer_from_literal)
        .map(|(schema, example)| BodySchema {
            schema,
            example: Some(example),
        });
    Some(candidate)
}

/// `$BASE_URL/items` and `api.x.com/items` forms.
fn normalize_target(target: &str) -> String {
    if target.starts_with('$') {
        return target.find('/').map_or_else(String::new, |i| target[i..].to_string());
    }
    if !target.contains("://") && !target.starts_with('/') && !target.starts_with("{{") {
        let host = target.split('/').next().unwrap_or_default();
        if host.contains('.') && target.contains('/') {
            return format!("https://{target}");
        }
    }
    target.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(found: &[Candidate]) -> Vec<String> {
        found.iter().map(|c| format!("{}:{}", c.method, c.path)).collect()
    }

    #[test]
    fn test_post_with_json_body() {
        let page = Page::parse(r#"<pre>curl -X POST 'https://x/api/items' -d '{"name":"a"}'</pre>"#);
        let found = CodeExtractor.extract(&page);
        assert_eq!(keys(&found), vec!["POST:/api/items"]);
        let body = found[0].request_body.as_ref().unwrap();
        assert_eq!(body.schema["properties"]["name"]["type"], "string");
        assert_eq!(body.example, Some(json!({"name": "a"})));
        assert_eq!(found[0].origin.as_deref(), Some("https://x"));
    }

    #[test]
    fn test_method_defaults() {
        let found = scan_block("curl https://api.x.com/things -d '{\"a\":1}'\ncurl https://api.x.com/things/{id}");
        assert_eq!(keys(&found), vec!["POST:/things", "GET:/things/{id}"]);
        let found = scan_block("curl -G https://api.x.com/search --data-urlencode 'q=x'");
        assert_eq!(keys(&found), vec!["GET:/search"]);
    }

    #[test]
    fn test_continuations_and_prompts() {
        let block = "$ curl \\\n  --request PATCH \\\n  --url https://api.x.com/users/:id \\\n  --header 'Authorization: Bearer t' \\\n  --data '{\"name\": \"b\"}'";
        let found = scan_block(block);
        assert_eq!(keys(&found), vec!["PATCH:/users/{id}"]);
        assert!(found[0].request_body.is_some());
    }

    #[test]
    fn test_quoted_body_spanning_lines() {
        let block = "curl -XPUT https://api.x.com/items/1 -d '{\n  \"qty\": 2\n}'\n{\"ok\": true}";
        let found = scan_block(block);
        assert_eq!(keys(&found), vec!["PUT:/items/1"]);
        assert_eq!(
            found[0].request_body.as_ref().unwrap().schema["properties"]["qty"]["type"],
            "integer"
        );
    }

    #[test]
    fn test_bare_method_lines_in_code() {
        let found = scan_block("GET /v1/status\nDELETE /v1/sessions/{id}");
        assert_eq!(keys(&found), vec!["GET:/v1/status", "DELETE:/v1/sessions/{id}"]);
    }

    #[test]
    fn test_variable_and_hostless_targets() {
        assert_eq!(keys(&scan_block("curl $BASE_URL/orders")), vec!["GET:/orders"]);
        assert_eq!(keys(&scan_block("curl api.x.com/orders")), vec!["GET:/orders"]);
        assert_eq!(keys(&scan_block("curl {{baseUrl}}/orders")), vec!["GET:/orders"]);
    }

    #[test]
    fn test_non_json_body_has_no_schema() {
        let found = scan_block("curl -F file=@a.png https://api.x.com/uploads");
        assert_eq!(keys(&found), vec!["POST:/uploads"]);
        assert!(found[0].request_body.is_none());
    }

    #[test]
    fn test_plain_text_fallback() {
        let page = Page::parse("Try it:\ncurl -X DELETE https://api.x.com/users/7\nDone.");
        assert_eq!(keys(&CodeExtractor.extract(&page)), vec!["DELETE:/users/7"]);
    }

    #[test]
    fn test_nested_code_scanned_once() {
        let page = Page::parse("<pre><code>curl https://api.x.com/a</code></pre>");
        assert_eq!(CodeExtractor.extract(&page).len(), 1);
    }

    #[test]
    fn test_tokenizer() {
        assert_eq!(
            tokenize_curl(r#"curl -H "A: b" 'x y' z\ w"#).unwrap(),
            vec!["curl", "-H", "A: b", "x y", "z w"]
        );
        assert!(tokenize_curl("curl 'open").is_err());
    }
}
