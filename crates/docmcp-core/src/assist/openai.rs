//! OpenAI-compatible chat-completions backends for the assist seams.

use super::{Enhancer, LinkSuggester, json_array_in};
use crate::config::EnhanceConfig;
use crate::endpoint::Endpoint;
use crate::extract::Page;
use crate::{Error, Result};
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Page text sent to the link suggester is cut at this many characters.
const MAX_PAGE_CHARS: usize = 12_000;

/// Minimal chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    client: Client,
}

impl OpenAiClient {
    /// Client from `config`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] without an API key, [`Error::Network`] if the HTTP
    /// client cannot be built.
    pub fn new(config: &EnhanceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("enhance.api_key is not set".to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(Error::Network)?;
        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
        })
    }

    /// One system + user exchange; returns the assistant's text.
    #[instrument(skip(self, system, user), fields(model = %self.model))]
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user}
                ],
                "temperature": 0.1
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Enhancement(format!(
                "chat completion returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: Value = response.json().await?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| Error::Enhancement("reply has no message content".to_string()))?;
        debug!(chars = content.len(), "chat completion received");
        Ok(content.to_string())
    }
}

/// Rewrites endpoint summaries and descriptions with a chat model.
#[derive(Debug, Clone)]
pub struct OpenAiEnhancer {
    client: OpenAiClient,
}

impl OpenAiEnhancer {
    /// Enhancer from `config`.
    ///
    /// # Errors
    ///
    /// See [`OpenAiClient::new`].
    pub fn new(config: &EnhanceConfig) -> Result<Self> {
        Ok(Self {
            client: OpenAiClient::new(config)?,
        })
    }
}

const ENHANCE_PROMPT: &str = "You improve REST API documentation. You receive a JSON array of \
endpoints. Return the same array, same order and same method/path values, with a concise \
`summary` (under 10 words) and a one-sentence `description` for each. Reply with the JSON \
array only.";

#[async_trait::async_trait]
impl Enhancer for OpenAiEnhancer {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn enhance(&self, endpoints: &[Endpoint]) -> Result<Vec<Endpoint>> {
        let brief: Vec<Value> = endpoints
            .iter()
            .map(|e| {
                json!({
                    "method": e.method,
                    "path": e.path,
                    "summary": e.summary,
                    "description": e.description,
                    "parameters": e.parameters.iter().map(|p| &p.name).collect::<Vec<_>>(),
                })
            })
            .collect();
        let reply = self
            .client
            .complete(ENHANCE_PROMPT, &Value::Array(brief).to_string())
            .await?;
        apply_reply(endpoints, &json_array_in(&reply)?)
    }
}

/// Copy prose from a model reply onto clones of `endpoints`, matched by method and path.
fn apply_reply(endpoints: &[Endpoint], reply: &Value) -> Result<Vec<Endpoint>> {
    let items = reply
        .as_array()
        .ok_or_else(|| Error::Enhancement("reply is not an array".to_string()))?;
    let mut prose: HashMap<String, (Option<String>, Option<String>)> = HashMap::new();
    for item in items {
        let (Some(method), Some(path)) = (item["method"].as_str(), item["path"].as_str()) else {
            return Err(Error::Enhancement(
                "reply item lacks method or path".to_string(),
            ));
        };
        let text = |field: &str| item[field].as_str().map(str::to_string);
        prose.insert(
            format!("{}:{path}", method.to_ascii_uppercase()),
            (text("summary"), text("description")),
        );
    }

    Ok(endpoints
        .iter()
        .map(|endpoint| {
            let mut out = endpoint.clone();
            if let Some((summary, description)) = prose.remove(&endpoint.key()) {
                out.summary = summary.or(out.summary);
                out.description = description.or(out.description);
            }
            out
        })
        .collect())
}

/// Asks a chat model which links on a page lead to API reference material.
#[derive(Debug, Clone)]
pub struct OpenAiLinkSuggester {
    client: OpenAiClient,
}

impl OpenAiLinkSuggester {
    /// Suggester from `config`.
    ///
    /// # Errors
    ///
    /// See [`OpenAiClient::new`].
    pub fn new(config: &EnhanceConfig) -> Result<Self> {
        Ok(Self {
            client: OpenAiClient::new(config)?,
        })
    }
}

const LINK_PROMPT: &str = "You help crawl API documentation. Given a page's URL, visible text \
and links, list up to 10 URLs most likely to contain API endpoint reference or an \
OpenAPI/Swagger/Postman file. Reply with a JSON array of URL strings only.";

#[async_trait::async_trait]
impl LinkSuggester for OpenAiLinkSuggester {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn suggest_links(&self, html: &str, page_url: &str) -> Result<Vec<String>> {
        let user = page_brief(html, page_url);
        let reply = self.client.complete(LINK_PROMPT, &user).await?;
        let urls = json_array_in(&reply)?
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(urls)
    }
}

/// Page URL, truncated visible text and the list of hrefs.
fn page_brief(html: &str, page_url: &str) -> String {
    let page = Page::parse(html);
    let text: String = page.text().chars().take(MAX_PAGE_CHARS).collect();
    let hrefs: Vec<&str> = scraper::Selector::parse("a[href]")
        .map(|selector| {
            page.document()
                .select(&selector)
                .filter_map(|a| a.value().attr("href"))
                .take(200)
                .collect()
        })
        .unwrap_or_default();
    format!("URL: {page_url}\n\nText:\n{text}\n\nLinks:\n{}", hrefs.join("\n"))
}
