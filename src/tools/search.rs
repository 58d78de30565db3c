// ABOUTME: DuckDuckGo HTML search backend and the two search tools built on it.
// ABOUTME: DuckDuckGoSearch returns a text digest; DuckDuckGoResults returns structured hits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::html::{decode_entities, strip_tags};
use crate::tool::{Tool, ToolResult};

const DDG_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// Client for DuckDuckGo's HTML search page.
#[derive(Debug, Clone)]
pub struct DuckDuckGo {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGo {
    /// Create a backend around an HTTP client.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: DDG_HTML_ENDPOINT.to_string(),
        }
    }

    /// Point the backend at a different search endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Run a search and return at most `max_results` hits.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| format!("Search failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Search failed with status: {}", response.status()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {}", e))?;

        let mut hits = parse_results(&html);
        hits.truncate(max_results);
        Ok(hits)
    }
}

/// Return the text after the next `>` up to `end`.
fn element_body<'a>(fragment: &'a str, end: &str) -> Option<&'a str> {
    let gt = fragment.find('>')?;
    let body = &fragment[gt + 1..];
    let stop = body.find(end)?;
    Some(&body[..stop])
}

/// DuckDuckGo wraps result links in a redirect; recover the target.
fn unwrap_redirect(raw: &str) -> String {
    let raw = decode_entities(raw);
    match raw.find("uddg=") {
        Some(pos) => {
            let encoded = &raw[pos + 5..];
            let encoded = encoded.split('&').next().unwrap_or(encoded);
            urlencoding::decode(encoded)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| encoded.to_string())
        }
        None if raw.starts_with("//") => format!("https:{}", raw),
        None => raw,
    }
}

fn clean(fragment: &str) -> String {
    decode_entities(strip_tags(fragment).trim())
}

/// Parse DuckDuckGo HTML search results.
pub fn parse_results(html: &str) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    // Each hit starts at a `result__a` anchor; its snippet follows before the next one.
    for chunk in html.split("class=\"result__a\"").skip(1) {
        let Some(href_pos) = chunk.find("href=\"") else {
            continue;
        };
        let href = &chunk[href_pos + 6..];
        let Some(href_end) = href.find('"') else {
            continue;
        };
        let link = unwrap_redirect(&href[..href_end]);
        let title = element_body(chunk, "</a>").map(clean).unwrap_or_default();

        let snippet = chunk
            .find("class=\"result__snippet\"")
            .and_then(|pos| element_body(&chunk[pos..], "</a>"))
            .map(clean)
            .unwrap_or_default();

        if !link.is_empty() && !title.is_empty() {
            hits.push(SearchHit {
                title,
                link,
                snippet,
            });
        }
    }
    hits
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(alias = "search_query")]
    query: String,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

fn default_max_results() -> usize {
    5
}

fn search_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "The search query"
            },
            "max_results": {
                "type": "integer",
                "description": "Maximum number of results to return (default: 5)",
                "default": 5
            }
        },
        "required": ["query"]
    })
}

/// Web search returning a plain-text digest of the top results.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    backend: DuckDuckGo,
}

impl DuckDuckGoSearch {
    pub fn new(backend: DuckDuckGo) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "DuckDuckGoSearch"
    }

    fn description(&self) -> &str {
        "Search the web with DuckDuckGo and get a short text digest of the top results."
    }

    fn schema(&self) -> serde_json::Value {
        search_schema()
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, anyhow::Error> {
        let params: SearchParams = serde_json::from_value(params)?;
        let hits = match self.backend.search(&params.query, params.max_results).await {
            Ok(hits) => hits,
            Err(message) => return Ok(ToolResult::error(message)),
        };

        if hits.is_empty() {
            return Ok(ToolResult::text("No results found."));
        }

        let digest = hits
            .iter()
            .map(|hit| {
                if hit.snippet.is_empty() {
                    hit.title.clone()
                } else {
                    hit.snippet.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        Ok(ToolResult::text(digest))
    }
}

/// Web search returning structured hits as JSON.
#[derive(Debug, Clone)]
pub struct DuckDuckGoResults {
    backend: DuckDuckGo,
}

impl DuckDuckGoResults {
    pub fn new(backend: DuckDuckGo) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for DuckDuckGoResults {
    fn name(&self) -> &str {
        "DuckDuckGoResults"
    }

    fn description(&self) -> &str {
        "Search the web with DuckDuckGo. Returns a JSON list of results with title, link, and snippet."
    }

    fn schema(&self) -> serde_json::Value {
        search_schema()
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, anyhow::Error> {
        let params: SearchParams = serde_json::from_value(params)?;
        match self.backend.search(&params.query, params.max_results).await {
            Ok(hits) => Ok(ToolResult::json(&hits)?),
            Err(message) => Ok(ToolResult::error(message)),
        }
    }
}
