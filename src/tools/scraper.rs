// ABOUTME: WebScraper - fetches a page and returns its readable text.
// ABOUTME: Non-HTML bodies are returned as-is; output is truncated to max_length chars.

use async_trait::async_trait;
use serde::Deserialize;

use super::html::{html_to_text, page_title, truncate_chars};
use crate::tool::{Tool, ToolResult};

/// Tool for scraping the text content of a web page.
#[derive(Debug, Clone)]
pub struct WebScraper {
    client: reqwest::Client,
}

impl WebScraper {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct ScrapeParams {
    #[serde(alias = "website_url")]
    url: String,
    #[serde(default = "default_max_length")]
    max_length: usize,
}

fn default_max_length() -> usize {
    20_000
}

/// Add a scheme when the reasoner leaves it off.
fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

#[async_trait]
impl Tool for WebScraper {
    fn name(&self) -> &str {
        "WebScraper"
    }

    fn description(&self) -> &str {
        "Scrape a web page and return its text content. Use it to read pages found through search."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to scrape"
                },
                "max_length": {
                    "type": "integer",
                    "description": "Maximum number of characters to return (default: 20000)",
                    "default": 20000
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, anyhow::Error> {
        let params: ScrapeParams = serde_json::from_value(params)?;
        let url = normalize_url(&params.url);

        let response = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => return Ok(ToolResult::error(format!("Failed to fetch URL: {}", e))),
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(ToolResult::error(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_lowercase().contains("html"))
            .unwrap_or(true);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Ok(ToolResult::error(format!("Failed to read body: {}", e))),
        };

        let text = if is_html {
            let text = html_to_text(&body);
            match page_title(&body) {
                Some(title) => format!("# {}\n\n{}", title, text),
                None => text,
            }
        } else {
            body
        };

        let (mut text, truncated) = truncate_chars(&text, params.max_length);
        if truncated {
            text.push_str("\n\n[content truncated]");
        }
        Ok(ToolResult::text(format!("Content from {}:\n\n{}", url, text)))
    }
}
