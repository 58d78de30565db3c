// ABOUTME: Built-in web research tools: DuckDuckGo search, structured results, page scraping.
// ABOUTME: `register_web_tools` installs all three into a ToolDirectory.

mod html;
mod scraper;
mod search;

use std::time::Duration;

pub use html::{html_to_text, strip_tags};
pub use scraper::WebScraper;
pub use search::{DuckDuckGo, DuckDuckGoResults, DuckDuckGoSearch, SearchHit, parse_results};

use crate::error::RegistryError;
use crate::tool::ToolDirectory;

/// Shared HTTP client for the web tools.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("Mozilla/5.0 (compatible; taskcrew/", env!("CARGO_PKG_VERSION"), ")"))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Register `DuckDuckGoSearch`, `DuckDuckGoResults` and `WebScraper`.
pub fn register_web_tools(directory: &mut ToolDirectory) -> Result<(), RegistryError> {
    let client = http_client();
    let backend = DuckDuckGo::new(client.clone());
    directory.register(DuckDuckGoSearch::new(backend.clone()))?;
    directory.register(DuckDuckGoResults::new(backend))?;
    directory.register(WebScraper::new(client))?;
    Ok(())
}
