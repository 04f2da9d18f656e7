//! `web_crawl`: follow links from a starting URL via Tavily `/crawl`.

use crate::tavily::{CrawlResponse, CrawledPage, TavilyClient};
use crate::url::{normalize_url, truncate_chars};
use async_trait::async_trait;
use rustedscout_core::action::Action;
use rustedscout_core::error::ActionError;

pub struct WebCrawlAction {
    client: TavilyClient,
    max_depth: u32,
    limit: u32,
    content_limit: usize,
}

impl WebCrawlAction {
    pub fn new(client: TavilyClient, max_depth: u32, limit: u32, content_limit: usize) -> Self {
        Self {
            client,
            max_depth,
            limit,
            content_limit,
        }
    }

    fn request_body(&self, arguments: &serde_json::Value) -> Result<serde_json::Value, ActionError> {
        let url = arguments["url"]
            .as_str()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ActionError::InvalidArguments("'url' must be a non-empty string".into()))?;

        let mut body = serde_json::json!({
            "url": normalize_url(url),
            "max_depth": self.max_depth,
            "limit": self.limit,
        });
        if let Some(instructions) = arguments["instructions"].as_str() {
            body["instructions"] = serde_json::json!(instructions);
        }
        Ok(body)
    }
}

/// Render crawled pages under a rule, one `RESULT n` block per page.
///
/// The first line of a page's content stands in for its title.
pub fn format_crawl_results(pages: &[CrawledPage], content_limit: usize) -> String {
    if pages.is_empty() {
        return "No crawl results found.".into();
    }

    let blocks: Vec<String> = pages
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let mut block = format!(
                "\nRESULT {}:\nURL: {}\n",
                i + 1,
                page.url.as_deref().unwrap_or("No URL")
            );
            if let Some(raw) = page.raw_content.as_deref().filter(|r| !r.is_empty()) {
                let title = raw.lines().next().unwrap_or_default();
                block.push_str(&format!("Title: {title}\n"));
                block.push_str(&format!("Content: {}\n", truncate_chars(raw, content_limit)));
            }
            block
        })
        .collect();

    format!("\n{}{}", "-".repeat(40), blocks.join("\n"))
}

#[async_trait]
impl Action for WebCrawlAction {
    fn name(&self) -> &str {
        "web_crawl"
    }

    fn description(&self) -> &str {
        "Crawl a website starting from a URL and return the content of the pages found."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to start crawling from"
                },
                "instructions": {
                    "type": "string",
                    "description": "Guidance for the crawler, such as which content to focus on"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ActionError> {
        let body = self.request_body(&arguments)?;
        let response: CrawlResponse = self.client.post(self.name(), "crawl", &body).await?;
        Ok(format_crawl_results(&response.into_pages(), self.content_limit))
    }
}
