//! `web_search`: ranked web results for a query via Tavily `/search`.

use crate::tavily::{SearchResponse, TavilyClient};
use async_trait::async_trait;
use rustedscout_core::action::Action;
use rustedscout_core::error::ActionError;

const TIME_RANGES: [&str; 4] = ["d", "w", "m", "y"];

pub struct WebSearchAction {
    client: TavilyClient,
    max_results: u32,
}

impl WebSearchAction {
    pub fn new(client: TavilyClient, max_results: u32) -> Self {
        Self {
            client,
            max_results,
        }
    }

    /// Build the `/search` request body from model-supplied arguments.
    fn request_body(&self, arguments: &serde_json::Value) -> Result<serde_json::Value, ActionError> {
        let query = arguments["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ActionError::InvalidArguments("'query' must be a non-empty string".into()))?;

        let mut body = serde_json::json!({
            "query": query,
            "max_results": self.max_results,
        });

        if let Some(range) = arguments["time_range"].as_str() {
            if !TIME_RANGES.contains(&range) {
                return Err(ActionError::InvalidArguments(format!(
                    "time_range must be one of d, w, m, y (got '{range}')"
                )));
            }
            body["time_range"] = serde_json::json!(range);
        }

        let domains = domain_list(&arguments["include_domains"]);
        if !domains.is_empty() {
            body["include_domains"] = serde_json::json!(domains);
        }

        Ok(body)
    }
}

/// Accept either a list of domains or a comma-separated string.
fn domain_list(value: &serde_json::Value) -> Vec<String> {
    let items: Vec<&str> = match value {
        serde_json::Value::String(s) => s.split(',').collect(),
        serde_json::Value::Array(items) => items.iter().filter_map(|v| v.as_str()).collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render search hits as numbered `RESULT n` blocks.
///
/// Full page text (`raw_content`) is preferred over the snippet when present.
pub fn format_search_results(response: &SearchResponse) -> String {
    let hits = match &response.results {
        Some(hits) if !hits.is_empty() => hits,
        _ => return "No search results found.".into(),
    };

    let blocks: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let mut block = format!(
                "\nRESULT {}:\nTitle: {}\nURL: {}\n",
                i + 1,
                hit.title.as_deref().unwrap_or("No title"),
                hit.url.as_deref().unwrap_or("No URL"),
            );
            match hit.raw_content.as_deref().map(str::trim) {
                Some(raw) if !raw.is_empty() => {
                    block.push_str(&format!("Raw Content: {raw}\n"));
                }
                _ => {
                    let content = hit.content.as_deref().unwrap_or_default().trim();
                    block.push_str(&format!("Content: {content}\n"));
                }
            }
            block
        })
        .collect();

    format!("\n{}", blocks.join("\n"))
}

#[async_trait]
impl Action for WebSearchAction {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Perform a web search. Returns the title, URL, and content of each result ranked by relevance."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "time_range": {
                    "type": "string",
                    "enum": TIME_RANGES,
                    "description": "Only content from the last day (d), week (w), month (m) or year (y)"
                },
                "include_domains": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Restrict results to these domains"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ActionError> {
        let body = self.request_body(&arguments)?;
        let response: SearchResponse = self.client.post(self.name(), "search", &body).await?;
        Ok(format_search_results(&response))
    }
}
