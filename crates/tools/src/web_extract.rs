//! `web_extract`: full page content for one or more URLs via Tavily `/extract`.

use crate::tavily::{ExtractResponse, TavilyClient};
use crate::url::{normalize_url, truncate_chars};
use async_trait::async_trait;
use rustedscout_core::action::Action;
use rustedscout_core::error::ActionError;

const MAX_LISTED_IMAGES: usize = 3;

pub struct WebExtractAction {
    client: TavilyClient,
    default_depth: String,
    content_limit: usize,
}

impl WebExtractAction {
    pub fn new(client: TavilyClient, default_depth: impl Into<String>, content_limit: usize) -> Self {
        Self {
            client,
            default_depth: default_depth.into(),
            content_limit,
        }
    }

    fn request_body(&self, arguments: &serde_json::Value) -> Result<serde_json::Value, ActionError> {
        let urls: Vec<String> = match &arguments["urls"] {
            serde_json::Value::String(url) => vec![normalize_url(url)],
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(normalize_url)
                .collect(),
            _ => Vec::new(),
        };
        if urls.is_empty() {
            return Err(ActionError::InvalidArguments(
                "'urls' must be a URL or a list of URLs".into(),
            ));
        }

        let depth = arguments["extract_depth"]
            .as_str()
            .unwrap_or(&self.default_depth);
        if depth != "basic" && depth != "advanced" {
            return Err(ActionError::InvalidArguments(format!(
                "extract_depth must be 'basic' or 'advanced' (got '{depth}')"
            )));
        }

        Ok(serde_json::json!({
            "urls": urls,
            "include_images": arguments["include_images"].as_bool().unwrap_or(false),
            "extract_depth": depth,
        }))
    }
}

/// Render extracted pages as `EXTRACT RESULT n` blocks, followed by any
/// failed URLs and the API response time.
pub fn format_extract_results(response: &ExtractResponse, content_limit: usize) -> String {
    let Some(pages) = &response.results else {
        return "No extract results found.".into();
    };

    let mut out = String::from("\n");
    for (i, page) in pages.iter().enumerate() {
        out.push_str(&format!(
            "\nEXTRACT RESULT {}:\nURL: {}\n",
            i + 1,
            page.url.as_deref().unwrap_or("No URL")
        ));

        match page.raw_content.as_deref() {
            Some(raw) if !raw.is_empty() => {
                out.push_str(&format!("Content: {}\n", truncate_chars(raw, content_limit)));
            }
            _ => out.push_str("Content: No content extracted\n"),
        }

        let images = page.images.as_deref().unwrap_or_default();
        if !images.is_empty() {
            out.push_str(&format!("Images found: {} images\n", images.len()));
            for (j, image) in images.iter().take(MAX_LISTED_IMAGES).enumerate() {
                out.push_str(&format!("  Image {}: {image}\n", j + 1));
            }
            if images.len() > MAX_LISTED_IMAGES {
                out.push_str(&format!(
                    "  ... and {} more images\n",
                    images.len() - MAX_LISTED_IMAGES
                ));
            }
        }
    }

    let failed = response.failed_results.as_deref().unwrap_or_default();
    if !failed.is_empty() {
        out.push_str("\nFAILED EXTRACTIONS:\n");
        for (i, failure) in failed.iter().enumerate() {
            out.push_str(&format!(
                "Failed {}: {} - {}\n",
                i + 1,
                failure.url.as_deref().unwrap_or("Unknown URL"),
                failure.error.as_deref().unwrap_or("Unknown error"),
            ));
        }
    }

    out.push_str(&format!(
        "\nResponse time: {} seconds",
        response.response_time.unwrap_or(0.0)
    ));
    out
}

#[async_trait]
impl Action for WebExtractAction {
    fn name(&self) -> &str {
        "web_extract"
    }

    fn description(&self) -> &str {
        "Extract the full content of one or more web pages, optionally listing the images they contain."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "urls": {
                    "description": "A URL or a list of URLs to extract",
                    "anyOf": [
                        { "type": "string" },
                        { "type": "array", "items": { "type": "string" } }
                    ]
                },
                "include_images": {
                    "type": "boolean",
                    "description": "Also list image URLs found on the pages",
                    "default": false
                },
                "extract_depth": {
                    "type": "string",
                    "enum": ["basic", "advanced"],
                    "default": "basic"
                }
            },
            "required": ["urls"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ActionError> {
        let body = self.request_body(&arguments)?;
        let response: ExtractResponse = self.client.post(self.name(), "extract", &body).await?;
        Ok(format_extract_results(&response, self.content_limit))
    }
}
