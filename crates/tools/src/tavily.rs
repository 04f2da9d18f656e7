//! Minimal Tavily REST client shared by the web actions.
//!
//! Endpoints: `/search`, `/extract`, `/crawl`, all `POST` with a bearer key.

use rustedscout_config::ActionsConfig;
use rustedscout_core::error::ActionError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Shared HTTP client and credentials for Tavily.
#[derive(Clone)]
pub struct TavilyClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl TavilyClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ActionsConfig) -> Self {
        Self::new(config.tavily_api_key.clone(), config.base_url.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// POST `body` to `endpoint` on behalf of `action` and decode the reply.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        action: &str,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<T, ActionError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| ActionError::NotConfigured {
            action: action.to_string(),
            reason: "TAVILY_API_KEY not set".into(),
        })?;

        let url = format!("{}/{endpoint}", self.base_url);
        debug!(action, %url, "Calling Tavily");

        let failed = |reason: String| ActionError::Failed {
            action: action.to_string(),
            reason,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| failed(format!("request error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(action, status = status.as_u16(), "Tavily returned an error");
            return Err(failed(format!("status {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| failed(format!("unreadable response: {e}")))
    }
}

// --- Tavily response types ---
// Tavily sends explicit nulls for absent fields, so fields are optional.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub results: Option<Vec<SearchHit>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchHit {
    pub title: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
    pub raw_content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExtractResponse {
    pub results: Option<Vec<ExtractedPage>>,
    pub failed_results: Option<Vec<FailedExtraction>>,
    pub response_time: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExtractedPage {
    pub url: Option<String>,
    pub raw_content: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FailedExtraction {
    pub url: Option<String>,
    pub error: Option<String>,
}

/// `/crawl` replies with either `{"results": [...]}` or a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CrawlResponse {
    Wrapped {
        #[serde(default)]
        results: Option<Vec<CrawledPage>>,
    },
    Bare(Vec<CrawledPage>),
}

impl CrawlResponse {
    pub fn into_pages(self) -> Vec<CrawledPage> {
        match self {
            Self::Wrapped { results } => results.unwrap_or_default(),
            Self::Bare(results) => results,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CrawledPage {
    pub url: Option<String>,
    pub raw_content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let client = TavilyClient::new(Some("  ".into()), "https://api.tavily.com/");
        assert!(!client.is_configured());
        let err = client
            .post::<SearchResponse>("web_search", "search", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::NotConfigured { .. }));
    }

    #[test]
    fn responses_tolerate_missing_fields() {
        let search: SearchResponse =
            serde_json::from_str(r#"{"results":[{"url":"https://a.example"}],"query":"q"}"#)
                .unwrap();
        let hits = search.results.unwrap();
        assert_eq!(hits[0].url.as_deref(), Some("https://a.example"));
        assert!(hits[0].title.is_none());

        let extract: ExtractResponse = serde_json::from_str(r#"{"response_time": 1.5}"#).unwrap();
        assert!(extract.results.is_none());

        let crawl: CrawlResponse =
            serde_json::from_str(r#"{"base_url":"x","results":[{"url":"u","raw_content":"c"}]}"#)
                .unwrap();
        assert_eq!(crawl.into_pages().len(), 1);
        let bare: CrawlResponse = serde_json::from_str(r#"[{"url":"u"}]"#).unwrap();
        assert_eq!(bare.into_pages().len(), 1);
    }
}
