//! Web research actions for RustedScout.
//!
//! Three actions backed by the Tavily API give the engine its view of the
//! web: `web_search`, `web_extract` and `web_crawl`. Each renders its
//! response as plain text for the model and the citation formatter.

pub mod tavily;
pub mod url;
pub mod web_crawl;
pub mod web_extract;
pub mod web_search;

pub use tavily::TavilyClient;
pub use web_crawl::WebCrawlAction;
pub use web_extract::WebExtractAction;
pub use web_search::WebSearchAction;

use rustedscout_config::ActionsConfig;
use rustedscout_core::action::ActionRegistry;
use std::sync::Arc;

/// Create the registry of web actions, sharing one Tavily client.
///
/// Actions are registered even without an API key; they then fail locally
/// with a not-configured error that the model can see.
pub fn default_registry(config: &ActionsConfig) -> ActionRegistry {
    let client = TavilyClient::from_config(config);
    if !client.is_configured() {
        tracing::warn!("TAVILY_API_KEY not set; web actions will fail");
    }

    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(WebSearchAction::new(
        client.clone(),
        config.search_max_results,
    )));
    registry.register(Arc::new(WebExtractAction::new(
        client.clone(),
        config.extract_depth.clone(),
        config.extract_content_limit,
    )));
    registry.register(Arc::new(WebCrawlAction::new(
        client,
        config.crawl_max_depth,
        config.crawl_limit,
        config.crawl_content_limit,
    )));
    registry
}
