//! Subcommand implementations.

pub mod onboard;
pub mod research;
pub mod thread;

use rustedscout_config::AppConfig;
use rustedscout_core::error::{Error, ErrorKind};
use rustedscout_engine::{EngineConfig, ResearchEngine};
use rustedscout_store::ConversationStore;
use std::sync::Arc;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Load configuration, mapping failures into the engine's taxonomy.
pub fn load_config() -> Result<AppConfig, Error> {
    AppConfig::load().map_err(|e| Error::Config {
        message: e.to_string(),
    })
}

/// Open the configured checkpoint backend.
pub async fn open_store(config: &AppConfig) -> Result<Arc<ConversationStore>, Error> {
    let backend = rustedscout_store::build_from_config(&config.store).await?;
    Ok(Arc::new(ConversationStore::new(backend)))
}

/// Wire provider, actions and store into an engine.
pub async fn build_engine(config: &AppConfig) -> Result<ResearchEngine, Error> {
    let provider = rustedscout_providers::build_from_config(config).map_err(|e| Error::Config {
        message: format!("{e}. Set RUSTEDSCOUT_API_KEY or ANTHROPIC_API_KEY, or run `rustedscout onboard`"),
    })?;
    let actions = rustedscout_tools::default_registry(&config.actions);
    let store = open_store(config).await?;
    tracing::debug!(
        provider = provider.name(),
        store = store.backend_name(),
        actions = ?actions.names(),
        "Engine assembled"
    );
    Ok(ResearchEngine::new(
        provider,
        actions,
        store,
        EngineConfig::from_app_config(config),
    ))
}

/// Render a failure as `[<kind>] <message>`.
pub fn describe_error(error: &(dyn std::error::Error + 'static)) -> String {
    let kind = error
        .downcast_ref::<Error>()
        .map(Error::kind)
        .unwrap_or(ErrorKind::Internal);
    format!("[{kind}] {error}")
}
