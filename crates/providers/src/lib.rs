//! Reasoning model providers for RustedScout.
//!
//! All providers implement the `rustedscout_core::Provider` trait.
//! [`build_from_config`] selects the backend named by the configuration.

pub mod anthropic;

pub use anthropic::AnthropicProvider;

use rustedscout_config::AppConfig;
use rustedscout_core::error::ProviderError;
use rustedscout_core::provider::Provider;
use std::sync::Arc;

/// Build the configured provider.
///
/// A missing API key is reported as [`ProviderError::NotConfigured`] here,
/// before any turn starts.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    match config.default_provider.as_str() {
        "anthropic" => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ProviderError::NotConfigured(
                    "no API key; set ANTHROPIC_API_KEY or api_key in config.toml".into(),
                )
            })?;
            tracing::debug!(model = %config.default_model, "Using Anthropic provider");
            Ok(Arc::new(AnthropicProvider::new(api_key)?))
        }
        other => Err(ProviderError::NotConfigured(format!(
            "unknown provider '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_not_configured() {
        let config = AppConfig::default();
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = AppConfig {
            api_key: Some("k".into()),
            default_provider: "carrier-pigeon".into(),
            ..AppConfig::default()
        };
        let err = build_from_config(&config).err().unwrap();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn anthropic_built_with_key() {
        let config = AppConfig {
            api_key: Some("sk-ant-test".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }
}
