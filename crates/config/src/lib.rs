//! Configuration loading, validation, and management for RustedScout.
//!
//! Loads configuration from `~/.rustedscout/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.rustedscout/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model backend
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature for the reasoning step
    #[serde(default)]
    pub default_temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Execution engine limits and timeouts
    #[serde(default)]
    pub engine: EngineSettings,

    /// Checkpoint storage
    #[serde(default)]
    pub store: StoreConfig,

    /// Web action settings
    #[serde(default)]
    pub actions: ActionsConfig,

    /// Final response formatting
    #[serde(default)]
    pub formatter: FormatterConfig,
}

fn default_provider() -> String {
    "anthropic".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_max_tokens() -> u32 {
    4096
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("engine", &self.engine)
            .field("store", &self.store)
            .field("actions", &self.actions)
            .field("formatter", &self.formatter)
            .finish()
    }
}

impl std::fmt::Debug for ActionsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionsConfig")
            .field("tavily_api_key", &redact(&self.tavily_api_key))
            .field("base_url", &self.base_url)
            .field("search_max_results", &self.search_max_results)
            .field("extract_depth", &self.extract_depth)
            .field("extract_content_limit", &self.extract_content_limit)
            .field("crawl_max_depth", &self.crawl_max_depth)
            .field("crawl_limit", &self.crawl_limit)
            .field("crawl_content_limit", &self.crawl_content_limit)
            .finish()
    }
}

/// What to do when a thread already has a run in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Fail fast with a thread-busy error
    #[default]
    Reject,
    /// Wait for the in-flight run to finish
    Queue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Reasoning passes allowed per run before formatting is forced
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    #[serde(default = "default_reasoning_timeout")]
    pub reasoning_timeout_secs: u64,

    #[serde(default = "default_action_timeout")]
    pub action_timeout_secs: u64,

    /// Overall bound for one run; derived from the other limits when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_timeout_secs: Option<u64>,

    /// Thread used when the caller names none
    #[serde(default = "default_thread_id")]
    pub default_thread_id: String,

    #[serde(default)]
    pub busy_policy: BusyPolicy,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_max_turns() -> u32 {
    10
}
fn default_reasoning_timeout() -> u64 {
    120
}
fn default_action_timeout() -> u64 {
    60
}
fn default_thread_id() -> String {
    "default".into()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            reasoning_timeout_secs: default_reasoning_timeout(),
            action_timeout_secs: default_action_timeout(),
            turn_timeout_secs: None,
            default_thread_id: default_thread_id(),
            busy_policy: BusyPolicy::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded exponential backoff for failed model calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    8_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

/// Which checkpoint backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Directory (file backend) or database file (sqlite backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// The configured path, or the backend's default under the config dir.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        match self.backend {
            StoreBackend::Sqlite => AppConfig::config_dir().join("threads.db"),
            StoreBackend::File | StoreBackend::Memory => AppConfig::config_dir().join("threads"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tavily_api_key: Option<String>,

    #[serde(default = "default_tavily_url")]
    pub base_url: String,

    #[serde(default = "default_search_max_results")]
    pub search_max_results: u32,

    #[serde(default = "default_extract_depth")]
    pub extract_depth: String,

    /// Characters of page content kept per extract result
    #[serde(default = "default_extract_limit")]
    pub extract_content_limit: usize,

    #[serde(default = "default_crawl_depth")]
    pub crawl_max_depth: u32,

    #[serde(default = "default_crawl_limit")]
    pub crawl_limit: u32,

    /// Characters of page content kept per crawled page
    #[serde(default = "default_crawl_content_limit")]
    pub crawl_content_limit: usize,
}

fn default_tavily_url() -> String {
    "https://api.tavily.com".into()
}
fn default_search_max_results() -> u32 {
    10
}
fn default_extract_depth() -> String {
    "basic".into()
}
fn default_extract_limit() -> usize {
    5_000
}
fn default_crawl_depth() -> u32 {
    2
}
fn default_crawl_limit() -> u32 {
    20
}
fn default_crawl_content_limit() -> usize {
    4_000
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            base_url: default_tavily_url(),
            search_max_results: default_search_max_results(),
            extract_depth: default_extract_depth(),
            extract_content_limit: default_extract_limit(),
            crawl_max_depth: default_crawl_depth(),
            crawl_limit: default_crawl_limit(),
            crawl_content_limit: default_crawl_content_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// Upper bound on entries in the Sources section
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
}

fn default_max_sources() -> usize {
    20
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_sources: default_max_sources(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location.
    ///
    /// Also checks environment variables:
    /// - `RUSTEDSCOUT_API_KEY`, then `ANTHROPIC_API_KEY` for the model key
    /// - `TAVILY_API_KEY` for the web actions
    /// - `RUSTEDSCOUT_MODEL`, then `MODEL_ID` for the model
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("RUSTEDSCOUT_API_KEY").or_else(|| lookup("ANTHROPIC_API_KEY"));
        }
        if self.actions.tavily_api_key.is_none() {
            self.actions.tavily_api_key = lookup("TAVILY_API_KEY");
        }
        if let Some(model) = lookup("RUSTEDSCOUT_MODEL").or_else(|| lookup("MODEL_ID")) {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".rustedscout")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.engine.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "engine.max_turns must be at least 1".into(),
            ));
        }
        if self.engine.reasoning_timeout_secs == 0 || self.engine.action_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "engine timeouts must be greater than zero".into(),
            ));
        }
        if self.engine.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "engine.retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.engine.default_thread_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "engine.default_thread_id must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Check if a model API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: 0.0,
            default_max_tokens: default_max_tokens(),
            engine: EngineSettings::default(),
            store: StoreConfig::default(),
            actions: ActionsConfig::default(),
            formatter: FormatterConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
