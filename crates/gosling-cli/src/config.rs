use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment};
use gosling::providers::configs::{ProviderConfig, DEFAULT_MAX_TOKENS, DEFAULT_TIMEOUT};
use gosling::providers::factory::{config_for_model, ApiKeys};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";
pub const DEFAULT_OPENROUTER_MODEL: &str = "anthropic/claude-3-7-sonnet";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Must set GEMINI_API_KEY, OPENROUTER_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY in environment.")]
    MissingApiKey,

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Everything the CLI reads from the environment
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub openrouter_api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(rename = "gosling_max_tokens", default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(rename = "gosling_timeout_secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(rename = "gosling_insecure_tls", default)]
    pub insecure_tls: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            openai_api_key: None,
            gemini_api_key: None,
            openrouter_api_key: None,
            model: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            insecure_tls: false,
        }
    }
}

impl Settings {
    /// Read settings from the process environment and check that at least one key is set.
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("gosling_max_tokens", i64::from(default_max_tokens()))?
            .set_default("gosling_timeout_secs", default_timeout_secs() as i64)?
            .set_default("gosling_insecure_tls", false)?
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        let settings: Settings = config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            ConfigError::Other(err)
        })?;

        if settings.api_keys().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(settings)
    }

    pub fn api_keys(&self) -> ApiKeys {
        ApiKeys {
            anthropic: self.anthropic_api_key.clone(),
            openai: self.openai_api_key.clone(),
            gemini: self.gemini_api_key.clone(),
            openrouter: self.openrouter_api_key.clone(),
        }
    }

    /// The model a session starts with: the flag, then `MODEL`, then a default
    /// matching whichever keys are present.
    pub fn initial_model(&self, flag: Option<&str>) -> String {
        if let Some(model) = flag.filter(|model| !model.is_empty()) {
            return model.to_string();
        }
        if let Some(model) = self.model.as_deref().filter(|model| !model.is_empty()) {
            return model.to_string();
        }

        let keys = self.api_keys();
        let has = |key: &Option<String>| key.as_deref().is_some_and(|key| !key.is_empty());
        if has(&keys.openrouter) {
            DEFAULT_OPENROUTER_MODEL.to_string()
        } else if has(&keys.gemini) && !has(&keys.anthropic) {
            DEFAULT_GEMINI_MODEL.to_string()
        } else if has(&keys.openai) && !has(&keys.anthropic) {
            DEFAULT_OPENAI_MODEL.to_string()
        } else {
            DEFAULT_MODEL.to_string()
        }
    }

    /// Provider configuration for `model`, with the limits from the environment applied
    pub fn provider_config(&self, model: &str) -> anyhow::Result<ProviderConfig> {
        Ok(config_for_model(model, &self.api_keys())?
            .with_max_tokens(self.max_tokens)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_insecure_tls(self.insecure_tls))
    }
}

/// Load `~/.goslingrc`, `./.goslingrc` and `./.env` into the environment.
/// Variables that are already set keep their values.
pub fn load_env_files() {
    let mut files: Vec<PathBuf> = Vec::new();
    if let Some(home) = dirs::home_dir() {
        files.push(home.join(".goslingrc"));
    }
    files.push(PathBuf::from(".goslingrc"));
    files.push(PathBuf::from(".env"));

    for file in files {
        match dotenv::from_path(&file) {
            Ok(()) => tracing::debug!(file = %file.display(), "loaded environment file"),
            Err(dotenv::Error::Io(_)) => {}
            Err(err) => tracing::warn!(file = %file.display(), "skipping environment file: {err}"),
        }
    }
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
