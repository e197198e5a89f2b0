use anyhow::{anyhow, Result};

use super::base::Provider;
use super::client::ProviderClient;
use super::configs::ProviderConfig;

/// The upstream a model name is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenRouter,
    Gemini,
    OpenAi,
    Anthropic,
}

impl ProviderType {
    /// Pick the upstream from the model name alone
    pub fn for_model(model: &str) -> Self {
        if model.contains('/') {
            ProviderType::OpenRouter
        } else if model.contains("gemini") || model.contains("learnlm") {
            ProviderType::Gemini
        } else if model.contains("gpt-") || ["o1", "o3", "o4"].iter().any(|p| model.starts_with(p)) {
            ProviderType::OpenAi
        } else {
            ProviderType::Anthropic
        }
    }

    /// Environment variable holding this upstream's key
    pub fn key_var(&self) -> &'static str {
        match self {
            ProviderType::OpenRouter => "OPENROUTER_API_KEY",
            ProviderType::Gemini => "GEMINI_API_KEY",
            ProviderType::OpenAi => "OPENAI_API_KEY",
            ProviderType::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Static API keys, one per upstream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    pub anthropic: Option<String>,
    pub openai: Option<String>,
    pub gemini: Option<String>,
    pub openrouter: Option<String>,
}

impl ApiKeys {
    pub fn get(&self, provider: ProviderType) -> Option<&str> {
        let key = match provider {
            ProviderType::OpenRouter => &self.openrouter,
            ProviderType::Gemini => &self.gemini,
            ProviderType::OpenAi => &self.openai,
            ProviderType::Anthropic => &self.anthropic,
        };
        key.as_deref().filter(|key| !key.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        [
            ProviderType::OpenRouter,
            ProviderType::Gemini,
            ProviderType::OpenAi,
            ProviderType::Anthropic,
        ]
        .into_iter()
        .all(|provider| self.get(provider).is_none())
    }
}

/// Configuration for `model` on the upstream its name routes to
pub fn config_for_model(model: &str, keys: &ApiKeys) -> Result<ProviderConfig> {
    let provider = ProviderType::for_model(model);
    let key = keys
        .get(provider)
        .ok_or_else(|| anyhow!("{} is not set, it is required for model {}", provider.key_var(), model))?;

    Ok(match provider {
        ProviderType::OpenRouter => ProviderConfig::openrouter(key, model),
        ProviderType::Gemini => ProviderConfig::gemini(key, model),
        ProviderType::OpenAi => ProviderConfig::openai(key, model),
        ProviderType::Anthropic => ProviderConfig::anthropic(key, model),
    })
}

pub fn get_provider(config: ProviderConfig) -> Result<Box<dyn Provider>> {
    Ok(Box::new(ProviderClient::new(config)?))
}
