use std::time::Duration;

use url::Url;

use super::base::ProviderFormat;

pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
pub const OPENROUTER_MESSAGES_URL: &str = "https://openrouter.ai/api/v1/messages";
pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const GEMINI_CHAT_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u32 = 8192;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// How the API key is presented to the upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `x-api-key: <key>`
    ApiKeyHeader,
    /// `authorization: Bearer <key>`
    Bearer,
}

/// Everything needed to reach one upstream with one model
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub format: ProviderFormat,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Accept invalid TLS certificates. Off unless explicitly requested.
    pub insecure_tls: bool,
}

impl ProviderConfig {
    pub fn new<U, K, M>(url: U, api_key: K, model: M, format: ProviderFormat) -> Self
    where
        U: Into<String>,
        K: Into<String>,
        M: Into<String>,
    {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
            format,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
            insecure_tls: false,
        }
    }

    pub fn anthropic(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(ANTHROPIC_MESSAGES_URL, api_key, model, ProviderFormat::Anthropic)
    }

    pub fn openrouter(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(OPENROUTER_MESSAGES_URL, api_key, model, ProviderFormat::Anthropic)
    }

    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(OPENAI_CHAT_URL, api_key, model, ProviderFormat::OpenAi)
    }

    pub fn gemini(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(GEMINI_CHAT_URL, api_key, model, ProviderFormat::OpenAi)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_insecure_tls(mut self, insecure_tls: bool) -> Self {
        self.insecure_tls = insecure_tls;
        self
    }

    /// Direct Anthropic access uses `x-api-key`; OpenRouter's Anthropic-format endpoint
    /// and every OpenAI-compatible endpoint take a bearer token.
    pub fn auth_style(&self) -> AuthStyle {
        let via_openrouter = Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(|host| host.contains("openrouter")))
            .unwrap_or(false);
        match self.format {
            ProviderFormat::Anthropic if !via_openrouter => AuthStyle::ApiKeyHeader,
            _ => AuthStyle::Bearer,
        }
    }

    /// Header pairs identifying and authenticating the request, content type excluded
    pub fn auth_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if self.format == ProviderFormat::Anthropic {
            headers.push(("anthropic-version", ANTHROPIC_VERSION.to_string()));
        }
        match self.auth_style() {
            AuthStyle::ApiKeyHeader => headers.push(("x-api-key", self.api_key.clone())),
            AuthStyle::Bearer => {
                headers.push(("authorization", format!("Bearer {}", self.api_key)))
            }
        }
        headers
    }
}
