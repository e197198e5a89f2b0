use async_trait::async_trait;

use super::base::{PayloadRequest, Provider, TextSink};
use super::configs::ProviderConfig;
use super::errors::ProviderError;
use super::transport::Transport;
use crate::models::content::ContentBlock;
use crate::models::message::Message;
use crate::models::tool::Tool;

/// Talks to one configured upstream: payload, transport, then decoder or normalizer
pub struct ProviderClient {
    config: ProviderConfig,
    transport: Transport,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let transport = Transport::new(&config)?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[async_trait]
impl Provider for ProviderClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        on_text: Option<TextSink<'_>>,
    ) -> Result<Vec<ContentBlock>, ProviderError> {
        let format = self.config.format;
        let payload = format.build_payload(&PayloadRequest {
            model: &self.config.model,
            system,
            max_tokens: self.config.max_tokens,
            messages,
            tools,
            stream: on_text.is_some(),
        });

        tracing::debug!(
            model = %self.config.model,
            ?format,
            messages = messages.len(),
            streaming = on_text.is_some(),
            "requesting completion"
        );

        match on_text {
            Some(on_text) => {
                self.transport
                    .send_streaming(&payload, format.decoder(), on_text)
                    .await
            }
            None => {
                let response = self.transport.send_buffered(&payload).await?;
                format.normalize_buffered(&response)
            }
        }
    }
}
