use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::ProviderError;
use super::stream::{StreamAccumulator, StreamDecoder};
use super::{anthropic, openai};
use crate::models::content::ContentBlock;
use crate::models::message::Message;
use crate::models::tool::Tool;

/// Everything a payload builder needs for one request
#[derive(Debug, Clone, Copy)]
pub struct PayloadRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub max_tokens: u32,
    pub messages: &'a [Message],
    pub tools: &'a [Tool],
    pub stream: bool,
}

/// The wire dialect of an upstream. This is the only place that branches on it;
/// everything downstream of the decoder and normalizer sees canonical blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFormat {
    Anthropic,
    OpenAi,
}

impl ProviderFormat {
    pub fn build_payload(&self, request: &PayloadRequest<'_>) -> Value {
        match self {
            ProviderFormat::Anthropic => anthropic::build_payload(request),
            ProviderFormat::OpenAi => openai::build_payload(request),
        }
    }

    pub fn decoder(&self) -> StreamDecoder {
        StreamDecoder::new(*self)
    }

    /// Convert a complete (non-streamed) response object into canonical blocks
    pub fn normalize_buffered(&self, response: &Value) -> Result<Vec<ContentBlock>, ProviderError> {
        match self {
            ProviderFormat::Anthropic => anthropic::normalize_response(response),
            ProviderFormat::OpenAi => openai::normalize_response(response),
        }
    }

    pub(crate) fn apply_event(
        &self,
        event: &Value,
        acc: &mut StreamAccumulator,
        on_text: &mut dyn FnMut(&str),
    ) {
        match self {
            ProviderFormat::Anthropic => anthropic::apply_event(event, acc, on_text),
            ProviderFormat::OpenAi => openai::apply_event(event, acc, on_text),
        }
    }

    /// Anthropic closes every block explicitly; OpenAI leaves the last tool call open
    pub(crate) fn end_of_stream(&self, acc: &mut StreamAccumulator) {
        if *self == ProviderFormat::OpenAi {
            acc.finalize_open();
        }
    }
}

/// Callback receiving streamed text fragments in arrival order
pub type TextSink<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Base trait for AI providers (Anthropic-format, OpenAI-format)
#[async_trait]
pub trait Provider: Send + Sync {
    /// The model every request is made against
    fn model(&self) -> &str;

    /// Generate the next assistant response.
    ///
    /// With `on_text` set the request is streamed and text fragments are delivered as
    /// they arrive; without it the response is read whole. Either way the returned
    /// blocks are text first, then tool uses.
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        on_text: Option<TextSink<'_>>,
    ) -> Result<Vec<ContentBlock>, ProviderError>;
}
