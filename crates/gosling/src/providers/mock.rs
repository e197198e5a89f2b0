use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::base::{Provider, TextSink};
use super::errors::ProviderError;
use crate::models::content::ContentBlock;
use crate::models::message::Message;
use crate::models::tool::Tool;

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Result<Vec<ContentBlock>, ProviderError>>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Vec<ContentBlock>>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(responses: Vec<Result<Vec<ContentBlock>, ProviderError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The conversation as it was sent on each call so far
    pub fn requests(&self) -> Arc<Mutex<Vec<Vec<Message>>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn model(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        _system: &str,
        messages: &[Message],
        _tools: &[Tool],
        on_text: Option<TextSink<'_>>,
    ) -> Result<Vec<ContentBlock>, ProviderError> {
        self.requests.lock().unwrap().push(messages.to_vec());

        let next = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                // Return empty response if no more pre-configured responses
                Ok(Vec::new())
            } else {
                responses.remove(0)
            }
        };

        if let (Ok(blocks), Some(on_text)) = (&next, on_text) {
            for text in blocks.iter().filter_map(ContentBlock::as_text) {
                on_text(text);
            }
        }
        next
    }
}
