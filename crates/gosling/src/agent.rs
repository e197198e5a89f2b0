use crate::errors::{AgentError, AgentResult};
use crate::models::content::ToolUse;
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::Provider;
use crate::systems::System;

pub const DEFAULT_SYSTEM_PROMPT: &str = "Concise coding assistant.";

/// Receives progress of a reply as it happens. The agent never renders anything itself.
pub trait ReplyObserver: Send {
    /// A request is about to be sent upstream
    fn on_request(&mut self) {}

    /// A streamed fragment of assistant text
    fn on_text(&mut self, _text: &str) {}

    /// A tool call is about to be dispatched
    fn on_tool_call(&mut self, _tool_use: &ToolUse) {}

    /// A tool call finished; `result` is exactly what is sent back to the model
    fn on_tool_result(&mut self, _tool_use: &ToolUse, _result: &str) {}
}

impl ReplyObserver for () {}

/// Agent integrates a foundational LLM with the systems it needs to pilot
pub struct Agent {
    systems: Vec<Box<dyn System>>,
    provider: Box<dyn Provider>,
    system_prompt: String,
}

impl Agent {
    /// Create a new Agent with the specified provider
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            systems: Vec::new(),
            provider,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Add a system to the agent
    pub fn add_system(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// Swap the provider, e.g. after the model changed. The conversation is untouched.
    pub fn set_provider(&mut self, provider: Box<dyn Provider>) {
        self.provider = provider;
    }

    /// Tools of all systems, in registration order
    pub fn tools(&self) -> Vec<Tool> {
        self.systems
            .iter()
            .flat_map(|system| system.tools().iter().cloned())
            .collect()
    }

    fn get_system_for_tool(&self, name: &str) -> Option<&dyn System> {
        self.systems
            .iter()
            .find(|system| system.tools().iter().any(|tool| tool.name == name))
            .map(|system| system.as_ref())
    }

    /// Dispatch a single tool call to the system that provides it
    pub async fn dispatch_tool_call(&self, tool_call: ToolCall) -> AgentResult<String> {
        let system = self
            .get_system_for_tool(&tool_call.name)
            .ok_or_else(|| AgentError::ToolNotFound(tool_call.name.clone()))?;
        tracing::debug!(system = system.name(), tool = %tool_call.name, "dispatching tool call");
        system.call(tool_call).await
    }

    /// Run one user turn to completion.
    ///
    /// The last message of `messages` is expected to be the user's. Each round sends the
    /// conversation, records the assistant response and, if it asked for tools, runs
    /// them in order and records their results. The turn ends with the first response
    /// that asks for no tools. Provider failures end the turn with an error; whatever
    /// was appended before the failure stays in `messages`.
    pub async fn reply(
        &self,
        messages: &mut Vec<Message>,
        observer: &mut dyn ReplyObserver,
    ) -> AgentResult<()> {
        let tools = self.tools();

        loop {
            observer.on_request();
            let blocks = {
                let mut on_text = |text: &str| observer.on_text(text);
                self.provider
                    .complete(&self.system_prompt, messages, &tools, Some(&mut on_text))
                    .await?
            };

            let response = Message::assistant_blocks(blocks);
            let tool_uses: Vec<ToolUse> = response.tool_uses().into_iter().cloned().collect();
            if !response.content.is_empty() {
                messages.push(response);
            }
            if tool_uses.is_empty() {
                return Ok(());
            }

            let mut results = Message::user();
            for tool_use in &tool_uses {
                observer.on_tool_call(tool_use);
                let call = ToolCall::new(&tool_use.name, tool_use.input.clone());
                let output = match self.dispatch_tool_call(call).await {
                    Ok(output) => output,
                    Err(error) => {
                        tracing::warn!(tool = %tool_use.name, %error, "tool call failed");
                        format!("error: {error}")
                    }
                };
                observer.on_tool_result(tool_use, &output);
                results = results.with_tool_result(&tool_use.id, output);
            }
            messages.push(results);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::ContentBlock;
    use crate::providers::errors::ProviderError;
    use crate::providers::mock::MockProvider;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoSystem {
        tools: Vec<Tool>,
    }

    impl EchoSystem {
        fn new() -> Self {
            Self {
                tools: vec![Tool::new("echo", "Echo the text", json!({"type": "object"}))],
            }
        }
    }

    #[async_trait]
    impl System for EchoSystem {
        fn name(&self) -> &str {
            "EchoSystem"
        }

        fn tools(&self) -> &[Tool] {
            &self.tools
        }

        async fn call(&self, tool_call: ToolCall) -> AgentResult<String> {
            tool_call.arguments["text"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| AgentError::InvalidParameters("missing 'text' parameter".into()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ReplyObserver for Recorder {
        fn on_request(&mut self) {
            self.events.push("request".to_string());
        }

        fn on_text(&mut self, text: &str) {
            self.events.push(format!("text:{text}"));
        }

        fn on_tool_call(&mut self, tool_use: &ToolUse) {
            self.events.push(format!("call:{}", tool_use.name));
        }

        fn on_tool_result(&mut self, _tool_use: &ToolUse, result: &str) {
            self.events.push(format!("result:{result}"));
        }
    }

    fn agent_with(responses: Vec<Vec<ContentBlock>>) -> Agent {
        Agent::new(Box::new(MockProvider::new(responses)))
    }

    #[tokio::test]
    async fn test_reply_runs_tools_until_done() -> Result<()> {
        let provider = MockProvider::new(vec![
            vec![
                ContentBlock::text("Echoing"),
                ContentBlock::tool_use("t1", "echo", json!({"text": "hi"})),
            ],
            vec![ContentBlock::text("Done")],
        ]);
        let requests = provider.requests();
        let mut agent = Agent::new(Box::new(provider));
        agent.add_system(Box::new(EchoSystem::new()));

        let mut messages = vec![Message::user_text("say hi")];
        let mut recorder = Recorder::default();
        agent.reply(&mut messages, &mut recorder).await?;

        assert_eq!(
            recorder.events,
            vec![
                "request",
                "text:Echoing",
                "call:echo",
                "result:hi",
                "request",
                "text:Done"
            ]
        );
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].tool_results()[0].tool_use_id, "t1");
        assert_eq!(messages[2].tool_results()[0].content, "hi");
        assert_eq!(messages[3].text(), "Done");

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_back() -> Result<()> {
        let mut agent = agent_with(vec![
            vec![
                ContentBlock::tool_use("a", "fetch_url", json!({})),
                ContentBlock::tool_use("b", "echo", json!({})),
            ],
            vec![ContentBlock::text("ok")],
        ]);
        agent.add_system(Box::new(EchoSystem::new()));

        let mut messages = vec![Message::user_text("go")];
        agent.reply(&mut messages, &mut ()).await?;

        let results = messages[2].tool_results();
        assert_eq!(results[0].content, "error: unknown tool fetch_url");
        assert_eq!(results[1].content, "error: invalid parameters: missing 'text' parameter");
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_response_is_not_recorded() -> Result<()> {
        let agent = agent_with(vec![vec![]]);
        let mut messages = vec![Message::user_text("hello")];
        agent.reply(&mut messages, &mut ()).await?;
        assert_eq!(messages, vec![Message::user_text("hello")]);
        Ok(())
    }

    #[tokio::test]
    async fn test_provider_error_ends_turn() {
        let provider = MockProvider::with_results(vec![Err(ProviderError::HttpStatus {
            code: 500,
            body: "boom".into(),
        })]);
        let agent = Agent::new(Box::new(provider));
        let mut messages = vec![Message::user_text("hello")];

        let error = agent.reply(&mut messages, &mut ()).await.unwrap_err();
        assert!(matches!(
            error,
            AgentError::Provider(ProviderError::HttpStatus { code: 500, .. })
        ));
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_tools_are_flattened_in_order() {
        let mut agent = agent_with(vec![]);
        agent.add_system(Box::new(EchoSystem::new()));
        agent.add_system(Box::new(crate::developer::DeveloperSystem::with_root(".")));

        let names: Vec<String> = agent.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names[0], "echo");
        assert_eq!(names[1], "read");
        assert_eq!(names.len(), 7);
    }
}
