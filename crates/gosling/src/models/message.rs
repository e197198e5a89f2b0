use serde::{Deserialize, Serialize};

use super::content::{ContentBlock, ToolResult, ToolUse};
use super::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
/// Content of a message: either plain text as typed, or an ordered list of blocks
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    pub fn is_empty(&self) -> bool {
        match self {
            MessageContent::Text(text) => text.is_empty(),
            MessageContent::Blocks(blocks) => blocks.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from an LLM
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// Create a user message holding plain text, the way a typed prompt is recorded
    pub fn user_text<S: Into<String>>(text: S) -> Self {
        Message {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create an empty user message to be filled with blocks
    pub fn user() -> Self {
        Message {
            role: Role::User,
            content: MessageContent::Blocks(Vec::new()),
        }
    }

    /// Create an empty assistant message to be filled with blocks
    pub fn assistant() -> Self {
        Message {
            role: Role::Assistant,
            content: MessageContent::Blocks(Vec::new()),
        }
    }

    /// Create an assistant message from decoded response blocks
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Message {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Add a block to the message. Plain text content is promoted to a text block first.
    pub fn with_block(mut self, block: ContentBlock) -> Self {
        self.content = match self.content {
            MessageContent::Blocks(mut blocks) => {
                blocks.push(block);
                MessageContent::Blocks(blocks)
            }
            MessageContent::Text(text) => {
                let mut blocks = Vec::new();
                if !text.is_empty() {
                    blocks.push(ContentBlock::text(text));
                }
                blocks.push(block);
                MessageContent::Blocks(blocks)
            }
        };
        self
    }

    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_block(ContentBlock::text(text))
    }

    pub fn with_tool_use<I: Into<String>, N: Into<String>>(
        self,
        id: I,
        name: N,
        input: serde_json::Value,
    ) -> Self {
        self.with_block(ContentBlock::tool_use(id, name, input))
    }

    pub fn with_tool_result<I: Into<String>, C: Into<String>>(self, tool_use_id: I, content: C) -> Self {
        self.with_block(ContentBlock::tool_result(tool_use_id, content))
    }

    /// All blocks of the message; plain text content is viewed as a single text block
    pub fn blocks(&self) -> Vec<ContentBlock> {
        match &self.content {
            MessageContent::Text(text) => vec![ContentBlock::text(text.clone())],
            MessageContent::Blocks(blocks) => blocks.clone(),
        }
    }

    /// Concatenated text of the message
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| block.as_text())
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    pub fn tool_uses(&self) -> Vec<&ToolUse> {
        match &self.content {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::Blocks(blocks) => {
                blocks.iter().filter_map(|block| block.as_tool_use()).collect()
            }
        }
    }

    pub fn tool_results(&self) -> Vec<&ToolResult> {
        match &self.content {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| block.as_tool_result())
                .collect(),
        }
    }

    pub fn has_tool_use(&self) -> bool {
        !self.tool_uses().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::{json, Value};

    #[test]
    fn test_user_text_message() {
        let message = Message::user_text("abcd");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.text(), "abcd");
        assert!(!message.has_tool_use());
    }

    #[test]
    fn test_with_block_promotes_plain_text() {
        let message = Message::user_text("look").with_tool_result("t1", "done");
        assert_eq!(
            message.blocks(),
            vec![
                ContentBlock::text("look"),
                ContentBlock::tool_result("t1", "done")
            ]
        );
    }

    #[test]
    fn test_tool_accessors() {
        let message = Message::assistant()
            .with_text("Using tool")
            .with_tool_use("1", "bash", json!({"cmd": "ls"}))
            .with_tool_use("2", "read", json!({"path": "a"}));

        let tool_uses = message.tool_uses();
        assert_eq!(tool_uses.len(), 2);
        assert_eq!(tool_uses[1].name, "read");
        assert_eq!(message.text(), "Using tool");
        assert!(message.tool_results().is_empty());
    }

    #[test]
    fn test_serialization_matches_anthropic_shape() -> Result<()> {
        let message = Message::user_text("Hello, world!");
        let json_value: Value = serde_json::to_value(&message)?;
        assert_eq!(json_value, json!({"role": "user", "content": "Hello, world!"}));

        let message = Message::assistant()
            .with_text("Using tool")
            .with_tool_use("test_id", "test_tool", json!({"key": "value"}));
        let serialized = serde_json::to_string(&message)?;
        let deserialized: Message = serde_json::from_str(&serialized)?;
        assert_eq!(deserialized, message);

        let json_value: Value = serde_json::from_str(&serialized)?;
        assert_eq!(json_value["role"], "assistant");
        assert_eq!(json_value["content"][1]["type"], "tool_use");
        assert!(json_value.get("created").is_none());
        Ok(())
    }

    #[test]
    fn test_deserialize_string_and_array_content() -> Result<()> {
        let messages: Vec<Message> = serde_json::from_value(json!([
            {"role": "user", "content": "list files"},
            {"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": "t1", "content": "a\nb"}
            ]}
        ]))?;

        assert_eq!(messages[0].content, MessageContent::Text("list files".to_string()));
        assert_eq!(messages[1].tool_results()[0].tool_use_id, "t1");
        Ok(())
    }
}
