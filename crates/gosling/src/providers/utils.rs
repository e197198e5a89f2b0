use serde_json::{json, Map, Value};

use crate::models::content::ContentBlock;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::Tool;

/// Convert internal Message format to OpenAI's chat completions message list.
///
/// Tool results become one `tool` message each. Text typed alongside them stays a
/// `user` message placed ahead of them.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        match (&message.role, &message.content) {
            (role, MessageContent::Text(text)) => {
                messages_spec.push(json!({"role": role.as_str(), "content": text}));
            }
            (Role::Assistant, MessageContent::Blocks(blocks)) => {
                messages_spec.push(assistant_to_openai_spec(blocks));
            }
            (_, MessageContent::Blocks(blocks)) => {
                let text: String = blocks.iter().filter_map(ContentBlock::as_text).collect();
                if !text.is_empty() {
                    messages_spec.push(json!({"role": "user", "content": text}));
                }
                for result in blocks.iter().filter_map(ContentBlock::as_tool_result) {
                    messages_spec.push(json!({
                        "role": "tool",
                        "tool_call_id": result.tool_use_id,
                        "content": result.content,
                    }));
                }
            }
        }
    }

    messages_spec
}

fn assistant_to_openai_spec(blocks: &[ContentBlock]) -> Value {
    let mut converted = Map::new();
    converted.insert("role".to_string(), json!("assistant"));

    let text: String = blocks.iter().filter_map(ContentBlock::as_text).collect();
    if !text.is_empty() {
        converted.insert("content".to_string(), json!(text));
    }

    let tool_calls: Vec<Value> = blocks
        .iter()
        .filter_map(ContentBlock::as_tool_use)
        .map(|tool_use| {
            json!({
                "id": tool_use.id,
                "type": "function",
                "function": {
                    "name": tool_use.name,
                    "arguments": tool_use.input.to_string(),
                }
            })
        })
        .collect();
    if !tool_calls.is_empty() {
        converted.insert("tool_calls".to_string(), Value::Array(tool_calls));
    }

    Value::Object(converted)
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                }
            })
        })
        .collect()
}

/// Parse the accumulated argument text of a tool call.
///
/// Empty text means no arguments. Text that is not valid JSON is logged and also
/// treated as no arguments, so the tool reports the missing fields itself.
pub fn parse_tool_arguments(id: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(tool_use_id = id, %error, arguments = raw, "could not parse tool arguments");
            json!({})
        }
    }
}
