use serde_json::{json, Value};

use super::base::PayloadRequest;
use super::errors::ProviderError;
use super::stream::StreamAccumulator;
use super::utils::parse_tool_arguments;
use crate::models::content::ContentBlock;

/// Build a Messages API request. The canonical model already has the Anthropic wire
/// shape, so messages and tools pass through as they are.
pub fn build_payload(request: &PayloadRequest<'_>) -> Value {
    json!({
        "model": request.model,
        "max_tokens": request.max_tokens,
        "system": request.system,
        "tools": request.tools,
        "messages": request.messages,
        "stream": request.stream,
    })
}

/// Fold one streamed Messages API event into the accumulator
pub fn apply_event(event: &Value, acc: &mut StreamAccumulator, on_text: &mut dyn FnMut(&str)) {
    match event.get("type").and_then(Value::as_str) {
        Some("content_block_start") => {
            let block = &event["content_block"];
            if block.get("type").and_then(Value::as_str) == Some("tool_use") {
                let id = block.get("id").and_then(Value::as_str).unwrap_or_default();
                let name = block.get("name").and_then(Value::as_str).unwrap_or_default();
                acc.open_tool(id, name);
            }
        }
        Some("content_block_delta") => {
            let delta = &event["delta"];
            match delta.get("type").and_then(Value::as_str) {
                Some("text_delta") => {
                    if let Some(text) = delta.get("text").and_then(Value::as_str) {
                        acc.push_text(text, on_text);
                    }
                }
                Some("input_json_delta") => {
                    if let Some(partial) = delta.get("partial_json").and_then(Value::as_str) {
                        acc.append_args(partial);
                    }
                }
                _ => {}
            }
        }
        Some("content_block_stop") => acc.finalize_open(),
        _ => {}
    }
}

/// Convert a complete Messages API response into canonical blocks.
///
/// Only text and tool_use blocks are kept. Text is concatenated and moved ahead of
/// the tool uses.
pub fn normalize_response(response: &Value) -> Result<Vec<ContentBlock>, ProviderError> {
    let content = response
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::shape(format!("response has no content array: {response}")))?;

    let mut text = String::new();
    let mut tool_uses = Vec::new();
    for block in content {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                text.push_str(block.get("text").and_then(Value::as_str).unwrap_or_default());
            }
            Some("tool_use") => {
                let id = block.get("id").and_then(Value::as_str).unwrap_or_default();
                let name = block.get("name").and_then(Value::as_str).unwrap_or_default();
                let input = match block.get("input") {
                    Some(Value::String(raw)) => parse_tool_arguments(id, raw),
                    Some(input) if !input.is_null() => input.clone(),
                    _ => json!({}),
                };
                tool_uses.push(ContentBlock::tool_use(id, name, input));
            }
            other => tracing::debug!(block_type = ?other, "skipping unsupported content block"),
        }
    }

    let mut blocks = Vec::with_capacity(tool_uses.len() + 1);
    if !text.is_empty() {
        blocks.push(ContentBlock::text(text));
    }
    blocks.extend(tool_uses);
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Message;
    use crate::models::tool::Tool;
    use anyhow::Result;

    fn events(lines: &[Value]) -> (StreamAccumulator, String) {
        let mut acc = StreamAccumulator::default();
        let mut seen = String::new();
        for line in lines {
            apply_event(line, &mut acc, &mut |t| seen.push_str(t));
        }
        (acc, seen)
    }

    #[test]
    fn test_build_payload_passthrough() -> Result<()> {
        let messages = vec![
            Message::user_text("list files"),
            Message::assistant().with_tool_use("t1", "bash", json!({"cmd": "ls"})),
            Message::user().with_tool_result("t1", "a.txt"),
        ];
        let tools = vec![Tool::new("bash", "Run command", json!({"type": "object"}))];
        let payload = build_payload(&PayloadRequest {
            model: "claude-3-7-sonnet-20250219",
            system: "Concise coding assistant.",
            max_tokens: 8192,
            messages: &messages,
            tools: &tools,
            stream: true,
        });

        assert_eq!(payload["model"], "claude-3-7-sonnet-20250219");
        assert_eq!(payload["max_tokens"], 8192);
        assert_eq!(payload["system"], "Concise coding assistant.");
        assert_eq!(payload["stream"], true);
        assert_eq!(payload["tools"], serde_json::to_value(&tools)?);
        assert_eq!(payload["messages"], serde_json::to_value(&messages)?);
        assert_eq!(payload["messages"][0]["content"], "list files");
        Ok(())
    }

    #[test]
    fn test_stream_text_and_tool() {
        let (acc, seen) = events(&[
            json!({"type": "message_start", "message": {"id": "m"}}),
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
            json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "Hel"}}),
            json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "lo"}}),
            json!({"type": "content_block_stop", "index": 0}),
            json!({"type": "content_block_start", "content_block": {"type": "tool_use", "id": "t1", "name": "read"}}),
            json!({"type": "content_block_delta", "delta": {"type": "input_json_delta", "partial_json": "{\"path\""}}),
            json!({"type": "content_block_delta", "delta": {"type": "input_json_delta", "partial_json": ":\"x\"}"}}),
            json!({"type": "content_block_stop"}),
            json!({"type": "message_stop"}),
        ]);

        assert_eq!(seen, "Hello");
        assert_eq!(
            acc.into_blocks(),
            vec![
                ContentBlock::text("Hello"),
                ContentBlock::tool_use("t1", "read", json!({"path": "x"}))
            ]
        );
    }

    #[test]
    fn test_stream_tool_without_arguments() {
        let (acc, _) = events(&[
            json!({"type": "content_block_start", "content_block": {"type": "tool_use", "id": "t1", "name": "bash"}}),
            json!({"type": "content_block_stop"}),
        ]);
        assert_eq!(acc.completed[0].input, json!({}));
    }

    #[test]
    fn test_stream_unclosed_tool_is_dropped() {
        let (acc, _) = events(&[json!({
            "type": "content_block_start",
            "content_block": {"type": "tool_use", "id": "t1", "name": "bash"}
        })]);
        assert!(acc.completed.is_empty());
        assert!(acc.open().is_some());
    }

    #[test]
    fn test_normalize_rearranges_text_first() -> Result<()> {
        let response = json!({
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Let me "},
                {"type": "tool_use", "id": "t1", "name": "glob", "input": {"pat": "*.rs"}},
                {"type": "text", "text": "check."}
            ]
        });
        let blocks = normalize_response(&response)?;
        assert_eq!(
            blocks,
            vec![
                ContentBlock::text("Let me check."),
                ContentBlock::tool_use("t1", "glob", json!({"pat": "*.rs"}))
            ]
        );
        Ok(())
    }

    #[test]
    fn test_normalize_requires_content_array() {
        let error = normalize_response(&json!({"id": "x"})).unwrap_err();
        assert!(matches!(error, ProviderError::ProtocolShape { .. }));
    }
}
