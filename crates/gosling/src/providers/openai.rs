use serde_json::{json, Value};

use super::base::PayloadRequest;
use super::errors::ProviderError;
use super::stream::StreamAccumulator;
use super::utils::{messages_to_openai_spec, parse_tool_arguments, tools_to_openai_spec};
use crate::models::content::ContentBlock;

/// Build a chat completions request, translating the conversation out of the
/// canonical (Anthropic-shaped) model. The system prompt leads the message list.
pub fn build_payload(request: &PayloadRequest<'_>) -> Value {
    let mut messages = vec![json!({"role": "system", "content": request.system})];
    messages.extend(messages_to_openai_spec(request.messages));

    json!({
        "model": request.model,
        "tools": tools_to_openai_spec(request.tools),
        "messages": messages,
        "stream": request.stream,
    })
}

/// Fold one streamed chat completions chunk into the accumulator.
///
/// A tool call delta carrying an id starts a new call unless it repeats the id of
/// the call already open. Argument fragments go to whichever call is open.
pub fn apply_event(event: &Value, acc: &mut StreamAccumulator, on_text: &mut dyn FnMut(&str)) {
    let Some(delta) = event
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("delta"))
        .filter(|delta| delta.is_object())
    else {
        return;
    };

    if let Some(text) = delta.get("content").and_then(Value::as_str) {
        acc.push_text(text, on_text);
    }

    let Some(tool_calls) = delta.get("tool_calls").and_then(Value::as_array) else {
        return;
    };
    for tool_call in tool_calls {
        let function = tool_call.get("function");
        let name = function
            .and_then(|f| f.get("name"))
            .and_then(Value::as_str);

        if let Some(id) = tool_call.get("id").and_then(Value::as_str) {
            if acc.open().map(|open| open.id.as_str()) != Some(id) {
                acc.finalize_open();
                acc.open_tool(id, name.unwrap_or_default());
            }
        }
        if let (Some(name), Some(open)) = (name, acc.open_mut()) {
            if open.name.is_empty() {
                open.name = name.to_string();
            }
        }
        if let Some(arguments) = function
            .and_then(|f| f.get("arguments"))
            .and_then(Value::as_str)
        {
            acc.append_args(arguments);
        }
    }
}

/// Convert a complete chat completions response into canonical blocks
pub fn normalize_response(response: &Value) -> Result<Vec<ContentBlock>, ProviderError> {
    let message = response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .filter(|message| message.is_object())
        .ok_or_else(|| ProviderError::shape(format!("response has no choices[0].message: {response}")))?;

    let mut blocks = Vec::new();
    if let Some(text) = message.get("content").and_then(Value::as_str) {
        if !text.is_empty() {
            blocks.push(ContentBlock::text(text));
        }
    }

    if let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) {
        for tool_call in tool_calls {
            let kind = tool_call.get("type").and_then(Value::as_str).unwrap_or("function");
            if kind != "function" {
                tracing::debug!(kind, "skipping non-function tool call");
                continue;
            }
            let id = tool_call.get("id").and_then(Value::as_str).unwrap_or_default();
            let function = &tool_call["function"];
            let name = function.get("name").and_then(Value::as_str).unwrap_or_default();
            let input = match function.get("arguments") {
                Some(Value::String(raw)) => parse_tool_arguments(id, raw),
                Some(Value::Object(arguments)) => Value::Object(arguments.clone()),
                _ => json!({}),
            };
            blocks.push(ContentBlock::tool_use(id, name, input));
        }
    }

    Ok(blocks)
}
