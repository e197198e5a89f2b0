//! Incremental decoding of server-sent event streams into canonical content blocks.
//!
//! Bytes arrive in arbitrary chunks. [`LineBuffer`] reassembles them into complete
//! lines, [`StreamDecoder`] picks out the `data:` payloads and hands each JSON event to
//! the format-specific rules, which fold it into a [`StreamAccumulator`].

use serde_json::Value;

use super::base::ProviderFormat;
use super::utils::parse_tool_arguments;
use crate::models::content::{ContentBlock, ToolUse};

/// Splits a byte stream into `\n`-terminated lines.
///
/// Lines are decoded only once complete, so a multi-byte character split across two
/// chunks survives intact. Bytes already searched for a newline are not searched again.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without terminators
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut cursor = self.scanned;
        while let Some(offset) = self.pending[cursor..].iter().position(|b| *b == b'\n') {
            let end = cursor + offset;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
            cursor = start;
        }

        self.pending.drain(..start);
        self.scanned = self.pending.len();
        lines
    }

    /// Take whatever is left once the stream has ended
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// The payload of an SSE `data:` line, if this is one
fn sse_data(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data))
}

/// A tool call whose arguments are still arriving
#[derive(Debug, Clone, PartialEq)]
pub struct OpenToolCall {
    pub id: String,
    pub name: String,
    pub partial_args: String,
}

/// Streaming state for one response
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    pub final_text: String,
    pub completed: Vec<ToolUse>,
    open: Option<OpenToolCall>,
}

impl StreamAccumulator {
    /// Record a text fragment and forward it to the caller
    pub fn push_text(&mut self, fragment: &str, on_text: &mut dyn FnMut(&str)) {
        if fragment.is_empty() {
            return;
        }
        self.final_text.push_str(fragment);
        on_text(fragment);
    }

    /// Start collecting a new tool call, discarding any unfinished one
    pub fn open_tool<I: Into<String>, N: Into<String>>(&mut self, id: I, name: N) {
        self.open = Some(OpenToolCall {
            id: id.into(),
            name: name.into(),
            partial_args: String::new(),
        });
    }

    pub fn open(&self) -> Option<&OpenToolCall> {
        self.open.as_ref()
    }

    pub fn open_mut(&mut self) -> Option<&mut OpenToolCall> {
        self.open.as_mut()
    }

    /// Append an argument fragment to the open tool call; ignored when none is open
    pub fn append_args(&mut self, fragment: &str) {
        if let Some(open) = self.open.as_mut() {
            open.partial_args.push_str(fragment);
        }
    }

    /// Close the open tool call, parsing its collected arguments
    pub fn finalize_open(&mut self) {
        if let Some(open) = self.open.take() {
            let input = parse_tool_arguments(&open.id, &open.partial_args);
            self.completed.push(ToolUse {
                id: open.id,
                name: open.name,
                input,
            });
        }
    }

    /// Text first (when any arrived), then tool uses in the order they were closed
    pub fn into_blocks(self) -> Vec<ContentBlock> {
        let mut blocks = Vec::with_capacity(self.completed.len() + 1);
        if !self.final_text.is_empty() {
            blocks.push(ContentBlock::text(self.final_text));
        }
        blocks.extend(self.completed.into_iter().map(ContentBlock::ToolUse));
        blocks
    }
}

/// Turns raw response bytes into canonical content blocks for one format
#[derive(Debug)]
pub struct StreamDecoder {
    format: ProviderFormat,
    lines: LineBuffer,
    acc: StreamAccumulator,
}

impl StreamDecoder {
    pub fn new(format: ProviderFormat) -> Self {
        Self {
            format,
            lines: LineBuffer::new(),
            acc: StreamAccumulator::default(),
        }
    }

    pub fn format(&self) -> ProviderFormat {
        self.format
    }

    /// Consume one chunk of the body. Text fragments are reported through `on_text`
    /// as soon as the line carrying them is complete.
    pub fn feed(&mut self, chunk: &[u8], on_text: &mut dyn FnMut(&str)) {
        for line in self.lines.push(chunk) {
            self.handle_line(&line, on_text);
        }
    }

    /// End of stream: process any unterminated last line and assemble the blocks
    pub fn finish(mut self, on_text: &mut dyn FnMut(&str)) -> Vec<ContentBlock> {
        if let Some(line) = self.lines.finish() {
            self.handle_line(&line, on_text);
        }
        self.format.end_of_stream(&mut self.acc);
        self.acc.into_blocks()
    }

    fn handle_line(&mut self, line: &str, on_text: &mut dyn FnMut(&str)) {
        let Some(data) = sse_data(line) else {
            return;
        };
        if data == "[DONE]" {
            return;
        }

        match serde_json::from_str::<Value>(data) {
            Ok(event) if event.is_object() => {
                self.format.apply_event(&event, &mut self.acc, on_text)
            }
            Ok(_) => tracing::trace!(data, "skipping non-object stream event"),
            Err(error) => tracing::trace!(data, %error, "skipping malformed stream event"),
        }
    }
}
