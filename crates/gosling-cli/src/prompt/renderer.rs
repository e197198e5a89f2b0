use std::io::{self, Write};
use std::path::Path;

use console::style;
use gosling::agent::ReplyObserver;
use gosling::models::content::ToolUse;
use serde_json::Value;

use super::spinner::Spinner;

const RESULT_PREVIEW_CHARS: usize = 60;
const ARGUMENT_PREVIEW_CHARS: usize = 50;
const SEPARATOR_WIDTH: usize = 80;

pub fn separator() -> String {
    style("─".repeat(SEPARATOR_WIDTH)).dim().to_string()
}

pub fn print_banner(model: &str, cwd: &Path) {
    println!("{} | {} | {}", style("gosling").bold(), model, cwd.display());
}

pub fn print_help() {
    println!("{}", style("Available commands:").dim());
    println!("{}", style("  /model <name>  - Switch LLM model").dim());
    println!("{}", style("  /save <file>   - Save conversation to JSON").dim());
    println!("{}", style("  /load <file>   - Load conversation from JSON").dim());
    println!("{}", style("  /c             - Clear current conversation context").dim());
    println!("{}", style("  /q or /exit    - Quit application").dim());
    println!("{}", style("  Ctrl+C         - Interrupt a reply and forget the last message").dim());
    println!();
}

pub fn print_success(message: &str) {
    println!("{}", style(format!("⏺ {message}")).green());
}

pub fn print_error(message: &str) {
    println!("{}", style(format!("⏺ {message}")).red());
}

/// First argument value of a tool call, serialized and cut to 50 characters
pub fn argument_preview(input: &Value) -> String {
    input
        .as_object()
        .and_then(|arguments| arguments.values().next())
        .map(|value| value.to_string().chars().take(ARGUMENT_PREVIEW_CHARS).collect())
        .unwrap_or_default()
}

/// One-line summary of a tool result
pub fn result_preview(result: &str) -> String {
    match result.find('\n') {
        Some(newline) => {
            let first_line: String = result[..newline].chars().take(RESULT_PREVIEW_CHARS).collect();
            format!("{first_line} ... + lines")
        }
        None if result.chars().count() > RESULT_PREVIEW_CHARS => {
            let head: String = result.chars().take(RESULT_PREVIEW_CHARS).collect();
            format!("{head}...")
        }
        None => result.to_string(),
    }
}

/// Draws a reply as it streams: spinner while waiting, text as it arrives,
/// one line per tool call and per tool result.
#[derive(Default)]
pub struct TerminalRenderer {
    spinner: Option<Spinner>,
    printed_prefix: bool,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn stop_spinner(&mut self) {
        if let Some(mut spinner) = self.spinner.take() {
            spinner.stop();
        }
    }

    fn end_text(&mut self) {
        if self.printed_prefix {
            println!();
            self.printed_prefix = false;
        }
    }

    /// Called once the reply is over, however it ended
    pub fn finish(&mut self) {
        self.stop_spinner();
        self.end_text();
        let _ = io::stdout().flush();
    }
}

impl ReplyObserver for TerminalRenderer {
    fn on_request(&mut self) {
        self.stop_spinner();
        self.end_text();
        self.spinner = Some(Spinner::start());
    }

    fn on_text(&mut self, text: &str) {
        self.stop_spinner();
        if !self.printed_prefix {
            print!("\n{} ", style("⏺").cyan());
            self.printed_prefix = true;
        }
        print!("{text}");
        let _ = io::stdout().flush();
    }

    fn on_tool_call(&mut self, tool_use: &ToolUse) {
        self.stop_spinner();
        self.end_text();
        println!(
            "\n{}({})",
            style(format!("⏺ {}", tool_use.name)).green(),
            style(argument_preview(&tool_use.input)).dim()
        );
    }

    fn on_tool_result(&mut self, _tool_use: &ToolUse, result: &str) {
        println!("  {}", style(format!("⎿  {}", result_preview(result))).dim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_argument_preview() {
        assert_eq!(argument_preview(&json!({"cmd": "ls -la", "timeout": 5})), "\"ls -la\"");
        assert_eq!(argument_preview(&json!({})), "");
        assert_eq!(argument_preview(&json!({"n": 3})), "3");

        let long = "x".repeat(80);
        assert_eq!(argument_preview(&json!({ "content": long })).chars().count(), 50);
    }

    #[test]
    fn test_result_preview() {
        assert_eq!(result_preview("ok"), "ok");
        assert_eq!(result_preview("   1| hello\n   2| world\n"), "   1| hello ... + lines");

        let long = "é".repeat(70);
        assert_eq!(result_preview(&long), format!("{}...", "é".repeat(60)));

        let wide_first_line = format!("{}\nrest", "a".repeat(70));
        assert_eq!(result_preview(&wide_first_line), format!("{} ... + lines", "a".repeat(60)));
    }
}
