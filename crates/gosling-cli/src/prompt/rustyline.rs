use anyhow::Result;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use super::renderer::separator;
use super::{completions, parse_input, Input, Prompt};

const PROMPT: &str = "\x1b[1m\x1b[34m❯ \x1b[0m";

/// Completes command names and, after `/model `, model names
pub struct CommandHelper;

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, _pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let candidates = completions(line)
            .into_iter()
            .map(|completion| Pair {
                display: completion.clone(),
                replacement: completion,
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {}

impl Validator for CommandHelper {}

impl Helper for CommandHelper {}

pub struct RustylinePrompt {
    editor: Editor<CommandHelper, DefaultHistory>,
}

impl RustylinePrompt {
    pub fn new() -> Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(CommandHelper));
        Ok(RustylinePrompt { editor })
    }
}

impl Prompt for RustylinePrompt {
    fn get_input(&mut self) -> Result<Input> {
        println!("{}", separator());
        let line = match self.editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(Input::Exit),
            Err(e) => {
                eprintln!("Input error: {}", e);
                return Ok(Input::Exit);
            }
        };
        println!("{}", separator());

        let line = line.trim();
        if !line.is_empty() {
            self.editor.add_history_entry(line)?;
        }
        Ok(parse_input(line))
    }
}
