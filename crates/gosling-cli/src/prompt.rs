use anyhow::Result;

pub mod renderer;
pub mod rustyline;
pub mod spinner;

/// Models offered by completion after `/model `
pub const KNOWN_MODELS: [&str; 9] = [
    "gemini-2.5-flash",
    "gemini-2.5-pro",
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
    "gpt-4o",
    "gpt-4o-mini",
    "o1-preview",
    "o1-mini",
    "o3-mini",
];

/// Commands offered by completion for a leading `/`
pub const COMMANDS: [&str; 6] = ["/save ", "/load ", "/model ", "/c", "/q", "/exit"];

pub trait Prompt {
    fn get_input(&mut self) -> Result<Input>;
    fn close(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Nothing to do, ask again
    AskAgain,
    /// A message for the model
    Message(String),
    Exit,
    Clear,
    Help,
    SwitchModel(String),
    Save(String),
    Load(String),
}

/// Interpret one line typed at the prompt
pub fn parse_input(line: &str) -> Input {
    if line.is_empty() {
        return Input::AskAgain;
    }
    match line {
        "/q" | "/exit" | "exit" => return Input::Exit,
        "/c" => return Input::Clear,
        "/help" | "/?" => return Input::Help,
        _ => {}
    }

    let argument = |prefix: &str| {
        line.strip_prefix(prefix)
            .map(|rest| (!rest.is_empty()).then(|| rest.to_string()))
    };
    if let Some(model) = argument("/model ") {
        return model.map_or(Input::AskAgain, Input::SwitchModel);
    }
    if let Some(file) = argument("/save ") {
        return file.map_or(Input::AskAgain, Input::Save);
    }
    if let Some(file) = argument("/load ") {
        return file.map_or(Input::AskAgain, Input::Load);
    }
    Input::Message(line.to_string())
}

/// Completions for `line`, each replacing the whole line
pub fn completions(line: &str) -> Vec<String> {
    if line.is_empty() {
        return Vec::new();
    }
    if let Some(prefix) = line.strip_prefix("/model ") {
        return KNOWN_MODELS
            .iter()
            .filter(|model| model.starts_with(prefix))
            .map(|model| format!("/model {model}"))
            .collect();
    }
    if line.starts_with('/') {
        return COMMANDS
            .iter()
            .filter(|command| command.starts_with(line))
            .map(|command| command.to_string())
            .collect();
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_input(""), Input::AskAgain);
        assert_eq!(parse_input("/q"), Input::Exit);
        assert_eq!(parse_input("/exit"), Input::Exit);
        assert_eq!(parse_input("exit"), Input::Exit);
        assert_eq!(parse_input("/c"), Input::Clear);
        assert_eq!(parse_input("/help"), Input::Help);
        assert_eq!(parse_input("/model gpt-4o"), Input::SwitchModel("gpt-4o".into()));
        assert_eq!(parse_input("/model "), Input::AskAgain);
        assert_eq!(parse_input("/save chat.json"), Input::Save("chat.json".into()));
        assert_eq!(parse_input("/load chat.json"), Input::Load("chat.json".into()));
        assert_eq!(parse_input("/load "), Input::AskAgain);
    }

    #[test]
    fn test_everything_else_is_a_message() {
        assert_eq!(parse_input("Exit"), Input::Message("Exit".into()));
        assert_eq!(parse_input("/model"), Input::Message("/model".into()));
        assert_eq!(parse_input("/clear"), Input::Message("/clear".into()));
        assert_eq!(parse_input("fix the bug"), Input::Message("fix the bug".into()));
    }

    #[test]
    fn test_completions() {
        assert!(completions("").is_empty());
        assert!(completions("hello").is_empty());
        assert_eq!(
            completions("/model gemini"),
            vec!["/model gemini-2.5-flash", "/model gemini-2.5-pro"]
        );
        assert_eq!(completions("/model o1"), vec!["/model o1-preview", "/model o1-mini"]);
        assert_eq!(completions("/s"), vec!["/save "]);
        assert_eq!(completions("/"), COMMANDS.to_vec());
    }
}
