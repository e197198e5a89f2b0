use std::path::{Path, PathBuf};

use anyhow::Result;
use gosling::agent::Agent;
use gosling::errors::AgentResult;
use gosling::models::message::Message;
use gosling::providers::factory::get_provider;

use crate::config::Settings;
use crate::prompt::renderer::{print_banner, print_error, print_help, print_success, TerminalRenderer};
use crate::prompt::{Input, Prompt};

pub mod session_file;

use session_file::LoadedSession;

pub struct Session {
    agent: Agent,
    prompt: Box<dyn Prompt>,
    settings: Settings,
    model: String,
    messages: Vec<Message>,
    cwd: PathBuf,
}

impl Session {
    pub fn new(agent: Agent, prompt: Box<dyn Prompt>, settings: Settings) -> Self {
        let model = agent.provider().model().to_string();
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Session {
            agent,
            prompt,
            settings,
            model,
            messages: Vec::new(),
            cwd,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        print_banner(&self.model, &self.cwd);
        print_help();

        loop {
            match self.prompt.get_input()? {
                Input::Exit => break,
                Input::AskAgain => continue,
                Input::Help => print_help(),
                Input::Clear => {
                    self.messages.clear();
                    print_success("Cleared conversation");
                }
                Input::SwitchModel(model) => {
                    if self.switch_model(&model) {
                        print_banner(&self.model, &self.cwd);
                        print_success(&format!("Switched model to: {}", self.model));
                    }
                }
                Input::Save(file) => self.save(Path::new(&file)),
                Input::Load(file) => self.load(Path::new(&file)),
                Input::Message(text) => {
                    if let Err(e) = self.process_turn(text).await {
                        print_error(&format!("Error: {e}"));
                    }
                    println!();
                }
            }
        }
        self.prompt.close();
        Ok(())
    }

    /// Run a single turn without the interactive loop. A failed turn is returned
    /// so the process exits with an error.
    pub async fn headless_start(&mut self, text: String) -> Result<()> {
        self.process_turn(text).await?;
        Ok(())
    }

    /// An interrupted turn is rolled back and counts as finished.
    async fn process_turn(&mut self, text: String) -> AgentResult<()> {
        let checkpoint = self.messages.len();
        self.messages.push(Message::user_text(text));

        let mut renderer = TerminalRenderer::new();
        let outcome = tokio::select! {
            result = self.agent.reply(&mut self.messages, &mut renderer) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };
        renderer.finish();

        match outcome {
            Some(result) => result,
            None => {
                self.messages.truncate(checkpoint);
                print_error("Interrupt: Resetting conversation to before the last sent message...");
                Ok(())
            }
        }
    }

    /// Point the agent at `model`. The conversation is kept. On failure the
    /// current model stays and the reason is shown.
    fn switch_model(&mut self, model: &str) -> bool {
        let provider = self
            .settings
            .provider_config(model)
            .and_then(get_provider);
        match provider {
            Ok(provider) => {
                self.agent.set_provider(provider);
                self.model = model.to_string();
                true
            }
            Err(e) => {
                print_error(&format!("Error: {e}"));
                false
            }
        }
    }

    fn save(&self, path: &Path) {
        match session_file::save(path, &self.model, &self.messages) {
            Ok(()) => print_success(&format!(
                "Saved conversation and model context to {}",
                path.display()
            )),
            Err(e) => print_error(&e.to_string()),
        }
    }

    fn load(&mut self, path: &Path) {
        match session_file::load(path) {
            Ok(LoadedSession::Current { model, messages }) => {
                if let Some(model) = model {
                    self.switch_model(&model);
                }
                if let Some(messages) = messages {
                    self.messages = messages;
                }
                print_banner(&self.model, &self.cwd);
                print_success(&format!(
                    "Loaded conversation and restored model from {}",
                    path.display()
                ));
            }
            Ok(LoadedSession::Legacy(messages)) => {
                self.messages = messages;
                print_success(&format!("Loaded legacy conversation from {}", path.display()));
            }
            Err(e) => print_error(&e.to_string()),
        }
    }
}
