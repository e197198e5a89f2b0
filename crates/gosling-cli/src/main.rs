use anyhow::Result;
use clap::Parser;
use gosling::agent::Agent;
use gosling::developer::DeveloperSystem;
use gosling::providers::factory::get_provider;
use tracing_subscriber::EnvFilter;

mod config;
mod prompt;
mod session;

use config::Settings;
use prompt::rustyline::RustylinePrompt;
use session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Model to start with; the provider is picked from its name
    #[arg(short, long)]
    model: Option<String>,

    /// Send this message, print the reply and exit
    #[arg(short, long)]
    prompt: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    config::load_env_files();
    let settings = Settings::new()?;
    let model = settings.initial_model(cli.model.as_deref());

    let provider = get_provider(settings.provider_config(&model)?)?;
    let mut agent = Agent::new(provider);
    agent.add_system(Box::new(DeveloperSystem::new()));

    let mut session = Session::new(agent, Box::new(RustylinePrompt::new()?), settings);
    match cli.prompt {
        Some(text) => session.headless_start(text).await,
        None => session.start().await,
    }
}

/// Logs go to stderr so they never land in the middle of streamed text.
/// `GOSLING_LOG` wins over `RUST_LOG`; the default level is `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("GOSLING_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
