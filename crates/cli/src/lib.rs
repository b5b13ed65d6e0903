pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use hrdesk_core::config::{AppConfig, LoadOptions, LogFormat};
use hrdesk_core::errors::ApplicationError;

#[derive(Debug, Parser)]
#[command(
    name = "hrdesk",
    about = "HR desk chat bot",
    long_about = "Book vacation and sick days through a guided chat, replay transcripts, and inspect configuration.",
    after_help = "Examples:\n  hrdesk chat\n  hrdesk replay transcript.txt --session demo\n  hrdesk config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to an hrdesk.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Chat with the bot on stdin/stdout")]
    Chat {
        #[arg(long, default_value = "local", help = "Session identifier")]
        session: String,
    },
    #[command(about = "Feed a transcript through the bot and print one JSON line per turn")]
    Replay {
        #[arg(help = "Transcript file, one user message per line")]
        file: PathBuf,
        #[arg(long, default_value = "replay", help = "Session identifier")]
        session: String,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::CommandResult {
            exit_code: 0,
            output: commands::config::run(cli.config.as_deref()),
        },
        Command::Chat { session } => {
            with_runtime("chat", cli.config, |config| async move {
                commands::chat::run(&config, &session).await
            })
        }
        Command::Replay { file, session } => {
            with_runtime("replay", cli.config, |config| async move {
                commands::replay::run(&config, &file, &session).await
            })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn with_runtime<F, Fut>(command: &str, config_path: Option<PathBuf>, body: F) -> commands::CommandResult
where
    F: FnOnce(AppConfig) -> Fut,
    Fut: std::future::Future<Output = commands::CommandResult>,
{
    let options = LoadOptions { config_path, require_file: false, ..LoadOptions::default() };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return commands::CommandResult::failure(
                command,
                "config_validation",
                ApplicationError::from(error).to_string(),
                2,
            )
        }
    };
    init_logging(&config);

    match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime.block_on(body(config)),
        Err(error) => commands::CommandResult::failure(command, "runtime", error.to_string(), 3),
    }
}

/// Logs go to stderr so stdout stays reserved for the conversation.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
