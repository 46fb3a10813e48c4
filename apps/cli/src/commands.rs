//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::info;

use webrag_core::{ProgressReporter, Session};
use webrag_shared::{AppConfig, init_config, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// webrag — ask questions, get answers grounded in fresh web sources.
#[derive(Parser)]
#[command(
    name = "webrag",
    version,
    about = "Context-aware research assistant: web search + page reading + LLM answers.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.webrag/webrag.toml.
    #[arg(long, global = true, env = "WEBRAG_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    /// Defaults to `chat`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start an interactive conversation.
    Chat,

    /// Ask a single question and print the answer.
    Ask {
        /// The question (words are joined with spaces).
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Quiet by default so log lines do not interleave with the conversation.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "webrag=warn",
        1 => "webrag=info",
        2 => "webrag=debug",
        _ => "webrag=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => cmd_chat(&config).await,
        Command::Ask { question } => cmd_ask(&config, &question.join(" ")).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Chat input
// ---------------------------------------------------------------------------

/// One line of interactive input, classified.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ChatInput {
    Exit,
    Clear,
    Empty,
    Question(String),
}

impl ChatInput {
    pub(crate) fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "exit" | "quit" => Self::Exit,
            "clear" => Self::Clear,
            "" => Self::Empty,
            _ => Self::Question(trimmed.to_string()),
        }
    }
}

/// Forward lines from `reader` over a channel, reading on a plain OS thread.
///
/// A read blocked on that thread cannot delay runtime shutdown, so the chat
/// loop can exit on Ctrl-C while the prompt is waiting for input. The channel
/// closes at end of input.
pub(crate) fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<std::io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in reader.lines() {
            let failed = line.is_err();
            if tx.blocking_send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_chat(config: &AppConfig) -> Result<()> {
    let mut session = Session::from_config(config)?;
    info!(session = %session.id(), "starting chat");

    println!("{}", "\n=== Context-Aware Research Assistant ===".cyan().bold());
    println!(
        "{}\n",
        "Type your questions (type 'exit', 'quit', or 'clear' to reset)".dark_grey()
    );

    let mut lines = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));

    loop {
        print!("{} ", "Enter your question:".dark_grey());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.recv() => line.transpose()?,
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "\n\nAssistant: Session ended. Thank you!".magenta().bold());
                break;
            }
        };

        let Some(line) = line else {
            println!("{}", "\nAssistant: Goodbye!".magenta().bold());
            break;
        };

        match ChatInput::parse(&line) {
            ChatInput::Exit => {
                println!(
                    "{}",
                    "\nAssistant: Goodbye! Feel free to return with more questions."
                        .magenta()
                        .bold()
                );
                break;
            }
            ChatInput::Clear => {
                session.clear_history();
                println!("{}\n", "\nAssistant: Conversation history cleared.".magenta().bold());
            }
            ChatInput::Empty => continue,
            ChatInput::Question(question) => {
                println!("\n{}", format!("User: {question}").blue().bold());

                let progress = CliProgress::new();
                let outcome = tokio::select! {
                    result = session.ask_with_progress(&question, &progress) => Some(result),
                    _ = tokio::signal::ctrl_c() => None,
                };

                match outcome {
                    Some(Ok(answer)) => {
                        println!("{} {answer}", "Assistant:".green().bold());
                        println!("{}\n", "─".repeat(80).dark_grey());
                    }
                    Some(Err(e)) => {
                        println!("{}", format!("\nError: {e}").red());
                    }
                    None => {
                        progress.done();
                        println!("{}", "\n\nAssistant: Session ended. Thank you!".magenta().bold());
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

async fn cmd_ask(config: &AppConfig, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(eyre!("question must not be empty"));
    }

    let mut session = Session::from_config(config)?;
    let progress = CliProgress::new();
    let answer = session.ask_with_progress(question, &progress).await?;

    println!("{answer}");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner shown while a question is being researched.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg:.dim}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.set_message("Researching current information...");
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(format!("{name}..."));
    }

    fn done(&self) {
        self.spinner.finish_and_clear();
    }
}
