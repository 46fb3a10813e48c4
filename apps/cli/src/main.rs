//! webrag CLI — a context-aware research assistant for the terminal.
//!
//! Answers questions from fresh web search results and remembers the
//! recent conversation so follow-up questions make sense.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
