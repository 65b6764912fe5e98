//! CLI entry point.
//!
//! Loads `.env`, installs logging, composes the controller via
//! [`bootstrap`], and dispatches to a handler.

use std::time::Duration;

use clap::{CommandFactory, Parser};

use utter_cli::{Cli, Commands, bootstrap, handlers, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = bootstrap(&cli)?;

    match command {
        Commands::Speak {
            texts,
            pause_at,
            json,
        } => {
            handlers::speak::execute(&ctx, texts, pause_at.map(Duration::from_millis), *json)
                .await?;
        }
        Commands::Voices { language } => {
            handlers::voices::execute(&ctx, language.as_deref()).await?;
        }
        Commands::Repl => {
            handlers::repl::execute(&ctx).await?;
        }
    }

    Ok(())
}
