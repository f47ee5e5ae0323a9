//! Tally CLI - Household finance tracker
//!
//! Usage:
//!   tally init                        Initialize database
//!   tally import --file F --account N Stage a bank statement for review
//!   tally serve --port 3000           Start web server
//!   tally accounts                    List accounts
//!   tally status                      Show database counts
//!   tally process-due                 Process due recurring transactions

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Import {
            file,
            account,
            commit,
        } => commands::cmd_import(&cli.db, &file, account, commit),
        Commands::Serve { host, port } => commands::cmd_serve(&cli.db, &host, port).await,
        Commands::Accounts => commands::cmd_accounts(&cli.db),
        Commands::Status => commands::cmd_status(&cli.db),
        Commands::ProcessDue => commands::cmd_process_due(&cli.db),
    }
}
