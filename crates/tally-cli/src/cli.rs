//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Household finance tracker
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Self-hosted household finance tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (defaults to the platform data directory, or $TALLY_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Stage a bank statement (.csv, .qfx, .ofx) for review
    Import {
        /// Statement file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Account id to import into
        #[arg(short, long)]
        account: i64,

        /// Confirm every non-duplicate row immediately instead of leaving
        /// the batch staged for review
        #[arg(long)]
        commit: bool,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// List accounts
    Accounts,

    /// Show database counts
    Status,

    /// Process all due recurring transactions
    ProcessDue,
}
