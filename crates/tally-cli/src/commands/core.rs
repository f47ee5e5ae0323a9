//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `resolve_db_path` / `open_db` - Shared database utilities
//! - `cmd_init` - Initialize the database
//! - `cmd_accounts` - List accounts
//! - `cmd_status` - Show database counts

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_core::db::Database;

/// Resolve the database path: --db flag, then $TALLY_DB, then the platform
/// data directory (e.g. ~/.local/share/tally/tally.db)
pub fn resolve_db_path(flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = std::env::var("TALLY_DB") {
        return Ok(PathBuf::from(env_path));
    }

    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
    Ok(dir.join("tally.db"))
}

/// Open the database and make sure a default household exists.
/// Returns the database and the household id commands operate on.
pub fn open_db(flag: Option<&Path>) -> Result<(Database, i64)> {
    let path = resolve_db_path(flag)?;
    let path_str = path
        .to_str()
        .with_context(|| format!("Non-UTF8 database path: {}", path.display()))?;
    let db = Database::new(path_str).context("Failed to open database")?;
    let household_id = db
        .ensure_default_household()
        .context("Failed to ensure default household")?;
    Ok((db, household_id))
}

pub fn cmd_init(db_flag: &Option<PathBuf>) -> Result<()> {
    let path = resolve_db_path(db_flag.as_deref())?;
    println!("🔧 Initializing database at {}...", path.display());

    open_db(db_flag.as_deref())?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Start the web UI: tally serve");
    println!("  2. Create an account, then: tally import --file statement.csv --account 1");

    Ok(())
}

pub fn cmd_accounts(db_flag: &Option<PathBuf>) -> Result<()> {
    let (db, household_id) = open_db(db_flag.as_deref())?;
    let accounts = db.list_accounts(household_id)?;

    if accounts.is_empty() {
        println!("No accounts yet. Create one through the web UI or API.");
        return Ok(());
    }

    println!("{:<5} {:<25} {:<10} {:>12}", "ID", "NAME", "TYPE", "BALANCE");
    for account in accounts {
        println!(
            "{:<5} {:<25} {:<10} {:>12.2}",
            account.id,
            account.name,
            account
                .account_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string()),
            account.balance
        );
    }

    Ok(())
}

pub fn cmd_status(db_flag: &Option<PathBuf>) -> Result<()> {
    let (db, household_id) = open_db(db_flag.as_deref())?;

    let household = db.get_household(household_id)?;
    let accounts = db.list_accounts(household_id)?.len();
    let categories = db.list_categories(household_id)?.len();
    let transactions = db.count_transactions(household_id, None)?;
    let rules = db.list_rules(household_id)?.len();
    let batches = db.list_import_batches(household_id)?.len();
    let recurring = db.list_recurring_transactions(household_id)?.len();

    println!("📊 Tally status ({})", db.path());
    println!("   Household:              {}", household.name);
    println!("   Accounts:               {}", accounts);
    println!("   Categories:             {}", categories);
    println!("   Transactions:           {}", transactions);
    println!("   Category rules:         {}", rules);
    println!("   Import batches:         {}", batches);
    println!("   Recurring transactions: {}", recurring);

    Ok(())
}
