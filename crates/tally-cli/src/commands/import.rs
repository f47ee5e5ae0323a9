//! Statement import command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_core::import::{detect_format, parse_statement};
use tally_core::models::{RowDecision, RowStatus};
use tally_core::{Categorizer, Committer, DuplicateDetector};

use super::core::open_db;

pub fn cmd_import(
    db_flag: &Option<PathBuf>,
    file: &Path,
    account_id: i64,
    commit: bool,
) -> Result<()> {
    let (db, household_id) = open_db(db_flag.as_deref())?;

    let account = db
        .get_account(household_id, account_id)
        .context("Account not found")?;

    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", file.display()))?;
    let format = detect_format(filename)?;

    let data = std::fs::read(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    println!(
        "📥 Importing {} into '{}' ({} format)...",
        filename,
        account.name,
        format
    );

    let rows = parse_statement(&data, format)?;
    let batch_id = db.create_import_batch(household_id, account.id, filename, format)?;
    for row in &rows {
        db.insert_staged_row(batch_id, row)?;
    }
    db.update_batch_total(batch_id, rows.len() as i64)?;

    let batch = db.get_import_batch(household_id, batch_id)?;
    let duplicates = DuplicateDetector::new(&db).scan_batch(household_id, &batch)?;
    let auto_matched = Categorizer::new(&db).scan_batch(household_id, batch_id)?;

    println!(
        "   Staged {} rows ({} duplicates, {} auto-categorized)",
        rows.len(),
        duplicates,
        auto_matched
    );

    let staged = db.list_batch_rows(batch_id)?;
    for row in &staged {
        let marker = match row.status {
            RowStatus::Duplicate => "⏭",
            RowStatus::AutoMatched => "🏷",
            _ => " ",
        };
        println!(
            "   {} {} {:>10.2}  {}",
            marker, row.date, row.amount, row.description
        );
    }

    if commit {
        let decisions: Vec<RowDecision> = staged
            .iter()
            .map(|row| RowDecision {
                row_id: row.id,
                category_id: None,
                skip: false,
            })
            .collect();

        let batch = Committer::new(&db).confirm_batch(household_id, batch_id, &decisions)?;
        let account = db.get_account(household_id, account_id)?;
        println!(
            "✅ Committed batch {}: {} imported, {} skipped. Balance: {:.2}",
            batch.id, batch.imported_count, batch.skipped_count, account.balance
        );
    } else {
        println!(
            "✅ Batch {} staged. Review and confirm it through the web UI.",
            batch_id
        );
    }

    Ok(())
}
