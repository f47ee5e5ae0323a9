//! Recurring transaction processing command

use std::path::PathBuf;

use anyhow::Result;
use tally_core::RecurringProcessor;

use super::core::open_db;

pub fn cmd_process_due(db_flag: &Option<PathBuf>) -> Result<()> {
    let (db, household_id) = open_db(db_flag.as_deref())?;

    let today = chrono::Utc::now().date_naive();
    let processed = RecurringProcessor::new(&db).process_due(household_id, today)?;

    if processed == 0 {
        println!("Nothing due as of {}.", today);
    } else {
        println!("✅ Processed {} due recurring transaction(s).", processed);
    }

    Ok(())
}
