//! Confirmation committer: reviewed staged rows become ledger transactions
//!
//! A single row failing mid-commit is logged and left in its last valid
//! state; the rest of the batch proceeds. Batch-level problems (already
//! finalized, unknown rows) abort before anything is written.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    ImportBatch, NewTransaction, RowDecision, RowStatus, StagedTransaction, TransactionKind,
};

/// Description substrings that force a transfer classification, checked
/// against the upper-cased description.
const TRANSFER_KEYWORDS: &[&str] = &[
    "TRANSFER",
    "XFER",
    "ZELLE",
    "VENMO",
    "PAYPAL TRANSFER",
    "CASH APP",
    "FROM SAVINGS",
    "TO SAVINGS",
    "FROM CHECKING",
    "TO CHECKING",
];

/// Committer for reviewed import batches
pub struct Committer<'a> {
    db: &'a Database,
}

impl<'a> Committer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Apply per-row decisions to a batch and finalize it.
    ///
    /// Rows absent from `decisions` are left untouched. Rows flagged as
    /// duplicates are never committed, even when the caller does not skip
    /// them. Returns the finalized batch with its counts.
    pub fn confirm_batch(
        &self,
        household_id: i64,
        batch_id: i64,
        decisions: &[RowDecision],
    ) -> Result<ImportBatch> {
        let batch = self.db.get_import_batch(household_id, batch_id)?;
        if batch.finalized {
            return Err(Error::InvalidData(format!(
                "import batch {} is already finalized",
                batch_id
            )));
        }

        let rows: HashMap<i64, StagedTransaction> = self
            .db
            .list_batch_rows(batch_id)?
            .into_iter()
            .map(|row| (row.id, row))
            .collect();

        // Validate every decision up front so a typo'd row id fails the
        // whole confirmation instead of half-applying it
        for decision in decisions {
            if !rows.contains_key(&decision.row_id) {
                return Err(Error::NotFound(format!(
                    "staged row {} in batch {}",
                    decision.row_id, batch_id
                )));
            }
        }

        let mut imported = 0i64;
        let mut skipped = 0i64;

        for decision in decisions {
            let row = &rows[&decision.row_id];

            // Terminal rows are never re-processed
            if matches!(row.status, RowStatus::Imported | RowStatus::Skipped) {
                continue;
            }

            if decision.skip || row.status == RowStatus::Duplicate {
                match self.db.mark_row_skipped(row.id) {
                    Ok(()) => skipped += 1,
                    Err(e) => warn!("Failed to skip staged row {}: {}", row.id, e),
                }
                continue;
            }

            match self.commit_row(household_id, &batch, row, decision.category_id) {
                Ok(()) => imported += 1,
                Err(e) => warn!("Failed to commit staged row {}: {}", row.id, e),
            }
        }

        self.db.finalize_import_batch(batch_id, imported, skipped)?;
        info!(
            "Finalized import batch {}: {} imported, {} skipped",
            batch_id, imported, skipped
        );

        self.db.get_import_batch(household_id, batch_id)
    }

    /// Materialize one staged row as a ledger transaction and update the
    /// account's running balance by the row's signed amount.
    fn commit_row(
        &self,
        household_id: i64,
        batch: &ImportBatch,
        row: &StagedTransaction,
        category_override: Option<i64>,
    ) -> Result<()> {
        let category_id = category_override.or(row.suggested_category_id);
        let category = match category_id {
            Some(id) => Some(self.db.get_category(household_id, id)?),
            None => None,
        };

        let kind = infer_kind(row.amount, category.map(|c| c.kind), &row.description);

        let transaction_id = self.db.insert_transaction(
            household_id,
            &NewTransaction {
                account_id: batch.account_id,
                date: row.date,
                amount: row.amount.abs(),
                kind,
                description: row.description.clone(),
                payee: row.payee.clone(),
                category_id,
                external_id: row.external_id.clone(),
            },
        )?;

        self.db.mark_row_imported(row.id, transaction_id)?;
        self.db
            .adjust_account_balance(household_id, batch.account_id, row.amount)?;
        Ok(())
    }
}

/// Infer a ledger kind from the staged row's signed amount, then override
/// to transfer when the category says so or the description names a
/// transfer service.
pub fn infer_kind(
    amount: f64,
    category_kind: Option<TransactionKind>,
    description: &str,
) -> TransactionKind {
    if category_kind == Some(TransactionKind::Transfer) {
        return TransactionKind::Transfer;
    }

    let desc_upper = description.to_uppercase();
    if TRANSFER_KEYWORDS.iter().any(|kw| desc_upper.contains(kw)) {
        return TransactionKind::Transfer;
    }

    if amount >= 0.0 {
        TransactionKind::Income
    } else {
        TransactionKind::Expense
    }
}
