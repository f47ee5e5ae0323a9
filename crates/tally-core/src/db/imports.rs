//! Import batch and staged row operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    ImportBatch, NewStagedTransaction, RowStatus, StagedTransaction, StatementFormat,
};

impl Database {
    /// Create an import batch for an uploaded statement
    pub fn create_import_batch(
        &self,
        household_id: i64,
        account_id: i64,
        filename: &str,
        format: StatementFormat,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO import_batches (household_id, account_id, filename, format)
            VALUES (?, ?, ?, ?)
            "#,
            params![household_id, account_id, filename, format.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get an import batch, scoped to its household
    pub fn get_import_batch(&self, household_id: i64, id: i64) -> Result<ImportBatch> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM import_batches b WHERE b.id = ? AND b.household_id = ?",
                Self::BATCH_COLUMNS
            ),
            params![id, household_id],
            Self::row_to_batch,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("import batch {}", id)))
    }

    /// List import batches in a household, newest first
    pub fn list_import_batches(&self, household_id: i64) -> Result<Vec<ImportBatch>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM import_batches b
            WHERE b.household_id = ?
            ORDER BY b.created_at DESC, b.id DESC
            "#,
            Self::BATCH_COLUMNS
        ))?;
        let batches = stmt
            .query_map(params![household_id], Self::row_to_batch)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(batches)
    }

    /// Insert a staged row parsed out of a statement
    pub fn insert_staged_row(&self, batch_id: i64, row: &NewStagedTransaction) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO import_rows
                (batch_id, date, amount, description, payee, check_number, external_id, raw_data)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                batch_id,
                row.date.to_string(),
                row.amount,
                row.description,
                row.payee,
                row.check_number,
                row.external_id,
                row.raw_data,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List a batch's staged rows in file order
    pub fn list_batch_rows(&self, batch_id: i64) -> Result<Vec<StagedTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM import_rows i WHERE i.batch_id = ? ORDER BY i.id",
            Self::ROW_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![batch_id], Self::row_to_staged)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Record a batch's parsed row total
    pub fn update_batch_total(&self, batch_id: i64, total_rows: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE import_batches SET total_rows = ? WHERE id = ?",
            params![total_rows, batch_id],
        )?;
        Ok(())
    }

    /// Record a batch's duplicate count after detection
    pub fn update_batch_duplicates(&self, batch_id: i64, duplicate_count: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE import_batches SET duplicate_count = ? WHERE id = ?",
            params![duplicate_count, batch_id],
        )?;
        Ok(())
    }

    /// Mark a batch finalized with its confirmation counts
    pub fn finalize_import_batch(&self, batch_id: i64, imported: i64, skipped: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE import_batches
            SET finalized = 1, imported_count = ?, skipped_count = ?
            WHERE id = ?
            "#,
            params![imported, skipped, batch_id],
        )?;
        Ok(())
    }

    /// Delete an un-finalized batch and (by cascade) its staged rows.
    /// Finalized batches are history and cannot be cancelled.
    pub fn delete_import_batch(&self, household_id: i64, id: i64) -> Result<()> {
        let batch = self.get_import_batch(household_id, id)?;
        if batch.finalized {
            return Err(Error::InvalidData(format!(
                "import batch {} is finalized and cannot be cancelled",
                id
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM import_batches WHERE id = ? AND household_id = ?",
            params![id, household_id],
        )?;
        Ok(())
    }

    /// Flag a staged row as a duplicate of an existing transaction
    pub fn mark_row_duplicate(
        &self,
        row_id: i64,
        matched_transaction_id: i64,
        reason: &str,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE import_rows
            SET status = 'duplicate', matched_transaction_id = ?, status_reason = ?
            WHERE id = ?
            "#,
            params![matched_transaction_id, reason, row_id],
        )?;
        Ok(())
    }

    /// Apply a rule match to a staged row: suggested category, optional
    /// payee override, status flip to auto_matched
    pub fn apply_rule_suggestion(
        &self,
        row_id: i64,
        category_id: i64,
        payee: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        match payee {
            Some(payee) => conn.execute(
                r#"
                UPDATE import_rows
                SET status = 'auto_matched', suggested_category_id = ?, payee = ?
                WHERE id = ?
                "#,
                params![category_id, payee, row_id],
            )?,
            None => conn.execute(
                r#"
                UPDATE import_rows
                SET status = 'auto_matched', suggested_category_id = ?
                WHERE id = ?
                "#,
                params![category_id, row_id],
            )?,
        };
        Ok(())
    }

    /// Mark a staged row imported and link the ledger transaction it created
    pub fn mark_row_imported(&self, row_id: i64, transaction_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE import_rows
            SET status = 'imported', created_transaction_id = ?
            WHERE id = ?
            "#,
            params![transaction_id, row_id],
        )?;
        Ok(())
    }

    /// Mark a staged row skipped
    pub fn mark_row_skipped(&self, row_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE import_rows SET status = 'skipped' WHERE id = ?",
            params![row_id],
        )?;
        Ok(())
    }

    const BATCH_COLUMNS: &'static str = "b.id, b.household_id, b.account_id, b.filename, \
        b.format, b.total_rows, b.duplicate_count, b.imported_count, b.skipped_count, \
        b.finalized, b.created_at";

    fn row_to_batch(row: &Row<'_>) -> rusqlite::Result<ImportBatch> {
        let format: String = row.get(4)?;
        Ok(ImportBatch {
            id: row.get(0)?,
            household_id: row.get(1)?,
            account_id: row.get(2)?,
            filename: row.get(3)?,
            format: format.parse().unwrap_or(StatementFormat::Csv),
            total_rows: row.get(5)?,
            duplicate_count: row.get(6)?,
            imported_count: row.get(7)?,
            skipped_count: row.get(8)?,
            finalized: row.get(9)?,
            created_at: parse_datetime(&row.get::<_, String>(10)?),
        })
    }

    const ROW_COLUMNS: &'static str = "i.id, i.batch_id, i.date, i.amount, i.description, \
        i.payee, i.check_number, i.external_id, i.raw_data, i.status, i.status_reason, \
        i.suggested_category_id, i.matched_transaction_id, i.created_transaction_id, i.created_at";

    fn row_to_staged(row: &Row<'_>) -> rusqlite::Result<StagedTransaction> {
        let date: String = row.get(2)?;
        let status: String = row.get(9)?;
        Ok(StagedTransaction {
            id: row.get(0)?,
            batch_id: row.get(1)?,
            date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default(),
            amount: row.get(3)?,
            description: row.get(4)?,
            payee: row.get(5)?,
            check_number: row.get(6)?,
            external_id: row.get(7)?,
            raw_data: row.get(8)?,
            status: status.parse().unwrap_or(RowStatus::Pending),
            status_reason: row.get(10)?,
            suggested_category_id: row.get(11)?,
            matched_transaction_id: row.get(12)?,
            created_transaction_id: row.get(13)?,
            created_at: parse_datetime(&row.get::<_, String>(14)?),
        })
    }
}
