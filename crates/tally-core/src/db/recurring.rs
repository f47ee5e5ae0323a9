//! Recurring transaction operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Frequency, NewRecurringTransaction, RecurringTransaction, TransactionKind};
use crate::schedule::next_occurrence;

impl Database {
    /// Create a recurring transaction. The first occurrence is seeded from
    /// the start date using the occurrence calculator.
    pub fn create_recurring_transaction(
        &self,
        household_id: i64,
        rec: &NewRecurringTransaction,
    ) -> Result<i64> {
        if rec.amount < 0.0 {
            return Err(Error::InvalidData(
                "recurring amount must be non-negative; the kind carries the sign".into(),
            ));
        }
        self.get_account(household_id, rec.account_id)?;
        if let Some(category_id) = rec.category_id {
            self.get_category(household_id, category_id)?;
        }

        let first = next_occurrence(rec.start_date, rec.frequency, rec.interval, rec.day_of_period);

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO recurring_transactions
                (household_id, account_id, description, amount, kind, category_id,
                 frequency, interval, day_of_period, next_occurrence)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                household_id,
                rec.account_id,
                rec.description,
                rec.amount,
                rec.kind.as_str(),
                rec.category_id,
                rec.frequency.as_str(),
                rec.interval,
                rec.day_of_period,
                first.to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a recurring transaction, scoped to its household
    pub fn get_recurring_transaction(
        &self,
        household_id: i64,
        id: i64,
    ) -> Result<RecurringTransaction> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM recurring_transactions r WHERE r.id = ? AND r.household_id = ?",
                Self::RECURRING_COLUMNS
            ),
            params![id, household_id],
            Self::row_to_recurring,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("recurring transaction {}", id)))
    }

    /// List recurring transactions in a household, soonest first
    pub fn list_recurring_transactions(
        &self,
        household_id: i64,
    ) -> Result<Vec<RecurringTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM recurring_transactions r
            WHERE r.household_id = ?
            ORDER BY r.next_occurrence, r.id
            "#,
            Self::RECURRING_COLUMNS
        ))?;
        let recurring = stmt
            .query_map(params![household_id], Self::row_to_recurring)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(recurring)
    }

    /// List active recurring transactions due on or before `as_of`
    pub fn list_due_recurring_transactions(
        &self,
        household_id: i64,
        as_of: NaiveDate,
    ) -> Result<Vec<RecurringTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM recurring_transactions r
            WHERE r.household_id = ? AND r.active = 1 AND r.next_occurrence <= ?
            ORDER BY r.next_occurrence, r.id
            "#,
            Self::RECURRING_COLUMNS
        ))?;
        let recurring = stmt
            .query_map(
                params![household_id, as_of.to_string()],
                Self::row_to_recurring,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(recurring)
    }

    /// Advance a recurring transaction's next occurrence
    pub fn set_next_occurrence(&self, id: i64, next: NaiveDate) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE recurring_transactions SET next_occurrence = ? WHERE id = ?",
            params![next.to_string(), id],
        )?;
        Ok(())
    }

    /// Delete a recurring transaction
    pub fn delete_recurring_transaction(&self, household_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM recurring_transactions WHERE id = ? AND household_id = ?",
            params![id, household_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("recurring transaction {}", id)));
        }
        Ok(())
    }

    const RECURRING_COLUMNS: &'static str = "r.id, r.household_id, r.account_id, r.description, \
        r.amount, r.kind, r.category_id, r.frequency, r.interval, r.day_of_period, \
        r.next_occurrence, r.active, r.created_at";

    fn row_to_recurring(row: &Row<'_>) -> rusqlite::Result<RecurringTransaction> {
        let kind: String = row.get(5)?;
        let frequency: String = row.get(7)?;
        let next: String = row.get(10)?;
        Ok(RecurringTransaction {
            id: row.get(0)?,
            household_id: row.get(1)?,
            account_id: row.get(2)?,
            description: row.get(3)?,
            amount: row.get(4)?,
            kind: kind.parse().unwrap_or(TransactionKind::Expense),
            category_id: row.get(6)?,
            frequency: frequency.parse().unwrap_or(Frequency::Monthly),
            interval: row.get(8)?,
            day_of_period: row.get(9)?,
            next_occurrence: NaiveDate::parse_from_str(&next, "%Y-%m-%d").unwrap_or_default(),
            active: row.get(11)?,
            created_at: parse_datetime(&row.get::<_, String>(12)?),
        })
    }
}
