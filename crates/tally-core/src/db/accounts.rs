//! Account operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Account, NewAccount};

impl Database {
    /// Create an account in a household
    pub fn create_account(&self, household_id: i64, account: &NewAccount) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO accounts (household_id, name, account_type)
            VALUES (?, ?, ?)
            "#,
            params![
                household_id,
                account.name,
                account.account_type.map(|t| t.as_str()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get an account, scoped to its household. A household mismatch is
    /// indistinguishable from the account not existing.
    pub fn get_account(&self, household_id: i64, id: i64) -> Result<Account> {
        let conn = self.conn()?;
        conn.query_row(
            r#"
            SELECT id, household_id, name, account_type, balance, created_at
            FROM accounts WHERE id = ? AND household_id = ?
            "#,
            params![id, household_id],
            Self::row_to_account,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("account {}", id)))
    }

    /// List accounts in a household
    pub fn list_accounts(&self, household_id: i64) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, household_id, name, account_type, balance, created_at
            FROM accounts WHERE household_id = ? ORDER BY name
            "#,
        )?;
        let accounts = stmt
            .query_map(params![household_id], Self::row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    /// Delete an account. Rejected while ledger transactions reference it.
    pub fn delete_account(&self, household_id: i64, id: i64) -> Result<()> {
        // Ownership check first so a mismatch reads as not-found
        let account = self.get_account(household_id, id)?;

        let conn = self.conn()?;
        let tx_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE account_id = ?",
            params![account.id],
            |row| row.get(0),
        )?;
        if tx_count > 0 {
            return Err(Error::InvalidData(format!(
                "account {} has {} transactions and cannot be deleted",
                id, tx_count
            )));
        }

        conn.execute(
            "DELETE FROM accounts WHERE id = ? AND household_id = ?",
            params![id, household_id],
        )?;
        Ok(())
    }

    /// Add a signed delta to an account's running balance
    pub fn adjust_account_balance(
        &self,
        household_id: i64,
        account_id: i64,
        delta: f64,
    ) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE accounts SET balance = balance + ? WHERE id = ? AND household_id = ?",
            params![delta, account_id, household_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("account {}", account_id)));
        }
        Ok(())
    }

    fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Account> {
        let account_type: Option<String> = row.get(3)?;
        Ok(Account {
            id: row.get(0)?,
            household_id: row.get(1)?,
            name: row.get(2)?,
            account_type: account_type.and_then(|s| s.parse().ok()),
            balance: row.get(4)?,
            created_at: parse_datetime(&row.get::<_, String>(5)?),
        })
    }
}
