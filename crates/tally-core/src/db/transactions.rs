//! Ledger transaction operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction, TransactionKind};

impl Database {
    /// Insert a ledger transaction
    pub fn insert_transaction(&self, household_id: i64, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO transactions
                (household_id, account_id, date, amount, kind, description, payee, category_id, external_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                household_id,
                tx.account_id,
                tx.date.to_string(),
                tx.amount,
                tx.kind.as_str(),
                tx.description,
                tx.payee,
                tx.category_id,
                tx.external_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a transaction, scoped to its household
    pub fn get_transaction(&self, household_id: i64, id: i64) -> Result<Transaction> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM transactions t WHERE t.id = ? AND t.household_id = ?",
                Self::TRANSACTION_COLUMNS
            ),
            params![id, household_id],
            Self::row_to_transaction,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))
    }

    /// All transactions for one account, oldest first. Used by the
    /// duplicate detector, which needs the full set to compare against.
    pub fn list_account_transactions(
        &self,
        household_id: i64,
        account_id: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM transactions t
            WHERE t.account_id = ? AND t.household_id = ?
            ORDER BY t.date, t.id
            "#,
            Self::TRANSACTION_COLUMNS
        ))?;
        let transactions = stmt
            .query_map(params![account_id, household_id], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Search transactions with optional filters
    pub fn search_transactions(
        &self,
        household_id: i64,
        account_id: Option<i64>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let mut conditions = vec!["t.household_id = ?".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(household_id)];

        if let Some(aid) = account_id {
            conditions.push("t.account_id = ?".to_string());
            params.push(Box::new(aid));
        }

        if let Some(q) = search {
            if !q.trim().is_empty() {
                conditions.push(
                    "(t.description LIKE ? COLLATE NOCASE OR t.payee LIKE ? COLLATE NOCASE)"
                        .to_string(),
                );
                let pattern = format!("%{}%", q.trim());
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern));
            }
        }

        let sql = format!(
            r#"
            SELECT {} FROM transactions t
            WHERE {}
            ORDER BY t.date DESC, t.id DESC
            LIMIT ? OFFSET ?
            "#,
            Self::TRANSACTION_COLUMNS,
            conditions.join(" AND ")
        );

        params.push(Box::new(limit));
        params.push(Box::new(offset));

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let transactions = stmt
            .query_map(params_refs.as_slice(), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Count transactions in a household (optionally one account)
    pub fn count_transactions(&self, household_id: i64, account_id: Option<i64>) -> Result<i64> {
        let conn = self.conn()?;
        let count = match account_id {
            Some(aid) => conn.query_row(
                "SELECT COUNT(*) FROM transactions WHERE household_id = ? AND account_id = ?",
                params![household_id, aid],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM transactions WHERE household_id = ?",
                params![household_id],
                |row| row.get(0),
            )?,
        };
        Ok(count)
    }

    const TRANSACTION_COLUMNS: &'static str = "t.id, t.household_id, t.account_id, t.date, \
        t.amount, t.kind, t.description, t.payee, t.category_id, t.external_id, t.created_at";

    fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
        let date: String = row.get(3)?;
        let kind: String = row.get(5)?;
        Ok(Transaction {
            id: row.get(0)?,
            household_id: row.get(1)?,
            account_id: row.get(2)?,
            date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default(),
            amount: row.get(4)?,
            kind: kind.parse().unwrap_or(TransactionKind::Expense),
            description: row.get(6)?,
            payee: row.get(7)?,
            category_id: row.get(8)?,
            external_id: row.get(9)?,
            created_at: parse_datetime(&row.get::<_, String>(10)?),
        })
    }
}
