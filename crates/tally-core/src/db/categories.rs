//! Category operations
//!
//! Deletion guards are application-level: a category referenced by
//! transactions or rules cannot be deleted.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, NewCategory, TransactionKind};

impl Database {
    /// Create a category in a household
    pub fn create_category(&self, household_id: i64, category: &NewCategory) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO categories (household_id, name, kind)
            VALUES (?, ?, ?)
            "#,
            params![household_id, category.name, category.kind.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a category, scoped to its household
    pub fn get_category(&self, household_id: i64, id: i64) -> Result<Category> {
        let conn = self.conn()?;
        conn.query_row(
            r#"
            SELECT id, household_id, name, kind, created_at
            FROM categories WHERE id = ? AND household_id = ?
            "#,
            params![id, household_id],
            Self::row_to_category,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("category {}", id)))
    }

    /// List categories in a household
    pub fn list_categories(&self, household_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, household_id, name, kind, created_at
            FROM categories WHERE household_id = ? ORDER BY name
            "#,
        )?;
        let categories = stmt
            .query_map(params![household_id], Self::row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Delete a category. Rejected while transactions or rules reference it.
    pub fn delete_category(&self, household_id: i64, id: i64) -> Result<()> {
        let category = self.get_category(household_id, id)?;

        let conn = self.conn()?;
        let tx_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE category_id = ?",
            params![category.id],
            |row| row.get(0),
        )?;
        if tx_count > 0 {
            return Err(Error::InvalidData(format!(
                "category {} is referenced by {} transactions",
                id, tx_count
            )));
        }

        let rule_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM category_rules WHERE category_id = ?",
            params![category.id],
            |row| row.get(0),
        )?;
        if rule_count > 0 {
            return Err(Error::InvalidData(format!(
                "category {} is referenced by {} rules",
                id, rule_count
            )));
        }

        conn.execute(
            "DELETE FROM categories WHERE id = ? AND household_id = ?",
            params![id, household_id],
        )?;
        Ok(())
    }

    fn row_to_category(row: &Row<'_>) -> rusqlite::Result<Category> {
        let kind: String = row.get(3)?;
        Ok(Category {
            id: row.get(0)?,
            household_id: row.get(1)?,
            name: row.get(2)?,
            kind: kind.parse().unwrap_or(TransactionKind::Expense),
            created_at: parse_datetime(&row.get::<_, String>(4)?),
        })
    }
}
