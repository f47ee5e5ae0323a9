//! Category rule operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{CategoryRule, MatchType, NewCategoryRule};

impl Database {
    /// Create a category rule. The target category must belong to the same
    /// household.
    pub fn create_rule(&self, household_id: i64, rule: &NewCategoryRule) -> Result<i64> {
        self.get_category(household_id, rule.category_id)?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO category_rules (household_id, pattern, match_type, category_id, payee, priority)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                household_id,
                rule.pattern,
                rule.match_type.as_str(),
                rule.category_id,
                rule.payee,
                rule.priority,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a rule, scoped to its household
    pub fn get_rule(&self, household_id: i64, id: i64) -> Result<CategoryRule> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM category_rules r WHERE r.id = ? AND r.household_id = ?",
                Self::RULE_COLUMNS
            ),
            params![id, household_id],
            Self::row_to_rule,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("rule {}", id)))
    }

    /// List all rules in a household, evaluation order first
    pub fn list_rules(&self, household_id: i64) -> Result<Vec<CategoryRule>> {
        self.list_rules_inner(household_id, false)
    }

    /// List active rules in evaluation order (ascending priority, ties by id)
    pub fn list_active_rules(&self, household_id: i64) -> Result<Vec<CategoryRule>> {
        self.list_rules_inner(household_id, true)
    }

    fn list_rules_inner(&self, household_id: i64, active_only: bool) -> Result<Vec<CategoryRule>> {
        let conn = self.conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM category_rules r
            WHERE r.household_id = ? {}
            ORDER BY r.priority, r.id
            "#,
            Self::RULE_COLUMNS,
            if active_only { "AND r.active = 1" } else { "" }
        );
        let mut stmt = conn.prepare(&sql)?;
        let rules = stmt
            .query_map(params![household_id], Self::row_to_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    /// Delete a rule
    pub fn delete_rule(&self, household_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM category_rules WHERE id = ? AND household_id = ?",
            params![id, household_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("rule {}", id)));
        }
        Ok(())
    }

    /// Bump a rule's usage counters after it matched a staged row
    pub fn record_rule_match(&self, rule_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE category_rules
            SET match_count = match_count + 1, last_matched_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![rule_id],
        )?;
        Ok(())
    }

    const RULE_COLUMNS: &'static str = "r.id, r.household_id, r.pattern, r.match_type, \
        r.category_id, r.payee, r.priority, r.active, r.match_count, r.last_matched_at, r.created_at";

    fn row_to_rule(row: &Row<'_>) -> rusqlite::Result<CategoryRule> {
        let match_type: String = row.get(3)?;
        let last_matched: Option<String> = row.get(9)?;
        Ok(CategoryRule {
            id: row.get(0)?,
            household_id: row.get(1)?,
            pattern: row.get(2)?,
            match_type: match_type.parse().unwrap_or(MatchType::Contains),
            category_id: row.get(4)?,
            payee: row.get(5)?,
            priority: row.get(6)?,
            active: row.get(7)?,
            match_count: row.get(8)?,
            last_matched_at: last_matched.map(|s| parse_datetime(&s)),
            created_at: parse_datetime(&row.get::<_, String>(10)?),
        })
    }
}
