//! Household (tenant) operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Household;

impl Database {
    /// Create a household
    pub fn create_household(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO households (name) VALUES (?)",
            params![name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a household by id
    pub fn get_household(&self, id: i64) -> Result<Household> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, created_at FROM households WHERE id = ?",
            params![id],
            |row| {
                Ok(Household {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("household {}", id)))
    }

    /// Ensure a default household exists (id 1), creating it if missing.
    /// Lets a fresh database be used without any tenant-management surface.
    pub fn ensure_default_household(&self) -> Result<i64> {
        let conn = self.conn()?;
        let existing: Option<i64> = conn
            .query_row("SELECT id FROM households ORDER BY id LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match existing {
            Some(id) => Ok(id),
            None => {
                conn.execute("INSERT INTO households (name) VALUES ('default')", [])?;
                Ok(conn.last_insert_rowid())
            }
        }
    }
}
