//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `households` - Tenant records
//! - `accounts` - Bank account operations
//! - `categories` - Category CRUD with referential guards
//! - `transactions` - Ledger transaction operations
//! - `rules` - Category rule CRUD and match bookkeeping
//! - `imports` - Import batches and staged rows
//! - `recurring` - Recurring transaction operations

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod accounts;
mod categories;
mod households;
mod imports;
mod recurring;
mod rules;
mod transactions;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool, running migrations
    pub fn new(path: &str) -> Result<Self> {
        // Foreign keys are per-connection in SQLite, so every pooled
        // connection enables them
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a database for testing
    ///
    /// Note: Uses a temporary file rather than `:memory:` because each
    /// pooled connection to `:memory:` would open its own private database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!(
            "{}/tally_test_{}_{}.db",
            std::env::temp_dir().display(),
            std::process::id(),
            id
        );

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Store temp tables in memory (faster for complex queries)
            PRAGMA temp_store = MEMORY;

            -- Households (tenants owning all other rows)
            CREATE TABLE IF NOT EXISTS households (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Accounts (bank accounts)
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                household_id INTEGER NOT NULL REFERENCES households(id),
                name TEXT NOT NULL,
                account_type TEXT,
                balance REAL NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_accounts_household ON accounts(household_id);

            -- Categories
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                household_id INTEGER NOT NULL REFERENCES households(id),
                name TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'expense',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(household_id, name)
            );

            CREATE INDEX IF NOT EXISTS idx_categories_household ON categories(household_id);

            -- Ledger transactions (amount is non-negative, sign carried by kind)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                household_id INTEGER NOT NULL REFERENCES households(id),
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                date DATE NOT NULL,
                amount REAL NOT NULL,
                kind TEXT NOT NULL,
                description TEXT NOT NULL,
                payee TEXT,
                category_id INTEGER REFERENCES categories(id),
                external_id TEXT,                          -- bank FITID for duplicate detection
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
            CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_household ON transactions(household_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_external ON transactions(external_id);

            -- Category rules (ordered pattern -> category/payee assignment)
            CREATE TABLE IF NOT EXISTS category_rules (
                id INTEGER PRIMARY KEY,
                household_id INTEGER NOT NULL REFERENCES households(id),
                pattern TEXT NOT NULL,
                match_type TEXT NOT NULL DEFAULT 'contains',
                category_id INTEGER NOT NULL REFERENCES categories(id),
                payee TEXT,
                priority INTEGER NOT NULL DEFAULT 100,     -- lower = evaluated first
                active BOOLEAN NOT NULL DEFAULT 1,
                match_count INTEGER NOT NULL DEFAULT 0,
                last_matched_at DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_rules_household ON category_rules(household_id, priority);

            -- Import batches (one statement-upload event)
            CREATE TABLE IF NOT EXISTS import_batches (
                id INTEGER PRIMARY KEY,
                household_id INTEGER NOT NULL REFERENCES households(id),
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                filename TEXT NOT NULL,
                format TEXT NOT NULL,
                total_rows INTEGER NOT NULL DEFAULT 0,
                duplicate_count INTEGER NOT NULL DEFAULT 0,
                imported_count INTEGER NOT NULL DEFAULT 0,
                skipped_count INTEGER NOT NULL DEFAULT 0,
                finalized BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_batches_household ON import_batches(household_id);
            CREATE INDEX IF NOT EXISTS idx_batches_account ON import_batches(account_id);

            -- Staged rows parsed out of a statement, awaiting review
            CREATE TABLE IF NOT EXISTS import_rows (
                id INTEGER PRIMARY KEY,
                batch_id INTEGER NOT NULL REFERENCES import_batches(id) ON DELETE CASCADE,
                date DATE NOT NULL,
                amount REAL NOT NULL,                      -- signed, as parsed
                description TEXT NOT NULL,
                payee TEXT,
                check_number TEXT,
                external_id TEXT,
                raw_data TEXT,                             -- original record (JSON or raw OFX block)
                status TEXT NOT NULL DEFAULT 'pending',
                status_reason TEXT,
                suggested_category_id INTEGER REFERENCES categories(id),
                matched_transaction_id INTEGER REFERENCES transactions(id),
                created_transaction_id INTEGER REFERENCES transactions(id),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_import_rows_batch ON import_rows(batch_id);
            CREATE INDEX IF NOT EXISTS idx_import_rows_status ON import_rows(status);

            -- Recurring transactions
            CREATE TABLE IF NOT EXISTS recurring_transactions (
                id INTEGER PRIMARY KEY,
                household_id INTEGER NOT NULL REFERENCES households(id),
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                description TEXT NOT NULL,
                amount REAL NOT NULL,
                kind TEXT NOT NULL,
                category_id INTEGER REFERENCES categories(id),
                frequency TEXT NOT NULL,
                interval INTEGER NOT NULL DEFAULT 1,
                day_of_period INTEGER,
                next_occurrence DATE NOT NULL,
                active BOOLEAN NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_recurring_household ON recurring_transactions(household_id);
            CREATE INDEX IF NOT EXISTS idx_recurring_next ON recurring_transactions(next_occurrence);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
