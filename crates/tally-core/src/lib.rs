//! Tally Core Library
//!
//! Shared functionality for the Tally household finance tracker:
//! - Database access and migrations
//! - Bank statement parsers (CSV and OFX/QFX)
//! - Two-tier duplicate detection for staged imports
//! - Rule-based auto-categorization
//! - Confirmation committer (staged rows into ledger transactions)
//! - Recurring transaction occurrence arithmetic

pub mod commit;
pub mod db;
pub mod dedup;
pub mod error;
pub mod import;
pub mod models;
pub mod rules;
pub mod schedule;

pub use commit::Committer;
pub use db::Database;
pub use dedup::DuplicateDetector;
pub use error::{Error, Result};
pub use import::{detect_format, parse_statement};
pub use rules::Categorizer;
pub use schedule::{next_occurrence, RecurringProcessor};
