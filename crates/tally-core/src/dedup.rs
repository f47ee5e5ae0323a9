//! Two-tier duplicate detection for staged import rows
//!
//! Tier 1 matches on the bank's own transaction id (FITID) and is
//! authoritative. Tier 2 falls back to a fuzzy comparison: same date,
//! amount within a small tolerance, and similar normalized descriptions.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::db::Database;
use crate::error::Result;
use crate::models::{ImportBatch, RowStatus, StagedTransaction, Transaction};

/// Reason recorded for a tier-1 (external id) match
pub const EXTERNAL_ID_REASON: &str = "matched by bank transaction ID";

/// Reason recorded for a tier-2 (fuzzy) match
pub const FUZZY_MATCH_REASON: &str = "similar transaction on same date";

/// Absolute amount tolerance for fuzzy matching. Signs are not staged
/// consistently across statement formats, so absolute values are compared.
pub const AMOUNT_TOLERANCE: f64 = 0.01;

/// Duplicate detector over a batch of staged rows
pub struct DuplicateDetector<'a> {
    db: &'a Database,
}

impl<'a> DuplicateDetector<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Flag pending rows of a batch that duplicate committed transactions
    /// in the target account. Returns the number of duplicates found and
    /// records it on the batch.
    pub fn scan_batch(&self, household_id: i64, batch: &ImportBatch) -> Result<usize> {
        let existing = self
            .db
            .list_account_transactions(household_id, batch.account_id)?;
        let rows = self.db.list_batch_rows(batch.id)?;

        let mut duplicates = 0;
        for row in rows.iter().filter(|r| r.status == RowStatus::Pending) {
            if let Some((transaction_id, reason)) = find_duplicate(row, &existing) {
                debug!(
                    "Staged row {} duplicates transaction {} ({})",
                    row.id, transaction_id, reason
                );
                self.db.mark_row_duplicate(row.id, transaction_id, reason)?;
                duplicates += 1;
            }
        }

        self.db.update_batch_duplicates(batch.id, duplicates as i64)?;
        info!(
            "Duplicate scan for batch {}: {} of {} rows flagged",
            batch.id,
            duplicates,
            rows.len()
        );
        Ok(duplicates)
    }
}

/// Find the existing transaction a staged row duplicates, if any
fn find_duplicate(
    row: &StagedTransaction,
    existing: &[Transaction],
) -> Option<(i64, &'static str)> {
    // Tier 1: the bank's transaction id is authoritative
    if let Some(ext) = row.external_id.as_deref().map(str::trim) {
        if !ext.is_empty() {
            for tx in existing {
                if let Some(tx_ext) = tx.external_id.as_deref().map(str::trim) {
                    if tx_ext.eq_ignore_ascii_case(ext) {
                        return Some((tx.id, EXTERNAL_ID_REASON));
                    }
                }
            }
        }
    }

    // Tier 2: same date, close amount, similar normalized description
    let row_norm = normalize_description(&row.description);
    for tx in existing {
        if tx.date != row.date {
            continue;
        }
        if (tx.amount.abs() - row.amount.abs()).abs() > AMOUNT_TOLERANCE {
            continue;
        }
        if descriptions_similar(&row_norm, &normalize_description(&tx.description)) {
            return Some((tx.id, FUZZY_MATCH_REASON));
        }
    }

    None
}

fn embedded_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{1,2}/\d{1,2}(/\d{2,4})?").expect("static regex"))
}

fn reference_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Explicit REF/TRACE prefixes, or any long digit run
    RE.get_or_init(|| Regex::new(r"(REF|TRACE)\s*#?\s*\d+|\d{6,}").expect("static regex"))
}

fn masked_card_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[X\*]{2,}\d{2,6}").expect("static regex"))
}

fn non_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Z0-9]").expect("static regex"))
}

/// Normalize a description for fuzzy comparison: uppercase, strip embedded
/// dates, reference/trace numbers, masked card numbers, then every
/// remaining non-alphanumeric character.
fn normalize_description(description: &str) -> String {
    let upper = description.to_uppercase();
    let stripped = embedded_date_re().replace_all(&upper, "");
    let stripped = masked_card_re().replace_all(&stripped, "");
    let stripped = reference_number_re().replace_all(&stripped, "");
    non_word_re().replace_all(&stripped, "").to_string()
}

/// Two normalized descriptions are similar when one contains the other
fn descriptions_similar(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(b) || b.contains(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono::Utc;
    use crate::models::TransactionKind;

    fn staged(
        date: NaiveDate,
        amount: f64,
        description: &str,
        external_id: Option<&str>,
    ) -> StagedTransaction {
        StagedTransaction {
            id: 1,
            batch_id: 1,
            date,
            amount,
            description: description.to_string(),
            payee: None,
            check_number: None,
            external_id: external_id.map(String::from),
            raw_data: None,
            status: RowStatus::Pending,
            status_reason: None,
            suggested_category_id: None,
            matched_transaction_id: None,
            created_transaction_id: None,
            created_at: Utc::now(),
        }
    }

    fn ledger(
        id: i64,
        date: NaiveDate,
        amount: f64,
        description: &str,
        external_id: Option<&str>,
    ) -> Transaction {
        Transaction {
            id,
            household_id: 1,
            account_id: 1,
            date,
            amount,
            kind: TransactionKind::Expense,
            description: description.to_string(),
            payee: None,
            category_id: None,
            external_id: external_id.map(String::from),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_external_id_match_is_case_insensitive() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let row = staged(date, -42.50, "AMAZON.COM", Some("abc123"));
        let existing = vec![ledger(7, date, 42.50, "something else entirely", Some("ABC123"))];

        assert_eq!(
            find_duplicate(&row, &existing),
            Some((7, EXTERNAL_ID_REASON))
        );
    }

    #[test]
    fn test_external_id_beats_fuzzy() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let row = staged(date, -42.50, "AMAZON.COM", Some("FIT-2"));
        let existing = vec![
            // Fuzzy candidate listed first
            ledger(1, date, 42.50, "AMAZON.COM", None),
            ledger(2, date, 42.50, "AMAZON.COM", Some("FIT-2")),
        ];

        assert_eq!(find_duplicate(&row, &existing), Some((2, EXTERNAL_ID_REASON)));
    }

    #[test]
    fn test_fuzzy_match_requires_same_date() {
        let row = staged(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            -42.50,
            "AMAZON.COM",
            None,
        );
        let existing = vec![ledger(
            1,
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
            42.50,
            "AMAZON.COM",
            None,
        )];

        assert_eq!(find_duplicate(&row, &existing), None);
    }

    #[test]
    fn test_fuzzy_match_amount_tolerance() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let existing = vec![ledger(1, date, 42.50, "AMAZON.COM", None)];

        // Signs differ (ledger stores absolute amounts), still a match
        let close = staged(date, -42.505, "AMAZON.COM", None);
        assert_eq!(
            find_duplicate(&close, &existing),
            Some((1, FUZZY_MATCH_REASON))
        );

        let far = staged(date, -42.60, "AMAZON.COM", None);
        assert_eq!(find_duplicate(&far, &existing), None);
    }

    #[test]
    fn test_fuzzy_match_normalizes_noise() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let existing = vec![ledger(1, date, 42.50, "AMAZON.COM AMZN.COM/BILL", None)];

        // Card mask, embedded date, and trace number all stripped
        let row = staged(
            date,
            -42.50,
            "AMAZON.COM AMZN.COM/BILL XXXX1234 01/15 TRACE #774421",
            None,
        );
        assert_eq!(
            find_duplicate(&row, &existing),
            Some((1, FUZZY_MATCH_REASON))
        );
    }

    #[test]
    fn test_empty_normalized_descriptions_never_match() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let existing = vec![ledger(1, date, 42.50, "1234567890", None)];
        let row = staged(date, -42.50, "01/15 998877665544", None);

        assert_eq!(find_duplicate(&row, &existing), None);
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(
            normalize_description("Amazon.com*ABC 01/15/24 XXXX4421"),
            "AMAZONCOMABC"
        );
        assert_eq!(normalize_description("REF# 1234"), "");
    }
}
