//! Rule-based auto-categorization of staged import rows
//!
//! Rules are evaluated active-only in ascending priority order (lower
//! number first, ties by id); the first rule whose pattern matches the row
//! description wins. A rule with an invalid regex is logged and skipped
//! rather than failing the scan.

use regex::RegexBuilder;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::Result;
use crate::models::{CategoryRule, MatchType, RowStatus};

/// The winning rule for a description
#[derive(Debug, Clone)]
pub struct RuleMatch {
    pub rule_id: i64,
    pub category_id: i64,
    pub payee: Option<String>,
}

/// Rule engine over a household's category rules
pub struct Categorizer<'a> {
    db: &'a Database,
}

impl<'a> Categorizer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Apply the household's rules to a batch's pending rows. On a match the
    /// row gets its suggested category (and payee override), flips to
    /// auto_matched, and the rule's usage counters are bumped. Returns the
    /// number of rows matched.
    pub fn scan_batch(&self, household_id: i64, batch_id: i64) -> Result<usize> {
        let rules = self.db.list_active_rules(household_id)?;
        if rules.is_empty() {
            return Ok(0);
        }

        let rows = self.db.list_batch_rows(batch_id)?;
        let mut matched = 0;

        for row in rows.iter().filter(|r| r.status == RowStatus::Pending) {
            if let Some(m) = first_match(&rules, &row.description) {
                debug!(
                    "Rule {} matched staged row {} ('{}')",
                    m.rule_id, row.id, row.description
                );
                self.db
                    .apply_rule_suggestion(row.id, m.category_id, m.payee.as_deref())?;
                self.db.record_rule_match(m.rule_id)?;
                matched += 1;
            }
        }

        info!(
            "Categorization for batch {}: {} of {} rows matched",
            batch_id,
            matched,
            rows.len()
        );
        Ok(matched)
    }

    /// Dry-run: which rule would match a sample description. Does not touch
    /// usage counters.
    pub fn test_description(&self, household_id: i64, description: &str) -> Result<Option<RuleMatch>> {
        let rules = self.db.list_active_rules(household_id)?;
        Ok(first_match(&rules, description))
    }
}

/// Evaluate rules in order and return the first match
pub fn first_match(rules: &[CategoryRule], description: &str) -> Option<RuleMatch> {
    for rule in rules {
        match pattern_matches(description, &rule.pattern, rule.match_type) {
            Ok(true) => {
                return Some(RuleMatch {
                    rule_id: rule.id,
                    category_id: rule.category_id,
                    payee: rule.payee.clone(),
                })
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Skipping rule {} with invalid pattern: {}", rule.id, e);
            }
        }
    }
    None
}

/// Check if a description matches a pattern, per the rule's match type.
/// All match types are case-insensitive.
pub fn pattern_matches(description: &str, pattern: &str, match_type: MatchType) -> Result<bool> {
    let desc_upper = description.to_uppercase();

    match match_type {
        MatchType::Contains => Ok(desc_upper.contains(&pattern.to_uppercase())),
        MatchType::StartsWith => Ok(desc_upper.starts_with(&pattern.to_uppercase())),
        MatchType::Exact => Ok(desc_upper == pattern.to_uppercase()),
        MatchType::Regex => {
            let re = RegexBuilder::new(pattern).case_insensitive(true).build()?;
            Ok(re.is_match(description))
        }
    }
}
