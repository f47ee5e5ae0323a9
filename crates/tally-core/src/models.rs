//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A household: the tenant unit that owns accounts, transactions, and all
/// other financial data. Every entity lookup is scoped to a household, and
/// an ownership mismatch behaves exactly like "not found".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Household {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Account types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Checking,
    Savings,
    Credit,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("Unknown account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bank account within a household
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub household_id: i64,
    pub name: String,
    pub account_type: Option<AccountType>,
    /// Running balance, updated as imports are confirmed and recurring
    /// occurrences are processed
    pub balance: f64,
    pub created_at: DateTime<Utc>,
}

/// A new account to be created
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub account_type: Option<AccountType>,
}

/// Ledger transaction kind. Amounts are stored non-negative; the kind
/// carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A spending/income category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub household_id: i64,
    pub name: String,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>,
}

/// A new category to be created
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub kind: TransactionKind,
}

/// A committed ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub household_id: i64,
    pub account_id: i64,
    pub date: NaiveDate,
    /// Always non-negative; sign is implied by `kind`
    pub amount: f64,
    pub kind: TransactionKind,
    pub description: String,
    pub payee: Option<String>,
    pub category_id: Option<i64>,
    /// Bank-assigned reference (FITID), carried for future duplicate
    /// detection
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A new ledger transaction (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    pub kind: TransactionKind,
    pub description: String,
    pub payee: Option<String>,
    pub category_id: Option<i64>,
    pub external_id: Option<String>,
}

/// Pattern matching type for category rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Case-insensitive substring match
    Contains,
    /// Case-insensitive prefix match
    StartsWith,
    /// Exact string match (case-insensitive)
    Exact,
    /// Regular expression match (case-insensitive)
    Regex,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::Exact => "exact",
            Self::Regex => "regex",
        }
    }
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" => Ok(Self::Contains),
            "starts_with" | "startswith" => Ok(Self::StartsWith),
            "exact" => Ok(Self::Exact),
            "regex" => Ok(Self::Regex),
            _ => Err(format!("Unknown match type: {}", s)),
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ordered pattern for auto-assigning a category (and optionally a
/// payee) to staged transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub id: i64,
    pub household_id: i64,
    pub pattern: String,
    pub match_type: MatchType,
    pub category_id: i64,
    /// Payee override applied when the rule matches
    pub payee: Option<String>,
    /// Lower values are evaluated first
    pub priority: i32,
    pub active: bool,
    pub match_count: i64,
    pub last_matched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A new category rule to be created
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategoryRule {
    pub pattern: String,
    pub match_type: MatchType,
    pub category_id: i64,
    pub payee: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    100
}

/// Detected statement file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementFormat {
    Csv,
    Ofx,
}

impl StatementFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Ofx => "ofx",
        }
    }
}

impl std::str::FromStr for StatementFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "ofx" | "qfx" => Ok(Self::Ofx),
            _ => Err(format!("Unknown statement format: {}", s)),
        }
    }
}

impl std::fmt::Display for StatementFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a staged import row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    /// Parsed, awaiting duplicate detection / categorization / review
    Pending,
    /// A category rule matched and suggested a category
    AutoMatched,
    /// Committed to the ledger (terminal)
    Imported,
    /// Skipped at confirmation (terminal)
    Skipped,
    /// Flagged as a likely duplicate of an existing transaction (terminal
    /// unless the caller explicitly includes it in a confirmation, in
    /// which case it becomes Skipped)
    Duplicate,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AutoMatched => "auto_matched",
            Self::Imported => "imported",
            Self::Skipped => "skipped",
            Self::Duplicate => "duplicate",
        }
    }
}

impl std::str::FromStr for RowStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "auto_matched" => Ok(Self::AutoMatched),
            "imported" => Ok(Self::Imported),
            "skipped" => Ok(Self::Skipped),
            "duplicate" => Ok(Self::Duplicate),
            _ => Err(format!("Unknown row status: {}", s)),
        }
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One statement-upload event and its processing counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub id: i64,
    pub household_id: i64,
    pub account_id: i64,
    pub filename: String,
    pub format: StatementFormat,
    pub total_rows: i64,
    pub duplicate_count: i64,
    pub imported_count: i64,
    pub skipped_count: i64,
    pub finalized: bool,
    pub created_at: DateTime<Utc>,
}

/// A staged transaction: one parsed statement row awaiting review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedTransaction {
    pub id: i64,
    pub batch_id: i64,
    pub date: NaiveDate,
    /// Signed as it appeared in the statement
    pub amount: f64,
    pub description: String,
    pub payee: Option<String>,
    pub check_number: Option<String>,
    /// Bank-assigned reference (FITID)
    pub external_id: Option<String>,
    /// Original source record (JSON for CSV rows, raw block for OFX)
    pub raw_data: Option<String>,
    pub status: RowStatus,
    pub status_reason: Option<String>,
    pub suggested_category_id: Option<i64>,
    /// The pre-existing transaction this row duplicates, if any
    pub matched_transaction_id: Option<i64>,
    /// The ledger transaction this row created, once imported
    pub created_transaction_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A parsed statement row (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewStagedTransaction {
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub payee: Option<String>,
    pub check_number: Option<String>,
    pub external_id: Option<String>,
    pub raw_data: Option<String>,
}

/// A reviewer's per-row decision when confirming an import batch. Rows not
/// listed are left untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct RowDecision {
    pub row_id: i64,
    /// Overrides the suggested category when set
    pub category_id: Option<i64>,
    #[serde(default)]
    pub skip: bool,
}

/// Recurring transaction frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    BiWeekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::BiWeekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "biweekly" | "bi_weekly" => Ok(Self::BiWeekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction that repeats on a schedule (wages, rent, subscriptions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTransaction {
    pub id: i64,
    pub household_id: i64,
    pub account_id: i64,
    pub description: String,
    /// Non-negative; sign implied by `kind`
    pub amount: f64,
    pub kind: TransactionKind,
    pub category_id: Option<i64>,
    pub frequency: Frequency,
    /// Multiplier on the frequency (every N days/weeks/months/...)
    pub interval: u32,
    /// Weekday number from Monday (0-6) for weekly/biweekly, day of month
    /// for monthly/quarterly/yearly. Defaults from the start date.
    pub day_of_period: Option<u32>,
    pub next_occurrence: NaiveDate,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A new recurring transaction to be created
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecurringTransaction {
    pub account_id: i64,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category_id: Option<i64>,
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    pub day_of_period: Option<u32>,
    /// The date the schedule starts from; the first occurrence is computed
    /// from this date
    pub start_date: NaiveDate,
}

fn default_interval() -> u32 {
    1
}
