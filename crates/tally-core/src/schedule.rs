//! Occurrence date arithmetic for recurring transactions
//!
//! Computes the next occurrence of a recurring transaction from its
//! last/starting date, and materializes due occurrences into ledger
//! transactions. Processing is an explicit user-triggered action, not a
//! background timer.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use tracing::{debug, info};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Frequency, NewTransaction, RecurringTransaction, TransactionKind};

/// Compute the next occurrence date.
///
/// `day_of_period` is a weekday number from Monday (0-6) for weekly and
/// biweekly schedules, a day of month (1-31) otherwise; it defaults to the
/// from-date's weekday/day. Monthly-family targets are clamped to the
/// length of the resulting month.
pub fn next_occurrence(
    from: NaiveDate,
    frequency: Frequency,
    interval: u32,
    day_of_period: Option<u32>,
) -> NaiveDate {
    let interval = interval.max(1);

    match frequency {
        Frequency::Daily => from + Days::new(interval as u64),
        Frequency::Weekly => next_weekday_occurrence(from, interval, day_of_period),
        Frequency::BiWeekly => next_weekday_occurrence(from, interval * 2, day_of_period),
        Frequency::Monthly => add_months_clamped(from, interval, day_of_period),
        Frequency::Quarterly => add_months_clamped(from, interval * 3, day_of_period),
        Frequency::Yearly => add_months_clamped(from, interval * 12, day_of_period),
    }
}

/// Advance to the first occurrence of the target weekday strictly after
/// `from`, then add the remaining whole weeks.
fn next_weekday_occurrence(from: NaiveDate, weeks_to_add: u32, day_of_period: Option<u32>) -> NaiveDate {
    let target = day_of_period
        .and_then(weekday_from_number)
        .unwrap_or_else(|| from.weekday());

    let mut date = from + Days::new(1);
    while date.weekday() != target {
        date = date + Days::new(1);
    }

    date + Days::new(((weeks_to_add.max(1) - 1) * 7) as u64)
}

fn weekday_from_number(n: u32) -> Option<Weekday> {
    match n {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

/// Add months, then restore the target day-of-month clamped to the length
/// of the resulting month (day 31 in February becomes the 28th/29th).
fn add_months_clamped(from: NaiveDate, months: u32, day_of_period: Option<u32>) -> NaiveDate {
    let shifted = from + Months::new(months);
    let target = day_of_period.unwrap_or_else(|| from.day()).clamp(1, 31);
    let day = target.min(days_in_month(shifted.year(), shifted.month()));

    NaiveDate::from_ymd_opt(shifted.year(), shifted.month(), day).unwrap_or(shifted)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    // The day before the first of the next month is the last day of this one
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Processes and skips recurring occurrences
pub struct RecurringProcessor<'a> {
    db: &'a Database,
}

impl<'a> RecurringProcessor<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Materialize the next occurrence as a ledger transaction, adjust the
    /// account balance, and advance the schedule.
    pub fn process(&self, household_id: i64, id: i64) -> Result<RecurringTransaction> {
        let rec = self.db.get_recurring_transaction(household_id, id)?;
        if !rec.active {
            return Err(Error::InvalidData(format!(
                "recurring transaction {} is inactive",
                id
            )));
        }

        self.db.insert_transaction(
            household_id,
            &NewTransaction {
                account_id: rec.account_id,
                date: rec.next_occurrence,
                amount: rec.amount,
                kind: rec.kind,
                description: rec.description.clone(),
                payee: None,
                category_id: rec.category_id,
                external_id: None,
            },
        )?;

        // Income adds to the balance; expenses and outgoing transfers subtract
        let delta = match rec.kind {
            TransactionKind::Income => rec.amount,
            TransactionKind::Expense | TransactionKind::Transfer => -rec.amount,
        };
        self.db
            .adjust_account_balance(household_id, rec.account_id, delta)?;

        self.advance(household_id, &rec)
    }

    /// Advance the schedule without materializing a transaction
    pub fn skip(&self, household_id: i64, id: i64) -> Result<RecurringTransaction> {
        let rec = self.db.get_recurring_transaction(household_id, id)?;
        self.advance(household_id, &rec)
    }

    /// Process every active recurring transaction due on or before `as_of`.
    /// Returns the number of occurrences materialized.
    pub fn process_due(&self, household_id: i64, as_of: NaiveDate) -> Result<usize> {
        let due = self.db.list_due_recurring_transactions(household_id, as_of)?;
        let mut processed = 0;
        for rec in due {
            self.process(household_id, rec.id)?;
            processed += 1;
        }
        info!(
            "Processed {} due recurring transactions for household {}",
            processed, household_id
        );
        Ok(processed)
    }

    fn advance(&self, household_id: i64, rec: &RecurringTransaction) -> Result<RecurringTransaction> {
        let next = next_occurrence(
            rec.next_occurrence,
            rec.frequency,
            rec.interval,
            rec.day_of_period,
        );
        debug!(
            "Recurring transaction {} advanced from {} to {}",
            rec.id, rec.next_occurrence, next
        );
        self.db.set_next_occurrence(rec.id, next)?;
        self.db.get_recurring_transaction(household_id, rec.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily() {
        assert_eq!(
            next_occurrence(date(2024, 1, 15), Frequency::Daily, 1, None),
            date(2024, 1, 16)
        );
        assert_eq!(
            next_occurrence(date(2024, 1, 15), Frequency::Daily, 10, None),
            date(2024, 1, 25)
        );
    }

    #[test]
    fn test_weekly_defaults_to_from_weekday() {
        // 2024-01-15 is a Monday; next Monday is the 22nd
        assert_eq!(
            next_occurrence(date(2024, 1, 15), Frequency::Weekly, 1, None),
            date(2024, 1, 22)
        );
    }

    #[test]
    fn test_weekly_target_weekday() {
        // Friday (4) strictly after Monday the 15th is the 19th
        assert_eq!(
            next_occurrence(date(2024, 1, 15), Frequency::Weekly, 1, Some(4)),
            date(2024, 1, 19)
        );
        // Target equal to the from-weekday must still move strictly forward
        assert_eq!(
            next_occurrence(date(2024, 1, 15), Frequency::Weekly, 1, Some(0)),
            date(2024, 1, 22)
        );
    }

    #[test]
    fn test_weekly_interval() {
        // Every 2 weeks: first next Monday, then one more week
        assert_eq!(
            next_occurrence(date(2024, 1, 15), Frequency::Weekly, 2, None),
            date(2024, 1, 29)
        );
    }

    #[test]
    fn test_biweekly_doubles_weeks() {
        assert_eq!(
            next_occurrence(date(2024, 1, 15), Frequency::BiWeekly, 1, None),
            date(2024, 1, 29)
        );
    }

    #[test]
    fn test_monthly_clamps_to_short_months() {
        // Day 31 into February: leap year clamps to the 29th
        assert_eq!(
            next_occurrence(date(2024, 1, 31), Frequency::Monthly, 1, Some(31)),
            date(2024, 2, 29)
        );
        // Non-leap year clamps to the 28th
        assert_eq!(
            next_occurrence(date(2023, 1, 31), Frequency::Monthly, 1, Some(31)),
            date(2023, 2, 28)
        );
    }

    #[test]
    fn test_monthly_restores_target_day_after_short_month() {
        // From Feb 29 with a day-31 target, March has 31 days again
        assert_eq!(
            next_occurrence(date(2024, 2, 29), Frequency::Monthly, 1, Some(31)),
            date(2024, 3, 31)
        );
    }

    #[test]
    fn test_monthly_defaults_to_from_day() {
        assert_eq!(
            next_occurrence(date(2024, 1, 15), Frequency::Monthly, 1, None),
            date(2024, 2, 15)
        );
        assert_eq!(
            next_occurrence(date(2024, 1, 15), Frequency::Monthly, 3, None),
            date(2024, 4, 15)
        );
    }

    #[test]
    fn test_quarterly_and_yearly() {
        assert_eq!(
            next_occurrence(date(2024, 1, 15), Frequency::Quarterly, 1, None),
            date(2024, 4, 15)
        );
        assert_eq!(
            next_occurrence(date(2024, 1, 15), Frequency::Yearly, 1, None),
            date(2025, 1, 15)
        );
        // Leap day yearly advance clamps to Feb 28
        assert_eq!(
            next_occurrence(date(2024, 2, 29), Frequency::Yearly, 1, None),
            date(2025, 2, 28)
        );
    }

    #[test]
    fn test_zero_interval_treated_as_one() {
        assert_eq!(
            next_occurrence(date(2024, 1, 15), Frequency::Daily, 0, None),
            date(2024, 1, 16)
        );
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 4), 30);
    }
}
