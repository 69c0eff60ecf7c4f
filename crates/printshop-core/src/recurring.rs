//! # Recurring Expense Scheduler
//!
//! Scheduling policy for recurring expense definitions (rent, salaries,
//! subscriptions) and the monthly entries they materialize into.
//!
//! ## Responsibilities
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RecurringExpense (definition)                                          │
//! │       │                                                                 │
//! │       ├── is_due_for_month(y, m)      pure: does period (y, m) bill?   │
//! │       ├── compute_next_due_date(today) pure: first occurrence > today  │
//! │       ├── deactivate_if_expired(today) mutation: flips is_active      │
//! │       └── refresh_schedule(today)      both, run on every persist      │
//! │                                                                         │
//! │  plan_monthly_entries(defs, already_generated, y, m)                   │
//! │       └── one NewMonthlyEntry per eligible definition without an entry │
//! │           for (y, m). The store enforces the same uniqueness.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Occurrences step from `start_date` one period at a time, each step
//! clamped to month end. A schedule starting on the 31st therefore drifts to
//! the 29th after February (2024-01-31 → 02-29 → 03-29) and stays there.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::money::Money;
use crate::types::PaymentStatus;

// =============================================================================
// Frequency and Category
// =============================================================================

/// Billing period of a recurring expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl Frequency {
    /// Length of one period in calendar months.
    pub const fn months(&self) -> u32 {
        match self {
            Frequency::Monthly => 1,
            Frequency::Quarterly => 3,
            Frequency::HalfYearly => 6,
            Frequency::Yearly => 12,
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            Frequency::Monthly => "Monthly",
            Frequency::Quarterly => "Quarterly",
            Frequency::HalfYearly => "Half Yearly",
            Frequency::Yearly => "Yearly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Salary,
    Rent,
    Utilities,
    Insurance,
    Maintenance,
    Supplies,
    Marketing,
    Transport,
    ProfessionalServices,
    Telecommunications,
    Other,
}

// =============================================================================
// Definition
// =============================================================================

/// A recurring expense definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RecurringExpense {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: ExpenseCategory,
    pub amount: Money,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub auto_generate: bool,
    /// Derived by [`RecurringExpense::refresh_schedule`].
    pub next_due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller supplies for a definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringExpenseInput {
    pub name: String,
    pub description: Option<String>,
    pub category: ExpenseCategory,
    pub amount: Money,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub auto_generate: bool,
}

fn default_true() -> bool {
    true
}

impl RecurringExpense {
    /// Whether this definition bills in period (`year`, `month`).
    ///
    /// ## Example
    /// ```rust
    /// # use printshop_core::recurring::*;
    /// # use printshop_core::money::Money;
    /// # use chrono::{NaiveDate, Utc};
    /// let rent = RecurringExpense {
    ///     id: 1,
    ///     name: "Rent".into(),
    ///     description: None,
    ///     category: ExpenseCategory::Rent,
    ///     amount: Money::from_cents(50_000_00),
    ///     frequency: Frequency::Quarterly,
    ///     start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
    ///     end_date: None,
    ///     is_active: true,
    ///     auto_generate: true,
    ///     next_due_date: None,
    ///     created_at: Utc::now(),
    ///     updated_at: Utc::now(),
    /// };
    /// assert!(rent.is_due_for_month(2024, 4));
    /// assert!(!rent.is_due_for_month(2024, 2));
    /// ```
    pub fn is_due_for_month(&self, year: i32, month: u32) -> bool {
        if !self.is_active {
            return false;
        }
        let Some(target) = calendar::first_of_month(year, month) else {
            return false;
        };
        let start = self.start_date.with_day(1).unwrap_or(self.start_date);
        if target < start {
            return false;
        }
        if let Some(end) = self.end_date {
            let end_month = end.with_day(1).unwrap_or(end);
            if target > end_month {
                return false;
            }
        }

        let elapsed = calendar::months_between(start, target);
        match self.frequency {
            Frequency::Monthly => true,
            Frequency::Quarterly => elapsed % 3 == 0,
            Frequency::HalfYearly => elapsed % 6 == 0,
            Frequency::Yearly => target.month() == start.month(),
        }
    }

    /// First occurrence strictly after `today`, ignoring `end_date`.
    fn next_occurrence_after(&self, today: NaiveDate) -> NaiveDate {
        let period = self.frequency.months();
        let mut candidate = self.start_date;
        while candidate <= today {
            let next = calendar::add_months(candidate, period);
            if next == candidate {
                break;
            }
            candidate = next;
        }
        candidate
    }

    /// The next due date as of `today`, or `None` once the schedule has run
    /// past `end_date`. Does not touch `is_active`.
    pub fn compute_next_due_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        let next = self.next_occurrence_after(today);
        match self.end_date {
            Some(end) if next > end => None,
            _ => Some(next),
        }
    }

    /// Deactivates a definition whose schedule has run past `end_date`.
    /// Returns `true` when it changed `is_active`.
    pub fn deactivate_if_expired(&mut self, today: NaiveDate) -> bool {
        let expired = matches!(self.end_date, Some(end) if self.next_occurrence_after(today) > end);
        if expired && self.is_active {
            self.is_active = false;
            return true;
        }
        false
    }

    /// Recomputes `next_due_date` and deactivates expired definitions.
    /// Called by the store on every create and update.
    pub fn refresh_schedule(&mut self, today: NaiveDate) {
        self.next_due_date = self.compute_next_due_date(today);
        self.deactivate_if_expired(today);
    }

    /// Active definition whose next due date falls within `days` of `today`.
    pub fn is_due_within(&self, today: NaiveDate, days: i64) -> bool {
        let horizon = today + Duration::days(days);
        self.is_active
            && self
                .next_due_date
                .is_some_and(|due| due >= today && due <= horizon)
    }

    /// The entry this definition would produce for (`year`, `month`).
    pub fn entry_for(&self, year: i32, month: u32) -> Option<NewMonthlyEntry> {
        Some(NewMonthlyEntry {
            recurring_expense_id: self.id,
            year,
            month,
            amount: self.amount,
            payment_status: PaymentStatus::Unpaid,
            due_date: calendar::last_of_month(year, month)?,
        })
    }
}

/// Entries to create for (`year`, `month`).
///
/// Skips inactive definitions, definitions with `auto_generate` off,
/// definitions not due that month, and every id in `already_generated`.
pub fn plan_monthly_entries(
    definitions: &[RecurringExpense],
    already_generated: &HashSet<i64>,
    year: i32,
    month: u32,
) -> Vec<NewMonthlyEntry> {
    definitions
        .iter()
        .filter(|def| def.auto_generate && def.is_due_for_month(year, month))
        .filter(|def| !already_generated.contains(&def.id))
        .filter_map(|def| def.entry_for(year, month))
        .collect()
}

/// Sum of the amounts of active monthly definitions.
pub fn monthly_budget(definitions: &[RecurringExpense]) -> Money {
    definitions
        .iter()
        .filter(|d| d.is_active && d.frequency == Frequency::Monthly)
        .map(|d| d.amount)
        .sum()
}

// =============================================================================
// Monthly Entries
// =============================================================================

/// One period's materialized instance of a recurring expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MonthlyExpenseEntry {
    pub id: i64,
    pub recurring_expense_id: i64,
    /// Name of the owning definition, joined on read.
    #[cfg_attr(feature = "sqlx", sqlx(default))]
    pub recurring_expense_name: Option<String>,
    pub year: i32,
    pub month: u32,
    pub amount: Money,
    pub payment_status: PaymentStatus,
    /// Last day of the entry's month.
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An entry about to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMonthlyEntry {
    pub recurring_expense_id: i64,
    pub year: i32,
    pub month: u32,
    pub amount: Money,
    pub payment_status: PaymentStatus,
    pub due_date: NaiveDate,
}

impl MonthlyExpenseEntry {
    pub fn mark_paid(&mut self, payment_date: NaiveDate, notes: Option<String>) {
        self.payment_status = PaymentStatus::Paid;
        self.payment_date = Some(payment_date);
        if notes.is_some() {
            self.notes = notes;
        }
    }

    pub fn mark_unpaid(&mut self) {
        self.payment_status = PaymentStatus::Unpaid;
        self.payment_date = None;
    }

    /// Applies due-date escalation; called on every persist.
    pub fn refresh_status(&mut self, today: NaiveDate) {
        self.payment_status = self.payment_status.escalate(Some(self.due_date), today);
    }

    /// "March 2024".
    pub fn period_display(&self) -> String {
        format!("{} {}", calendar::month_name(self.month), self.year)
    }
}

/// Totals of one month's entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub entry_count: usize,
    pub total: Money,
    pub paid: Money,
    pub unpaid: Money,
}

pub fn summarize_entries(entries: &[MonthlyExpenseEntry]) -> MonthlyTotals {
    entries.iter().fold(MonthlyTotals::default(), |mut acc, e| {
        acc.entry_count += 1;
        acc.total += e.amount;
        if e.payment_status == PaymentStatus::Paid {
            acc.paid += e.amount;
        } else {
            acc.unpaid += e.amount;
        }
        acc
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn def(id: i64, frequency: Frequency, start: NaiveDate) -> RecurringExpense {
        RecurringExpense {
            id,
            name: format!("def-{id}"),
            description: None,
            category: ExpenseCategory::Rent,
            amount: Money::from_cents(10_000),
            frequency,
            start_date: start,
            end_date: None,
            is_active: true,
            auto_generate: true,
            next_due_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_monthly_due_from_start_month_on() {
        let e = def(1, Frequency::Monthly, d(2024, 1, 15));
        assert!(!e.is_due_for_month(2023, 12));
        for (y, m) in [(2024, 1), (2024, 2), (2024, 12), (2027, 6)] {
            assert!(e.is_due_for_month(y, m), "{y}-{m}");
        }
    }

    #[test]
    fn test_quarterly_cadence() {
        let e = def(1, Frequency::Quarterly, d(2024, 1, 1));
        assert!(e.is_due_for_month(2024, 1));
        assert!(!e.is_due_for_month(2024, 2));
        assert!(!e.is_due_for_month(2024, 3));
        assert!(e.is_due_for_month(2024, 4));
        assert!(e.is_due_for_month(2024, 7));
        assert!(e.is_due_for_month(2025, 1));
    }

    #[test]
    fn test_half_yearly_and_yearly() {
        let h = def(1, Frequency::HalfYearly, d(2024, 3, 5));
        assert!(h.is_due_for_month(2024, 9));
        assert!(!h.is_due_for_month(2024, 6));
        assert!(h.is_due_for_month(2025, 3));

        let y = def(2, Frequency::Yearly, d(2024, 3, 5));
        assert!(y.is_due_for_month(2024, 3));
        assert!(y.is_due_for_month(2026, 3));
        assert!(!y.is_due_for_month(2024, 4));
        assert!(!y.is_due_for_month(2023, 3));
    }

    #[test]
    fn test_end_date_and_inactive() {
        let mut e = def(1, Frequency::Monthly, d(2024, 1, 1));
        e.end_date = Some(d(2024, 6, 10));
        assert!(e.is_due_for_month(2024, 6));
        assert!(!e.is_due_for_month(2024, 7));

        e.is_active = false;
        assert!(!e.is_due_for_month(2024, 3));
    }

    #[test]
    fn test_invalid_month_is_not_due() {
        let e = def(1, Frequency::Monthly, d(2024, 1, 1));
        assert!(!e.is_due_for_month(2024, 13));
        assert!(!e.is_due_for_month(2024, 0));
    }

    #[test]
    fn test_compute_next_due_date() {
        let e = def(1, Frequency::Monthly, d(2024, 1, 15));
        assert_eq!(e.compute_next_due_date(d(2024, 3, 20)), Some(d(2024, 4, 15)));
        // Due today counts as passed.
        assert_eq!(e.compute_next_due_date(d(2024, 3, 15)), Some(d(2024, 4, 15)));
        // Not started yet: the start date itself.
        assert_eq!(e.compute_next_due_date(d(2023, 12, 1)), Some(d(2024, 1, 15)));

        let q = def(2, Frequency::Quarterly, d(2024, 1, 31));
        assert_eq!(q.compute_next_due_date(d(2024, 2, 1)), Some(d(2024, 4, 30)));
    }

    #[test]
    fn test_month_end_start_steps_through_short_month() {
        let e = def(1, Frequency::Monthly, d(2024, 1, 31));
        assert_eq!(e.compute_next_due_date(d(2024, 1, 31)), Some(d(2024, 2, 29)));
        // Stepped from 02-29, not re-anchored on the 31st.
        assert_eq!(e.compute_next_due_date(d(2024, 3, 15)), Some(d(2024, 3, 29)));
        assert_eq!(e.compute_next_due_date(d(2024, 3, 29)), Some(d(2024, 4, 29)));

        let q = def(2, Frequency::Quarterly, d(2023, 11, 30));
        // 11-30 → 02-29 → 05-29
        assert_eq!(q.compute_next_due_date(d(2024, 3, 1)), Some(d(2024, 5, 29)));

        let y = def(3, Frequency::Yearly, d(2024, 2, 29));
        // 2024-02-29 → 2025-02-28 → 2026-02-28
        assert_eq!(y.compute_next_due_date(d(2025, 3, 1)), Some(d(2026, 2, 28)));
    }

    #[test]
    fn test_occurrence_on_end_date_keeps_definition_active() {
        let mut e = def(1, Frequency::Monthly, d(2024, 1, 31));
        e.end_date = Some(d(2024, 3, 29));
        e.refresh_schedule(d(2024, 3, 15));
        assert_eq!(e.next_due_date, Some(d(2024, 3, 29)));
        assert!(e.is_active);

        let mut e = def(2, Frequency::Monthly, d(2024, 1, 31));
        e.end_date = Some(d(2024, 3, 30));
        e.refresh_schedule(d(2024, 3, 15));
        assert_eq!(e.next_due_date, Some(d(2024, 3, 29)));
        assert!(e.is_active);
    }

    #[test]
    fn test_occurrence_a_day_past_end_date_deactivates() {
        let mut e = def(1, Frequency::Monthly, d(2024, 1, 31));
        e.end_date = Some(d(2024, 3, 28));
        e.refresh_schedule(d(2024, 3, 15));
        assert_eq!(e.next_due_date, None);
        assert!(!e.is_active);
    }

    #[test]
    fn test_compute_next_due_date_is_pure() {
        let mut e = def(1, Frequency::Monthly, d(2024, 1, 1));
        e.end_date = Some(d(2024, 3, 1));
        let before = e.clone();
        assert_eq!(e.compute_next_due_date(d(2024, 5, 1)), None);
        assert_eq!(e, before);
    }

    #[test]
    fn test_deactivate_if_expired() {
        let mut e = def(1, Frequency::Monthly, d(2024, 1, 1));
        e.end_date = Some(d(2024, 3, 1));

        assert!(!e.deactivate_if_expired(d(2024, 1, 20)));
        assert!(e.is_active);

        assert!(e.deactivate_if_expired(d(2024, 3, 5)));
        assert!(!e.is_active);
        // Already inactive: nothing changes.
        assert!(!e.deactivate_if_expired(d(2024, 3, 5)));
    }

    #[test]
    fn test_refresh_schedule() {
        let mut e = def(1, Frequency::Monthly, d(2024, 1, 1));
        e.end_date = Some(d(2024, 3, 1));
        e.refresh_schedule(d(2024, 2, 10));
        assert_eq!(e.next_due_date, Some(d(2024, 3, 1)));
        assert!(e.is_active);

        e.refresh_schedule(d(2024, 3, 2));
        assert_eq!(e.next_due_date, None);
        assert!(!e.is_active);
    }

    #[test]
    fn test_plan_skips_existing_and_ineligible() {
        let monthly = def(1, Frequency::Monthly, d(2024, 1, 1));
        let quarterly = def(2, Frequency::Quarterly, d(2024, 1, 1));
        let mut manual = def(3, Frequency::Monthly, d(2024, 1, 1));
        manual.auto_generate = false;
        let mut inactive = def(4, Frequency::Monthly, d(2024, 1, 1));
        inactive.is_active = false;
        let generated = def(5, Frequency::Monthly, d(2024, 1, 1));

        let defs = vec![monthly, quarterly, manual, inactive, generated];
        let existing: HashSet<i64> = [5].into_iter().collect();

        let plan = plan_monthly_entries(&defs, &existing, 2024, 2);
        let ids: Vec<i64> = plan.iter().map(|e| e.recurring_expense_id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(plan[0].due_date, d(2024, 2, 29));
        assert_eq!(plan[0].payment_status, PaymentStatus::Unpaid);

        let plan = plan_monthly_entries(&defs, &existing, 2024, 4);
        let ids: Vec<i64> = plan.iter().map(|e| e.recurring_expense_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_monthly_budget_counts_active_monthly_only() {
        let a = def(1, Frequency::Monthly, d(2024, 1, 1));
        let b = def(2, Frequency::Yearly, d(2024, 1, 1));
        let mut c = def(3, Frequency::Monthly, d(2024, 1, 1));
        c.is_active = false;
        assert_eq!(monthly_budget(&[a, b, c]).cents(), 10_000);
    }

    #[test]
    fn test_due_within() {
        let mut e = def(1, Frequency::Monthly, d(2024, 1, 10));
        e.refresh_schedule(d(2024, 3, 5));
        assert!(e.is_due_within(d(2024, 3, 5), 7));
        assert!(!e.is_due_within(d(2024, 3, 1), 7));
    }

    #[test]
    fn test_entry_status_transitions() {
        let mut entry = MonthlyExpenseEntry {
            id: 1,
            recurring_expense_id: 1,
            recurring_expense_name: None,
            year: 2024,
            month: 3,
            amount: Money::from_cents(5000),
            payment_status: PaymentStatus::Unpaid,
            due_date: d(2024, 3, 31),
            payment_date: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(entry.period_display(), "March 2024");

        entry.refresh_status(d(2024, 3, 31));
        assert_eq!(entry.payment_status, PaymentStatus::Unpaid);
        entry.refresh_status(d(2024, 4, 1));
        assert_eq!(entry.payment_status, PaymentStatus::Overdue);

        entry.mark_paid(d(2024, 4, 2), Some("cash".to_string()));
        assert_eq!(entry.payment_status, PaymentStatus::Paid);
        entry.refresh_status(d(2024, 5, 1));
        assert_eq!(entry.payment_status, PaymentStatus::Paid);

        entry.mark_unpaid();
        assert_eq!(entry.payment_date, None);

        let totals = summarize_entries(&[entry]);
        assert_eq!(totals.unpaid.cents(), 5000);
        assert!(totals.paid.is_zero());
    }
}
