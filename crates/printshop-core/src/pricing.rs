//! # Financial Calculator
//!
//! Recomputes the derived money fields of a print job immediately before
//! it is written.
//!
//! ## Per-Variant Formulas
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines = Σ expenses[].amount                                            │
//! │                                                                         │
//! │  Digital      expenses_cost = lines                                     │
//! │               total_amount  = (caller supplied)                         │
//! │                                                                         │
//! │  Offset       expenses_cost = supplier_job_amount + lines               │
//! │               total_amount  = expenses_cost + expenses_cost × pct       │
//! │                                                                         │
//! │  Duplo        subtotal      = base_cost + other_expenses + lines        │
//! │               total_amount  = subtotal + subtotal × pct                 │
//! │                                                                         │
//! │  Sublimation  base          = unit_price × quantity                     │
//! │               subtotal      = base + other_expenses + lines             │
//! │               total_profit  = subtotal × pct            (pct def. 20)   │
//! │               total_amount  = subtotal + total_profit                   │
//! │                                                                         │
//! │  Other        expenses_cost = total_cost                                │
//! │               total_amount  = (caller supplied)                         │
//! │               profit, profit % are read-only views                      │
//! │                                                                         │
//! │  then, for all:  balance = total_amount - amount_paid                   │
//! │                  payment_status = PaymentStatus::from_amounts(..)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Missing Inputs
//! Absent numeric inputs are replaced with their defaults before any math
//! runs, and the defaults are written back to the record. The calculator
//! never fails.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::print_job::{
    DuploDetails, JobRecord, OffsetDetails, OtherDetails, PrintDetails, PrintExpense,
    SublimationDetails,
};
use crate::types::{PaymentStatus, Percentage};

/// Default sublimation markup.
pub const DEFAULT_SUBLIMATION_PROFIT: Percentage = Percentage::from_whole(20);

/// Default sublimation quantity when none is entered.
pub const DEFAULT_SUBLIMATION_QUANTITY: i64 = 1;

// =============================================================================
// Breakdown
// =============================================================================

/// Read-only explanation of how a job's totals were reached.
///
/// Not persisted; rebuilt on demand with [`breakdown`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Variant-specific base (supplier amount, base cost, unit × qty).
    pub base_cost: Money,
    /// Sum of the job's line items.
    pub line_items: Money,
    /// Cost basis, equal to `expenses_cost` after recalculation.
    pub subtotal: Money,
    /// `total_amount - subtotal`.
    pub profit: Money,
    /// Profit relative to cost, in percent with 2 decimals. Zero when the
    /// cost is zero.
    pub profit_percentage: Decimal,
    pub total_amount: Money,
}

// =============================================================================
// Entry Points
// =============================================================================

/// Sum of line-item amounts.
pub fn line_item_total(expenses: &[PrintExpense]) -> Money {
    expenses.iter().map(|e| e.amount).sum()
}

/// Recomputes every derived field of `job` in place.
///
/// ## Example
/// ```rust
/// use printshop_core::money::Money;
/// use printshop_core::print_job::{DuploDetails, JobRecord, PrintDetails};
/// use printshop_core::pricing::recalculate;
/// use printshop_core::types::{PaymentStatus, Percentage};
///
/// let mut job = JobRecord {
///     job_number: "DP-1".into(),
///     job_name: None,
///     job_description: None,
///     customer_id: None,
///     customer_name: None,
///     amount_paid: Money::zero(),
///     expenses_cost: Money::zero(),
///     total_amount: Money::zero(),
///     balance: Money::zero(),
///     payment_status: PaymentStatus::Unpaid,
///     expenses: vec![],
///     details: PrintDetails::Duplo(DuploDetails {
///         base_cost: Some(Money::from_cents(10000)),
///         other_expenses: Some(Money::from_cents(2000)),
///         profit_percentage: Some(Percentage::from_whole(15)),
///         ..Default::default()
///     }),
/// };
///
/// recalculate(&mut job);
/// assert_eq!(job.total_amount.cents(), 13800);
/// assert_eq!(job.balance.cents(), 13800);
/// ```
pub fn recalculate(job: &mut JobRecord) -> PriceBreakdown {
    let lines = line_item_total(&job.expenses);

    let (base_cost, subtotal) = match &mut job.details {
        PrintDetails::Digital(_) => (Money::zero(), lines),
        PrintDetails::Offset(d) => {
            let base = offset_base(d);
            let subtotal = base + lines;
            let pct = d.profit_percentage.unwrap_or_default();
            job.total_amount = subtotal + subtotal.percentage_of(pct);
            (base, subtotal)
        }
        PrintDetails::Duplo(d) => {
            let base = duplo_base(d);
            let subtotal = base + lines;
            let pct = d.profit_percentage.unwrap_or_default();
            job.total_amount = subtotal + subtotal.percentage_of(pct);
            (base, subtotal)
        }
        PrintDetails::Sublimation(d) => {
            let base = sublimation_base(d);
            let subtotal = base + d.other_expenses.unwrap_or_default() + lines;
            let pct = d.profit_percentage.unwrap_or(DEFAULT_SUBLIMATION_PROFIT);
            d.subtotal = subtotal;
            d.total_profit = subtotal.percentage_of(pct);
            job.total_amount = subtotal + d.total_profit;
            (base, subtotal)
        }
        PrintDetails::Other(d) => {
            let cost = other_cost(d);
            (cost, cost)
        }
    };

    job.expenses_cost = subtotal;
    settle(job);

    PriceBreakdown {
        base_cost,
        line_items: lines,
        subtotal,
        profit: job.total_amount - subtotal,
        profit_percentage: profit_percentage(job.total_amount - subtotal, subtotal),
        total_amount: job.total_amount,
    }
}

/// Recomputes `balance` and `payment_status` from `total_amount` and
/// `amount_paid` only. Used after a payment is recorded.
pub fn settle(job: &mut JobRecord) {
    job.balance = job.total_amount - job.amount_paid;
    job.payment_status = PaymentStatus::from_amounts(job.amount_paid, job.total_amount);
}

/// Breakdown of an already-calculated job without mutating it.
pub fn breakdown(job: &JobRecord) -> PriceBreakdown {
    let mut copy = job.clone();
    recalculate(&mut copy)
}

/// `(profit / cost) × 100`, the ratio held at 4 decimals before scaling.
///
/// ## Example
/// ```rust
/// use printshop_core::money::Money;
/// use printshop_core::pricing::profit_percentage;
/// use rust_decimal::Decimal;
///
/// // 50 profit on 150 cost → 0.3333 → 33.33%
/// let pct = profit_percentage(Money::from_cents(5000), Money::from_cents(15000));
/// assert_eq!(pct, Decimal::new(3333, 2));
/// assert_eq!(profit_percentage(Money::from_cents(100), Money::zero()), Decimal::ZERO);
/// ```
pub fn profit_percentage(profit: Money, cost: Money) -> Decimal {
    if cost.is_zero() {
        return Decimal::ZERO;
    }
    let ratio = (profit.to_decimal() / cost.to_decimal())
        .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
    ratio * Decimal::ONE_HUNDRED
}

// =============================================================================
// Default Substitution
// =============================================================================

fn offset_base(d: &mut OffsetDetails) -> Money {
    let amount = *d.supplier_job_amount.get_or_insert(Money::zero());
    d.profit_percentage.get_or_insert(Percentage::zero());
    amount
}

fn duplo_base(d: &mut DuploDetails) -> Money {
    let base = *d.base_cost.get_or_insert(Money::zero());
    let other = *d.other_expenses.get_or_insert(Money::zero());
    d.profit_percentage.get_or_insert(Percentage::zero());
    base + other
}

fn sublimation_base(d: &mut SublimationDetails) -> Money {
    let qty = *d.quantity.get_or_insert(DEFAULT_SUBLIMATION_QUANTITY);
    let unit = *d.unit_price.get_or_insert(Money::zero());
    d.profit_percentage.get_or_insert(DEFAULT_SUBLIMATION_PROFIT);
    d.other_expenses.get_or_insert(Money::zero());
    unit.multiply_quantity(qty)
}

fn other_cost(d: &mut OtherDetails) -> Money {
    *d.total_cost.get_or_insert(Money::zero())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print_job::DigitalDetails;
    use crate::types::SublimationType;
    use chrono::NaiveDate;

    fn record(details: PrintDetails) -> JobRecord {
        JobRecord {
            job_number: "J-1".to_string(),
            job_name: None,
            job_description: None,
            customer_id: None,
            customer_name: None,
            amount_paid: Money::zero(),
            expenses_cost: Money::zero(),
            total_amount: Money::zero(),
            balance: Money::zero(),
            payment_status: PaymentStatus::Unpaid,
            expenses: vec![],
            details,
        }
    }

    fn line(amount: i64) -> PrintExpense {
        PrintExpense {
            id: None,
            description: "extra".to_string(),
            amount: Money::from_cents(amount),
        }
    }

    fn sublimation(qty: Option<i64>, unit: Option<i64>, pct: Option<u32>) -> PrintDetails {
        PrintDetails::Sublimation(SublimationDetails {
            sublimation_type: SublimationType::Mugs,
            quantity: qty,
            unit_price: unit.map(Money::from_cents),
            profit_percentage: pct.map(Percentage::from_whole),
            other_expenses: Some(Money::zero()),
            other_expenses_description: None,
            subtotal: Money::zero(),
            total_profit: Money::zero(),
        })
    }

    #[test]
    fn test_sublimation_reference_example() {
        // qty 10 × 5.00, 20% → 50.00 / 10.00 / 60.00
        let mut job = record(sublimation(Some(10), Some(500), Some(20)));
        let b = recalculate(&mut job);

        assert_eq!(b.base_cost.cents(), 5000);
        assert_eq!(b.subtotal.cents(), 5000);
        assert_eq!(job.total_amount.cents(), 6000);
        assert_eq!(job.expenses_cost.cents(), 5000);
        match &job.details {
            PrintDetails::Sublimation(d) => {
                assert_eq!(d.subtotal.cents(), 5000);
                assert_eq!(d.total_profit.cents(), 1000);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_unvalidated_huge_quantity_saturates() {
        let mut job = record(sublimation(Some(1_000_000_000_000), Some(100_000_000), Some(20)));
        let b = recalculate(&mut job);
        assert_eq!(b.base_cost.cents(), i64::MAX);
        assert_eq!(job.total_amount.cents(), i64::MAX);
        assert_eq!(job.balance.cents(), i64::MAX);
        assert_eq!(job.payment_status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_sublimation_defaults_are_written_back() {
        let mut job = record(sublimation(None, None, None));
        job.expenses = vec![line(1000)];
        recalculate(&mut job);

        // qty 1 × 0.00 + 10.00 lines, 20% default → 12.00
        assert_eq!(job.total_amount.cents(), 1200);
        match &job.details {
            PrintDetails::Sublimation(d) => {
                assert_eq!(d.quantity, Some(1));
                assert_eq!(d.unit_price, Some(Money::zero()));
                assert_eq!(d.profit_percentage, Some(Percentage::from_whole(20)));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_duplo_reference_example() {
        let mut job = record(PrintDetails::Duplo(DuploDetails {
            base_cost: Some(Money::from_cents(10000)),
            other_expenses: Some(Money::from_cents(2000)),
            profit_percentage: Some(Percentage::from_whole(15)),
            ..Default::default()
        }));
        let b = recalculate(&mut job);

        assert_eq!(b.subtotal.cents(), 12000);
        assert_eq!(b.profit.cents(), 1800);
        assert_eq!(job.total_amount.cents(), 13800);
        assert_eq!(job.expenses_cost.cents(), 12000);
    }

    #[test]
    fn test_duplo_missing_inputs_are_zero() {
        let mut job = record(PrintDetails::Duplo(DuploDetails::default()));
        job.expenses = vec![line(250)];
        recalculate(&mut job);
        assert_eq!(job.total_amount.cents(), 250);
        assert_eq!(job.expenses_cost.cents(), 250);
    }

    #[test]
    fn test_offset_applies_markup_to_supplier_plus_lines() {
        let mut job = record(PrintDetails::Offset(OffsetDetails {
            supplier_job_amount: Some(Money::from_cents(40000)),
            profit_percentage: Some(Percentage::from_whole(25)),
            ..Default::default()
        }));
        job.expenses = vec![line(10000)];
        recalculate(&mut job);

        assert_eq!(job.expenses_cost.cents(), 50000);
        assert_eq!(job.total_amount.cents(), 62500);
    }

    #[test]
    fn test_digital_keeps_caller_total() {
        let mut job = record(PrintDetails::Digital(DigitalDetails::default()));
        job.total_amount = Money::from_cents(9900);
        job.expenses = vec![line(1500), line(500)];
        job.amount_paid = Money::from_cents(4000);
        recalculate(&mut job);

        assert_eq!(job.total_amount.cents(), 9900);
        assert_eq!(job.expenses_cost.cents(), 2000);
        assert_eq!(job.balance.cents(), 5900);
        assert_eq!(job.payment_status, PaymentStatus::PartiallyPaid);
    }

    #[test]
    fn test_other_profit_view() {
        let mut job = record(PrintDetails::Other(OtherDetails {
            description: "Certificates".to_string(),
            print_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            total_cost: Some(Money::from_cents(15000)),
            customer_remark: None,
        }));
        job.total_amount = Money::from_cents(20000);
        let b = recalculate(&mut job);

        assert_eq!(job.expenses_cost.cents(), 15000);
        assert_eq!(b.profit.cents(), 5000);
        assert_eq!(b.profit_percentage, Decimal::new(3333, 2));
    }

    #[test]
    fn test_other_zero_cost_profit_percentage() {
        let mut job = record(PrintDetails::Other(OtherDetails {
            description: "Free sample".to_string(),
            print_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            total_cost: None,
            customer_remark: None,
        }));
        job.total_amount = Money::from_cents(1000);
        let b = recalculate(&mut job);
        assert_eq!(b.profit_percentage, Decimal::ZERO);
        assert_eq!(b.profit.cents(), 1000);
    }

    #[test]
    fn test_balance_and_status_for_every_variant() {
        let variants = vec![
            PrintDetails::Digital(DigitalDetails::default()),
            PrintDetails::Offset(OffsetDetails {
                supplier_job_amount: Some(Money::from_cents(10000)),
                ..Default::default()
            }),
            PrintDetails::Duplo(DuploDetails {
                base_cost: Some(Money::from_cents(10000)),
                ..Default::default()
            }),
            sublimation(Some(1), Some(10000), Some(0)),
        ];

        for details in variants {
            for (paid, expected) in [
                (0, PaymentStatus::Unpaid),
                (4000, PaymentStatus::PartiallyPaid),
                (10000, PaymentStatus::Paid),
                (12000, PaymentStatus::Paid),
            ] {
                let mut job = record(details.clone());
                job.total_amount = Money::from_cents(10000);
                job.amount_paid = Money::from_cents(paid);
                recalculate(&mut job);

                assert_eq!(job.total_amount.cents(), 10000);
                assert_eq!(job.balance, job.total_amount - job.amount_paid);
                assert_eq!(job.payment_status, expected);
            }
        }
    }

    #[test]
    fn test_breakdown_does_not_mutate() {
        let mut job = record(sublimation(Some(2), Some(1000), None));
        recalculate(&mut job);
        let before = job.clone();
        let b = breakdown(&job);
        assert_eq!(job, before);
        assert_eq!(b.total_amount, job.total_amount);
    }
}
