//! # Loan Amortization Engine
//!
//! Fixed-installment (EMI) loans: the monthly payment and end date are fixed
//! when the loan is created, and every installment is split into principal
//! and interest when it is first recorded.
//!
//! ## Formulas
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  r = annual% / 100 / 12          n = term in months                     │
//! │                                                                         │
//! │  r == 0 :  EMI = P / n                                                  │
//! │  r  > 0 :  EMI = P · r(1+r)^n / ((1+r)^n − 1)                           │
//! │                                                                         │
//! │  Both rounded half-up to 2 dp.  end_date = start_date + n months        │
//! │                                                                         │
//! │  Installment k split (r at 10 dp):                                      │
//! │    balance = P                                                          │
//! │    repeat min(k−1, 360) times:                                          │
//! │        interest = round2(balance · r)                                   │
//! │        balance -= EMI − interest         (stop at 0)                    │
//! │    interest_k  = round2(balance · r)                                    │
//! │    principal_k = amount − interest_k     (≥ 0, else all interest)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Malformed installment inputs fall back to "all principal, no interest"
//! instead of failing the save.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::money::Money;
use crate::types::{PaymentMethod, PaymentStatus, Percentage};

/// Upper bound on simulated months when locating an installment's balance.
pub const MAX_SIMULATED_MONTHS: i32 = 360;

/// Installment numbers above this are treated as malformed input.
pub const MAX_PAYMENT_NUMBER: i32 = 1000;

/// Annual rates above 100% are treated as malformed input.
pub const MAX_ANNUAL_RATE: Percentage = Percentage::from_whole(100);

// =============================================================================
// Loan
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Completed,
    Defaulted,
    Suspended,
}

impl Default for LoanStatus {
    fn default() -> Self {
        LoanStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    Personal,
    Home,
    Vehicle,
    Business,
    Education,
    Other,
}

impl Default for LoanType {
    fn default() -> Self {
        LoanType::Business
    }
}

/// A persisted loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Loan {
    pub id: i64,
    pub loan_name: String,
    pub principal_amount: Money,
    /// Annual rate, e.g. 12 for 12%.
    pub interest_rate: Percentage,
    pub loan_term_months: i32,
    /// Fixed at creation.
    pub monthly_payment: Money,
    pub start_date: NaiveDate,
    /// Fixed at creation.
    pub end_date: NaiveDate,
    pub status: LoanStatus,
    pub loan_type: LoanType,
    pub description: Option<String>,
    pub lender: Option<String>,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller supplies for a loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanInput {
    pub loan_name: String,
    pub principal_amount: Money,
    pub interest_rate: Percentage,
    pub loan_term_months: i32,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub status: LoanStatus,
    #[serde(default)]
    pub loan_type: LoanType,
    pub description: Option<String>,
    pub lender: Option<String>,
}

/// The values fixed at loan creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanSchedule {
    pub monthly_payment: Money,
    pub end_date: NaiveDate,
}

impl LoanSchedule {
    /// Computes the EMI and end date for a new loan.
    pub fn for_terms(
        principal: Money,
        annual_rate: Percentage,
        term_months: i32,
        start_date: NaiveDate,
    ) -> Self {
        LoanSchedule {
            monthly_payment: monthly_payment(principal, annual_rate, term_months),
            end_date: calendar::add_months(start_date, term_months.max(0) as u32),
        }
    }
}

impl LoanInput {
    pub fn schedule(&self) -> LoanSchedule {
        LoanSchedule::for_terms(
            self.principal_amount,
            self.interest_rate,
            self.loan_term_months,
            self.start_date,
        )
    }
}

// =============================================================================
// EMI
// =============================================================================

/// `annual / 100 / 12` at full precision.
pub fn monthly_rate(annual_rate: Percentage) -> Decimal {
    annual_rate.as_fraction() / Decimal::from(12)
}

/// Fixed monthly installment, rounded half-up to cents.
///
/// A non-positive term yields zero.
///
/// ## Example
/// ```rust
/// use printshop_core::loan::monthly_payment;
/// use printshop_core::money::Money;
/// use printshop_core::types::Percentage;
///
/// let zero_rate = monthly_payment(Money::from_cents(1_200_000), Percentage::zero(), 12);
/// assert_eq!(zero_rate.cents(), 100_000);
///
/// let emi = monthly_payment(Money::from_cents(12_000_000), Percentage::from_whole(12), 12);
/// assert_eq!(emi.cents(), 1_066_185);
/// ```
pub fn monthly_payment(principal: Money, annual_rate: Percentage, term_months: i32) -> Money {
    if term_months <= 0 {
        return Money::zero();
    }

    let p = principal.to_decimal();
    let n = Decimal::from(term_months);
    let r = monthly_rate(annual_rate);

    if r.is_zero() {
        return Money::from_decimal(p / n);
    }

    let emi = (Decimal::ONE + r)
        .checked_powi(term_months as i64)
        .and_then(|growth| {
            let numerator = p.checked_mul(r)?.checked_mul(growth)?;
            numerator.checked_div(growth - Decimal::ONE)
        })
        // (1+r)^n beyond Decimal range: the interest term dominates and the
        // installment converges to P·r.
        .unwrap_or_else(|| p * r);

    Money::from_decimal(emi)
}

// =============================================================================
// Installment Split
// =============================================================================

/// Principal and interest portions of one installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplit {
    pub principal_component: Money,
    pub interest_component: Money,
}

impl PaymentSplit {
    /// "All principal": used for zero-rate loans and malformed inputs.
    pub fn all_principal(amount: Money) -> Self {
        PaymentSplit {
            principal_component: amount,
            interest_component: Money::zero(),
        }
    }
}

/// Splits installment `payment_number` of `amount` into principal and
/// interest by replaying the schedule up to it.
///
/// Never fails: out-of-range inputs return [`PaymentSplit::all_principal`].
pub fn split_installment(loan: &Loan, payment_number: i32, amount: Money) -> PaymentSplit {
    if payment_number <= 0
        || payment_number > MAX_PAYMENT_NUMBER
        || !amount.is_positive()
        || loan.interest_rate > MAX_ANNUAL_RATE
    {
        return PaymentSplit::all_principal(amount);
    }

    let r = monthly_rate(loan.interest_rate)
        .round_dp_with_strategy(10, RoundingStrategy::MidpointAwayFromZero);
    if r.is_zero() || !loan.monthly_payment.is_positive() {
        return PaymentSplit::all_principal(amount);
    }

    let interest_on = |balance: Money| Money::from_decimal(balance.to_decimal() * r);

    let mut balance = loan.principal_amount;
    for _ in 1..=(payment_number - 1).min(MAX_SIMULATED_MONTHS) {
        let principal_part = loan.monthly_payment - interest_on(balance);
        if principal_part >= balance {
            balance = Money::zero();
            break;
        }
        balance -= principal_part;
        if balance.cents() < 1 {
            balance = Money::zero();
            break;
        }
    }

    let interest = interest_on(balance);
    let principal = amount - interest;
    if principal.is_negative() {
        PaymentSplit {
            principal_component: Money::zero(),
            interest_component: amount,
        }
    } else {
        PaymentSplit {
            principal_component: principal,
            interest_component: interest,
        }
    }
}

// =============================================================================
// Loan Payment
// =============================================================================

/// One installment of a loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LoanPayment {
    pub id: i64,
    pub loan_id: i64,
    /// 1-based installment index.
    pub payment_number: i32,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub transaction_reference: Option<String>,
    pub notes: Option<String>,
    pub late_fee: Money,
    pub principal_component: Money,
    pub interest_component: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller supplies for an installment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanPaymentInput {
    pub loan_id: i64,
    pub payment_number: i32,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub transaction_reference: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub late_fee: Money,
}

/// Request to settle an installment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkPaid {
    pub paid_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub transaction_reference: Option<String>,
}

impl LoanPayment {
    /// Settles the installment.
    pub fn mark_as_paid(&mut self, request: &MarkPaid) {
        self.paid_date = Some(request.paid_date);
        self.payment_status = PaymentStatus::Paid;
        self.payment_method = Some(request.payment_method);
        self.transaction_reference = request.transaction_reference.clone();
    }

    /// Applies due-date escalation; called on every persist.
    pub fn refresh_status(&mut self, today: NaiveDate) {
        self.payment_status = self.payment_status.escalate(Some(self.due_date), today);
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.payment_status == PaymentStatus::Overdue
            || (self.payment_status == PaymentStatus::Unpaid && self.due_date < today)
    }

    /// Days past due, zero when not overdue.
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if !self.is_overdue(today) {
            return 0;
        }
        (today - self.due_date).num_days().max(0)
    }

    pub fn total_amount_due(&self) -> Money {
        self.amount + self.late_fee
    }
}

// =============================================================================
// Loan Summary
// =============================================================================

/// Read-only roll-up of a loan and its installments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub total_amount_to_pay: Money,
    pub total_interest: Money,
    pub paid_amount: Money,
    pub outstanding_balance: Money,
    pub completed_payments: i32,
    pub remaining_payments: i32,
    pub next_payment_date: Option<NaiveDate>,
    /// Percent, 2 decimals.
    pub completion_percentage: Decimal,
    pub is_overdue: bool,
}

/// Builds the roll-up from a loan and its installments as of `today`.
pub fn summarize(loan: &Loan, payments: &[LoanPayment], today: NaiveDate) -> LoanSummary {
    let total = loan.monthly_payment * loan.loan_term_months as i64;
    let paid: Vec<&LoanPayment> = payments
        .iter()
        .filter(|p| p.payment_status == PaymentStatus::Paid)
        .collect();
    let paid_amount: Money = paid.iter().map(|p| p.amount).sum();
    let completed = paid.len() as i32;

    let next_payment_date = if completed >= loan.loan_term_months {
        None
    } else {
        Some(calendar::add_months(loan.start_date, (completed + 1) as u32))
    };

    let completion_percentage = if loan.loan_term_months <= 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(completed) * Decimal::ONE_HUNDRED / Decimal::from(loan.loan_term_months))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    };

    LoanSummary {
        total_amount_to_pay: total,
        total_interest: total - loan.principal_amount,
        paid_amount,
        outstanding_balance: total - paid_amount,
        completed_payments: completed,
        remaining_payments: loan.loan_term_months - completed,
        next_payment_date,
        completion_percentage,
        is_overdue: next_payment_date.is_some_and(|d| d < today),
    }
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

    fn loan(principal: i64, rate_whole: u32, term: i32) -> Loan {
        let start = d(2024, 1, 1);
        let schedule = LoanSchedule::for_terms(
            Money::from_cents(principal),
            Percentage::from_whole(rate_whole),
            term,
            start,
        );
        Loan {
            id: 1,
            loan_name: "Press".to_string(),
            principal_amount: Money::from_cents(principal),
            interest_rate: Percentage::from_whole(rate_whole),
            loan_term_months: term,
            monthly_payment: schedule.monthly_payment,
            start_date: start,
            end_date: schedule.end_date,
            status: LoanStatus::Active,
            loan_type: LoanType::Business,
            description: None,
            lender: None,
            user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn installment(number: i32, amount: i64, due: NaiveDate, status: PaymentStatus) -> LoanPayment {
        LoanPayment {
            id: number as i64,
            loan_id: 1,
            payment_number: number,
            amount: Money::from_cents(amount),
            due_date: due,
            paid_date: None,
            payment_status: status,
            payment_method: None,
            transaction_reference: None,
            notes: None,
            late_fee: Money::zero(),
            principal_component: Money::zero(),
            interest_component: Money::zero(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_emi_twelve_percent() {
        // 120000 at 12% over 12 months, r = 0.01
        let emi = monthly_payment(Money::from_cents(12_000_000), Percentage::from_whole(12), 12);
        assert_eq!(emi.cents(), 1_066_185);
    }

    #[test]
    fn test_emi_zero_rate_is_exact_division() {
        let emi = monthly_payment(Money::from_cents(1_200_000), Percentage::zero(), 12);
        assert_eq!(emi.cents(), 100_000);
    }

    #[test]
    fn test_emi_zero_rate_rounds_half_up() {
        // 100.00 / 3 = 33.333.. → 33.33; 100.02 / 4 = 25.005 → 25.01
        assert_eq!(monthly_payment(Money::from_cents(10000), Percentage::zero(), 3).cents(), 3333);
        assert_eq!(monthly_payment(Money::from_cents(10002), Percentage::zero(), 4).cents(), 2501);
    }

    #[test]
    fn test_emi_non_positive_term() {
        assert!(monthly_payment(Money::from_cents(10000), Percentage::from_whole(5), 0).is_zero());
    }

    #[test]
    fn test_end_date() {
        let l = loan(1_000_000, 10, 24);
        assert_eq!(l.end_date, d(2026, 1, 1));
    }

    #[test]
    fn test_first_installment_split() {
        let l = loan(12_000_000, 12, 12);
        let split = split_installment(&l, 1, l.monthly_payment);
        // interest = 120000 × 0.01 = 1200.00
        assert_eq!(split.interest_component.cents(), 120_000);
        assert_eq!(split.principal_component.cents(), 1_066_185 - 120_000);
    }

    #[test]
    fn test_second_installment_split() {
        let l = loan(12_000_000, 12, 12);
        let split = split_installment(&l, 2, l.monthly_payment);
        // balance after 1: 120000 - 9461.85 = 110538.15 → interest 1105.38
        assert_eq!(split.interest_component.cents(), 110_538);
        assert_eq!(
            split.principal_component + split.interest_component,
            l.monthly_payment
        );
    }

    #[test]
    fn test_split_never_negative_principal() {
        let l = loan(12_000_000, 12, 12);
        // An amount smaller than the month's interest is all interest.
        let split = split_installment(&l, 1, Money::from_cents(5000));
        assert_eq!(split.principal_component, Money::zero());
        assert_eq!(split.interest_component.cents(), 5000);
    }

    #[test]
    fn test_split_after_payoff_is_all_principal() {
        let l = loan(1_200_000, 12, 12);
        let split = split_installment(&l, 20, l.monthly_payment);
        assert!(split.interest_component.is_zero());
        assert_eq!(split.principal_component, l.monthly_payment);
    }

    #[test]
    fn test_split_guards() {
        let l = loan(12_000_000, 12, 12);
        let amount = Money::from_cents(1000);
        assert_eq!(split_installment(&l, 0, amount), PaymentSplit::all_principal(amount));
        assert_eq!(split_installment(&l, 1001, amount), PaymentSplit::all_principal(amount));
        assert_eq!(
            split_installment(&l, 1, Money::zero()),
            PaymentSplit::all_principal(Money::zero())
        );

        let mut usurious = loan(12_000_000, 12, 12);
        usurious.interest_rate = Percentage::from_whole(101);
        assert_eq!(split_installment(&usurious, 1, amount), PaymentSplit::all_principal(amount));

        let free = loan(12_000_000, 0, 12);
        assert_eq!(split_installment(&free, 3, amount), PaymentSplit::all_principal(amount));
    }

    #[test]
    fn test_refresh_status_escalates_past_due_only() {
        let today = d(2024, 6, 15);
        let mut late = installment(1, 1000, d(2024, 6, 1), PaymentStatus::Unpaid);
        late.refresh_status(today);
        assert_eq!(late.payment_status, PaymentStatus::Overdue);
        assert_eq!(late.days_overdue(today), 14);

        let mut upcoming = installment(2, 1000, d(2024, 7, 1), PaymentStatus::Unpaid);
        upcoming.refresh_status(today);
        assert_eq!(upcoming.payment_status, PaymentStatus::Unpaid);
        assert_eq!(upcoming.days_overdue(today), 0);
    }

    #[test]
    fn test_mark_as_paid() {
        let mut p = installment(1, 1000, d(2024, 2, 1), PaymentStatus::Overdue);
        p.late_fee = Money::from_cents(250);
        assert_eq!(p.total_amount_due().cents(), 1250);

        p.mark_as_paid(&MarkPaid {
            paid_date: d(2024, 2, 10),
            payment_method: PaymentMethod::BankTransfer,
            transaction_reference: Some("TX-1".to_string()),
        });
        assert_eq!(p.payment_status, PaymentStatus::Paid);
        assert_eq!(p.paid_date, Some(d(2024, 2, 10)));
        assert!(!p.is_overdue(d(2024, 3, 1)));
    }

    #[test]
    fn test_summary() {
        let l = loan(1_200_000, 0, 12);
        let payments = vec![
            installment(1, 100_000, d(2024, 2, 1), PaymentStatus::Paid),
            installment(2, 100_000, d(2024, 3, 1), PaymentStatus::Paid),
            installment(3, 100_000, d(2024, 4, 1), PaymentStatus::Unpaid),
        ];
        let s = summarize(&l, &payments, d(2024, 5, 1));

        assert_eq!(s.total_amount_to_pay.cents(), 1_200_000);
        assert!(s.total_interest.is_zero());
        assert_eq!(s.paid_amount.cents(), 200_000);
        assert_eq!(s.outstanding_balance.cents(), 1_000_000);
        assert_eq!(s.completed_payments, 2);
        assert_eq!(s.remaining_payments, 10);
        assert_eq!(s.next_payment_date, Some(d(2024, 4, 1)));
        assert_eq!(s.completion_percentage, Decimal::new(1667, 2));
        assert!(s.is_overdue);
    }

    #[test]
    fn test_summary_completed_loan() {
        let l = loan(300_000, 0, 3);
        let payments: Vec<LoanPayment> = (1..=3)
            .map(|n| installment(n, 100_000, d(2024, 1 + n as u32, 1), PaymentStatus::Paid))
            .collect();
        let s = summarize(&l, &payments, d(2030, 1, 1));
        assert_eq!(s.next_payment_date, None);
        assert!(!s.is_overdue);
        assert_eq!(s.completion_percentage, Decimal::ONE_HUNDRED);
    }
}
