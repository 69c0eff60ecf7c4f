//! # Validation Module
//!
//! Request validation run by the API handlers before anything is persisted.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: JSON deserialization (serde)                                 │
//! │  ├── Types, enum values, required fields                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lengths, signs, ranges, cross-field checks                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── NOT NULL / UNIQUE / FOREIGN KEY constraints                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation never covers derived fields. A job with every price field
//! missing is valid: the calculator defaults them.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::loan::{LoanInput, LoanPaymentInput, MAX_ANNUAL_RATE};
use crate::money::Money;
use crate::print_job::{JobPaymentInput, JobRecord, PrintDetails};
use crate::recurring::RecurringExpenseInput;
use crate::types::{CustomerInput, ExpenseInput, Percentage, SublimationPriceInput, SupplierInput};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest loan the engine will amortize.
pub const MAX_LOAN_TERM_MONTHS: i32 = 600;

/// Largest single amount accepted anywhere (1,000,000,000.00).
pub const MAX_AMOUNT: Money = Money::from_cents(100_000_000_000);

/// Largest quantity or copy count on a print job.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Largest profit markup on a print job.
pub const MAX_PROFIT_PERCENTAGE: Percentage = Percentage::from_whole(1_000);

/// Most line items a single print job may carry.
pub const MAX_LINE_ITEMS: usize = 500;

// Worst accepted sublimation job:
//   MAX_AMOUNT × MAX_QUANTITY + (1 + MAX_LINE_ITEMS) × MAX_AMOUNT ≈ 1.0e17 cents
//   × (1 + 1000%)                                                 ≈ 1.1e18 cents
// which stays below i64::MAX (≈ 9.2e18).

const MAX_NAME_LEN: usize = 255;

// =============================================================================
// Field Validators
// =============================================================================

/// Non-blank text of at most `max` characters.
///
/// ## Example
/// ```rust
/// use printshop_core::validation::validate_text;
///
/// assert!(validate_text("name", "Acme Prints", 255).is_ok());
/// assert!(validate_text("name", "   ", 255).is_err());
/// ```
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Optional email; when present it needs a local part and a dotted domain.
pub fn validate_email(email: Option<&str>) -> ValidationResult<()> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(());
    };
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected name@domain".to_string(),
        })
    }
}

pub fn validate_username(username: &str) -> ValidationResult<()> {
    validate_text("username", username, 50)?;
    if username.trim().chars().count() < 3 {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: 3,
        });
    }
    if !username
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "only letters, digits, '.', '_' and '-' are allowed".to_string(),
        });
    }
    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < 8 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        });
    }
    Ok(())
}

/// Zero or more, and at most [`MAX_AMOUNT`].
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    validate_max_amount(field, amount)
}

/// More than zero, and at most [`MAX_AMOUNT`].
pub fn validate_positive(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    validate_max_amount(field, amount)
}

fn validate_max_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT.cents(),
        });
    }
    Ok(())
}

fn validate_optional_non_negative(field: &str, amount: Option<Money>) -> ValidationResult<()> {
    amount.map_or(Ok(()), |a| validate_non_negative(field, a))
}

fn validate_optional_count(field: &str, count: Option<i64>) -> ValidationResult<()> {
    match count {
        Some(c) if c < 0 => Err(ValidationError::Negative {
            field: field.to_string(),
        }),
        Some(c) if c > MAX_QUANTITY => Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_QUANTITY,
        }),
        _ => Ok(()),
    }
}

fn validate_optional_profit(profit: Option<Percentage>) -> ValidationResult<()> {
    match profit {
        Some(p) if p > MAX_PROFIT_PERCENTAGE => Err(ValidationError::OutOfRange {
            field: "profit_percentage".to_string(),
            min: 0,
            max: i64::from(MAX_PROFIT_PERCENTAGE.bps() / 100),
        }),
        _ => Ok(()),
    }
}

/// A (year, month) period.
pub fn validate_period(year: i32, month: u32) -> CoreResult<()> {
    if !(1..=12).contains(&month) || !(1900..=9999).contains(&year) {
        return Err(CoreError::InvalidPeriod { year, month });
    }
    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

pub fn validate_customer(input: &CustomerInput) -> ValidationResult<()> {
    validate_text("name", &input.name, MAX_NAME_LEN)?;
    validate_email(input.email.as_deref())
}

pub fn validate_supplier(input: &SupplierInput) -> ValidationResult<()> {
    validate_text("name", &input.name, MAX_NAME_LEN)?;
    validate_email(input.email.as_deref())
}

/// A print job before pricing.
///
/// ## Rules
/// - `job_number` is required
/// - no input amount may be negative or exceed [`MAX_AMOUNT`]
/// - quantities stay within [`MAX_QUANTITY`], markups within
///   [`MAX_PROFIT_PERCENTAGE`]
/// - at most [`MAX_LINE_ITEMS`] line items, each with a description and a
///   non-negative amount
/// - "other" jobs carry no line items
pub fn validate_print_job(job: &JobRecord) -> CoreResult<()> {
    validate_text("job_number", &job.job_number, 50)?;
    validate_non_negative("amount_paid", job.amount_paid)?;
    validate_non_negative("total_amount", job.total_amount)?;

    if !job.details.accepts_line_items() && !job.expenses.is_empty() {
        return Err(CoreError::LineItemsNotAllowed {
            print_type: format!("{:?}", job.print_type()),
        });
    }
    if job.expenses.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "expenses".to_string(),
            min: 0,
            max: MAX_LINE_ITEMS as i64,
        }
        .into());
    }
    for item in &job.expenses {
        validate_text("expenses.description", &item.description, MAX_NAME_LEN)?;
        validate_non_negative("expenses.amount", item.amount)?;
    }

    match &job.details {
        PrintDetails::Digital(_) => {}
        PrintDetails::Offset(d) => {
            validate_optional_count("quantity", d.quantity)?;
            validate_optional_non_negative("supplier_job_amount", d.supplier_job_amount)?;
            validate_optional_profit(d.profit_percentage)?;
        }
        PrintDetails::Duplo(d) => {
            validate_optional_count("quantity", d.quantity)?;
            validate_optional_count("copies", d.copies)?;
            validate_optional_non_negative("base_cost", d.base_cost)?;
            validate_optional_non_negative("other_expenses", d.other_expenses)?;
            validate_optional_profit(d.profit_percentage)?;
        }
        PrintDetails::Sublimation(d) => {
            validate_optional_count("quantity", d.quantity)?;
            validate_optional_non_negative("unit_price", d.unit_price)?;
            validate_optional_non_negative("other_expenses", d.other_expenses)?;
            validate_optional_profit(d.profit_percentage)?;
        }
        PrintDetails::Other(d) => {
            validate_text("description", &d.description, 1000)?;
            validate_optional_non_negative("total_cost", d.total_cost)?;
        }
    }
    Ok(())
}

pub fn validate_job_payment(input: &JobPaymentInput) -> CoreResult<()> {
    if !input.amount.is_positive() {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!("{} must be greater than zero", input.amount),
        });
    }
    validate_max_amount("amount", input.amount)?;
    Ok(())
}

pub fn validate_loan(input: &LoanInput) -> CoreResult<()> {
    validate_text("loan_name", &input.loan_name, MAX_NAME_LEN)?;
    if !input.principal_amount.is_positive() {
        return Err(CoreError::InvalidLoanTerms {
            reason: "principal must be greater than zero".to_string(),
        });
    }
    if input.principal_amount > MAX_AMOUNT {
        return Err(CoreError::InvalidLoanTerms {
            reason: format!("principal cannot exceed {MAX_AMOUNT}"),
        });
    }
    if !(1..=MAX_LOAN_TERM_MONTHS).contains(&input.loan_term_months) {
        return Err(CoreError::InvalidLoanTerms {
            reason: format!("term must be between 1 and {MAX_LOAN_TERM_MONTHS} months"),
        });
    }
    if input.interest_rate > MAX_ANNUAL_RATE {
        return Err(CoreError::InvalidLoanTerms {
            reason: "interest rate cannot exceed 100%".to_string(),
        });
    }
    Ok(())
}

/// An installment. Out-of-range payment numbers are accepted: the split
/// falls back to an all-principal installment instead.
pub fn validate_loan_payment(input: &LoanPaymentInput) -> ValidationResult<()> {
    validate_non_negative("amount", input.amount)?;
    validate_non_negative("late_fee", input.late_fee)
}

pub fn validate_recurring_expense(input: &RecurringExpenseInput) -> ValidationResult<()> {
    validate_text("name", &input.name, MAX_NAME_LEN)?;
    validate_positive("amount", input.amount)?;
    if let Some(end) = input.end_date {
        if end < input.start_date {
            return Err(ValidationError::Inconsistent {
                field: "end_date".to_string(),
                reason: "must not be before start_date".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_expense(input: &ExpenseInput) -> ValidationResult<()> {
    validate_text("description", &input.description, 1000)?;
    validate_positive("amount", input.amount)
}

pub fn validate_sublimation_price(input: &SublimationPriceInput) -> ValidationResult<()> {
    validate_non_negative("unit_price", input.unit_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print_job::{DigitalDetails, OtherDetails, PrintExpense, SublimationDetails};
    use crate::types::{PaymentStatus, SublimationType};
    use chrono::NaiveDate;

    fn job(details: PrintDetails) -> JobRecord {
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

    #[test]
    fn test_validate_email() {
        assert!(validate_email(None).is_ok());
        assert!(validate_email(Some("")).is_ok());
        assert!(validate_email(Some("shop@example.com")).is_ok());
        assert!(validate_email(Some("shop@localhost")).is_err());
        assert!(validate_email(Some("@example.com")).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("front.desk").is_ok());
        assert!(matches!(
            validate_username("ab"),
            Err(ValidationError::TooShort { .. })
        ));
        assert!(matches!(
            validate_username("bad name"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_other_job_with_line_items_is_rejected() {
        let mut record = job(PrintDetails::Other(OtherDetails {
            description: "Cards".to_string(),
            print_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            total_cost: None,
            customer_remark: None,
        }));
        assert!(validate_print_job(&record).is_ok());

        record.expenses.push(PrintExpense {
            id: None,
            description: "Delivery".to_string(),
            amount: Money::from_cents(500),
        });
        assert!(matches!(
            validate_print_job(&record),
            Err(CoreError::LineItemsNotAllowed { .. })
        ));
    }

    #[test]
    fn test_job_with_missing_prices_is_valid() {
        let record = job(PrintDetails::Digital(DigitalDetails::default()));
        assert!(validate_print_job(&record).is_ok());
    }

    #[test]
    fn test_negative_amount_paid_is_rejected() {
        let mut record = job(PrintDetails::Digital(DigitalDetails::default()));
        record.amount_paid = Money::from_cents(-1);
        assert!(matches!(
            validate_print_job(&record),
            Err(CoreError::Validation(ValidationError::Negative { .. }))
        ));
    }

    #[test]
    fn test_oversized_sublimation_job_is_rejected() {
        let mut record = job(PrintDetails::Sublimation(SublimationDetails {
            sublimation_type: SublimationType::Mugs,
            quantity: Some(1_000_000_000_000),
            unit_price: Some(Money::from_cents(100_000_000)),
            profit_percentage: Some(Percentage::from_whole(20)),
            other_expenses: None,
            other_expenses_description: None,
            subtotal: Money::zero(),
            total_profit: Money::zero(),
        }));
        assert!(matches!(
            validate_print_job(&record),
            Err(CoreError::Validation(ValidationError::OutOfRange { ref field, .. })) if field == "quantity"
        ));

        if let PrintDetails::Sublimation(d) = &mut record.details {
            d.quantity = Some(MAX_QUANTITY);
            d.unit_price = Some(Money::from_cents(MAX_AMOUNT.cents() + 1));
        }
        assert!(matches!(
            validate_print_job(&record),
            Err(CoreError::Validation(ValidationError::OutOfRange { ref field, .. })) if field == "unit_price"
        ));

        if let PrintDetails::Sublimation(d) = &mut record.details {
            d.unit_price = Some(MAX_AMOUNT);
            d.profit_percentage = Some(Percentage::from_whole(1_001));
        }
        assert!(validate_print_job(&record).is_err());
    }

    #[test]
    fn test_largest_accepted_job_prices_without_saturating() {
        let mut record = job(PrintDetails::Sublimation(SublimationDetails {
            sublimation_type: SublimationType::Mugs,
            quantity: Some(MAX_QUANTITY),
            unit_price: Some(MAX_AMOUNT),
            profit_percentage: Some(MAX_PROFIT_PERCENTAGE),
            other_expenses: Some(MAX_AMOUNT),
            other_expenses_description: None,
            subtotal: Money::zero(),
            total_profit: Money::zero(),
        }));
        record.expenses = (0..MAX_LINE_ITEMS)
            .map(|_| PrintExpense {
                id: None,
                description: "Ink".to_string(),
                amount: MAX_AMOUNT,
            })
            .collect();
        assert!(validate_print_job(&record).is_ok());

        crate::pricing::recalculate(&mut record);
        assert!(record.total_amount.is_positive());
        assert!(record.total_amount.cents() < i64::MAX);
        assert_eq!(record.balance, record.total_amount);

        record.expenses.push(PrintExpense {
            id: None,
            description: "Ink".to_string(),
            amount: Money::zero(),
        });
        assert!(validate_print_job(&record).is_err());
    }

    #[test]
    fn test_amount_above_cap_is_out_of_range() {
        assert!(validate_positive("amount", MAX_AMOUNT).is_ok());
        assert!(matches!(
            validate_positive("amount", Money::from_cents(MAX_AMOUNT.cents() + 1)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_job_payment(&JobPaymentInput {
                amount: Money::from_cents(i64::MAX),
                payment_method: None,
                reference: None,
                payment_type: None,
            }),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_validate_loan() {
        let mut input = LoanInput {
            loan_name: "Press".to_string(),
            principal_amount: Money::from_cents(1_000_000),
            interest_rate: Percentage::from_whole(12),
            loan_term_months: 12,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            status: Default::default(),
            loan_type: Default::default(),
            description: None,
            lender: None,
        };
        assert!(validate_loan(&input).is_ok());

        input.loan_term_months = 0;
        assert!(matches!(
            validate_loan(&input),
            Err(CoreError::InvalidLoanTerms { .. })
        ));

        input.loan_term_months = 12;
        input.interest_rate = Percentage::from_whole(101);
        assert!(validate_loan(&input).is_err());
    }

    #[test]
    fn test_validate_period() {
        assert!(validate_period(2024, 12).is_ok());
        assert!(validate_period(2024, 0).is_err());
        assert!(validate_period(2024, 13).is_err());
    }
}
