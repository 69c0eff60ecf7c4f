//! # Print Jobs
//!
//! One record shape for every kind of job the shop takes in.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PrintJob                                                               │
//! │  ├── id, created_at, updated_at                                        │
//! │  └── job: JobRecord                                                    │
//! │        ├── job_number, job_name, customer_id, ...   (metadata)         │
//! │        ├── amount_paid                              (input)            │
//! │        ├── expenses_cost, total_amount,             (derived by        │
//! │        │   balance, payment_status                   pricing::recal.)  │
//! │        ├── expenses: Vec<PrintExpense>              (line items)       │
//! │        └── details: PrintDetails                                       │
//! │              ├── Digital(DigitalDetails)                               │
//! │              ├── Offset(OffsetDetails)                                 │
//! │              ├── Duplo(DuploDetails)                                   │
//! │              ├── Sublimation(SublimationDetails)                       │
//! │              └── Other(OtherDetails)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! In JSON the details are flattened next to the common fields and tagged
//! with `"print_type"`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{PaymentMethod, PaymentStatus, PaymentType, Percentage, SublimationType};

// =============================================================================
// Print Type
// =============================================================================

/// Discriminant of [`PrintDetails`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PrintType {
    Digital,
    Offset,
    Duplo,
    Sublimation,
    Other,
}

impl PrintType {
    pub const ALL: [PrintType; 5] = [
        PrintType::Digital,
        PrintType::Offset,
        PrintType::Duplo,
        PrintType::Sublimation,
        PrintType::Other,
    ];

    /// Entity type tag written to the audit log.
    pub const fn entity_type(&self) -> &'static str {
        match self {
            PrintType::Digital => "DigitalPrint",
            PrintType::Offset => "OffsetPrint",
            PrintType::Duplo => "DuploPrint",
            PrintType::Sublimation => "SublimationPrint",
            PrintType::Other => "OtherPrint",
        }
    }

    /// Reverse of [`PrintType::entity_type`].
    pub fn from_entity_type(entity_type: &str) -> Option<Self> {
        PrintType::ALL
            .into_iter()
            .find(|t| t.entity_type() == entity_type)
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// An extra cost attached to a job (e.g. lamination, delivery).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintExpense {
    #[serde(default)]
    pub id: Option<i64>,
    pub description: String,
    pub amount: Money,
}

// =============================================================================
// Variant Details
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DigitalDetails {
    pub material: Option<String>,
    pub quality: Option<String>,
    pub square_feet: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OffsetDetails {
    pub job_type: Option<String>,
    pub quantity: Option<i64>,
    pub supplier_id: Option<i64>,
    /// Resolved from `supplier_id` on save.
    #[serde(default)]
    pub supplier_name: Option<String>,
    pub supplier_job_amount: Option<Money>,
    pub profit_percentage: Option<Percentage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuploDetails {
    pub quantity: Option<i64>,
    pub paper_size: Option<String>,
    pub copies: Option<i64>,
    pub base_cost: Option<Money>,
    pub other_expenses: Option<Money>,
    pub other_expenses_description: Option<String>,
    pub profit_percentage: Option<Percentage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SublimationDetails {
    pub sublimation_type: SublimationType,
    pub quantity: Option<i64>,
    pub unit_price: Option<Money>,
    pub profit_percentage: Option<Percentage>,
    pub other_expenses: Option<Money>,
    pub other_expenses_description: Option<String>,
    /// Derived: unit cost × quantity + other expenses + line items.
    #[serde(default)]
    pub subtotal: Money,
    /// Derived: subtotal × profit percentage.
    #[serde(default)]
    pub total_profit: Money,
}

/// Manually priced work. Line items do not apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherDetails {
    pub description: String,
    pub print_date: NaiveDate,
    pub total_cost: Option<Money>,
    pub customer_remark: Option<String>,
}

/// Variant-specific fields of a print job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "print_type", rename_all = "snake_case")]
pub enum PrintDetails {
    Digital(DigitalDetails),
    Offset(OffsetDetails),
    Duplo(DuploDetails),
    Sublimation(SublimationDetails),
    Other(OtherDetails),
}

impl PrintDetails {
    pub fn print_type(&self) -> PrintType {
        match self {
            PrintDetails::Digital(_) => PrintType::Digital,
            PrintDetails::Offset(_) => PrintType::Offset,
            PrintDetails::Duplo(_) => PrintType::Duplo,
            PrintDetails::Sublimation(_) => PrintType::Sublimation,
            PrintDetails::Other(_) => PrintType::Other,
        }
    }

    /// Whether this variant carries [`PrintExpense`] line items.
    pub fn accepts_line_items(&self) -> bool {
        !matches!(self, PrintDetails::Other(_))
    }
}

// =============================================================================
// Job Record
// =============================================================================

/// Everything about a job except its storage identity.
///
/// `expenses_cost`, `balance` and `payment_status` are always overwritten by
/// [`crate::pricing::recalculate`]. `total_amount` is an input for digital
/// and other jobs and derived for the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_number: String,
    pub job_name: Option<String>,
    pub job_description: Option<String>,
    pub customer_id: Option<i64>,
    /// Resolved from `customer_id` on save.
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub amount_paid: Money,
    #[serde(default)]
    pub expenses_cost: Money,
    #[serde(default)]
    pub total_amount: Money,
    #[serde(default)]
    pub balance: Money,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub expenses: Vec<PrintExpense>,
    #[serde(flatten)]
    pub details: PrintDetails,
}

impl JobRecord {
    pub fn print_type(&self) -> PrintType {
        self.details.print_type()
    }
}

/// A persisted print job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: i64,
    #[serde(flatten)]
    pub job: JobRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrintJob {
    pub fn print_type(&self) -> PrintType {
        self.job.print_type()
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Money received against a print job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct JobPayment {
    pub id: i64,
    pub print_job_id: i64,
    pub amount: Money,
    pub payment_method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub payment_type: Option<PaymentType>,
    pub paid_at: DateTime<Utc>,
}

/// Fields supplied when recording a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPaymentInput {
    pub amount: Money,
    pub payment_method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub payment_type: Option<PaymentType>,
}
