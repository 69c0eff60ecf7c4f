//! # Domain Types
//!
//! Shared value types, status enums and the simple reference entities.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Domain Types                                  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Percentage    │   │  PaymentStatus  │   │  Reference data │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Unpaid         │   │  Customer       │       │
//! │  │  2000 = 20%     │   │  PartiallyPaid  │   │  Supplier       │       │
//! │  │  JSON: 20       │   │  Paid           │   │  SublimationPr. │       │
//! │  └─────────────────┘   │  Overdue        │   │  Expense, User  │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Print jobs, loans and recurring expenses have their own modules because
//! they carry derived fields.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::money::Money;

// =============================================================================
// Percentage
// =============================================================================

/// A percentage held in basis points (1 bp = 0.01%).
///
/// ## Why Basis Points?
/// `as_fraction()` is then exactly a 4-decimal multiplier (20% → 0.2000),
/// which is the precision rates are carried at before money rounding.
///
/// ## Wire Format
/// JSON carries the human percentage: `20` means 20%, `12.5` means 12.5%.
/// Both directions go through `Decimal`, never through `f64` arithmetic.
/// SQLite carries the integer basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Percentage(u32);

impl Percentage {
    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Creates a percentage from a whole number (20 → 20%).
    #[inline]
    pub const fn from_whole(pct: u32) -> Self {
        Percentage(pct * 100)
    }

    /// Creates a percentage from a decimal percentage value (12.5 → 12.5%),
    /// rounding half-up to the nearest basis point. Negative or oversized
    /// input yields `None`.
    ///
    /// ## Example
    /// ```rust
    /// use printshop_core::types::Percentage;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Percentage::from_percent(Decimal::new(125, 1)), Some(Percentage::from_bps(1250)));
    /// assert_eq!(Percentage::from_percent(Decimal::new(-1, 0)), None);
    /// ```
    pub fn from_percent(pct: Decimal) -> Option<Self> {
        if pct.is_sign_negative() && !pct.is_zero() {
            return None;
        }
        pct.checked_mul(Decimal::ONE_HUNDRED)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
            .map(Percentage)
    }

    /// Returns the value in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Multiplier form, 4 decimal places (2000 bps → 0.2000).
    #[inline]
    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 4)
    }

    /// Percentage form, 2 decimal places (2000 bps → 20.00).
    #[inline]
    pub fn as_percent(&self) -> Decimal {
        Decimal::new(self.0 as i64, 2)
    }

    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::zero()
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.as_percent().normalize(), serializer)
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = rust_decimal::serde::float::deserialize(deserializer)?;
        Percentage::from_percent(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid percentage: {raw}")))
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Settlement state shared by print jobs, loan installments, monthly
/// expense entries and one-off expenses.
///
/// Print jobs only ever reach the first three; `Overdue` is assigned by the
/// due-date escalation of installments and monthly entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Overdue,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Unpaid
    }
}

impl PaymentStatus {
    /// The three-way settlement rule.
    ///
    /// ```text
    /// amount_paid <= 0              → Unpaid
    /// 0 < amount_paid < total       → PartiallyPaid
    /// amount_paid >= total          → Paid
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use printshop_core::{Money, PaymentStatus};
    ///
    /// let total = Money::from_cents(13800);
    /// assert_eq!(PaymentStatus::from_amounts(Money::zero(), total), PaymentStatus::Unpaid);
    /// assert_eq!(PaymentStatus::from_amounts(total, total), PaymentStatus::Paid);
    /// ```
    pub fn from_amounts(amount_paid: Money, total_amount: Money) -> Self {
        if amount_paid <= Money::zero() {
            PaymentStatus::Unpaid
        } else if amount_paid < total_amount {
            PaymentStatus::PartiallyPaid
        } else {
            PaymentStatus::Paid
        }
    }

    /// Applies due-date escalation: an `Unpaid` item whose due date is
    /// strictly before `today` becomes `Overdue`. All other states are kept.
    pub fn escalate(self, due_date: Option<NaiveDate>, today: NaiveDate) -> Self {
        match (self, due_date) {
            (PaymentStatus::Unpaid, Some(due)) if due < today => PaymentStatus::Overdue,
            (status, _) => status,
        }
    }
}

// =============================================================================
// Methods and Categories
// =============================================================================

/// How money changed hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Cash,
    CreditCard,
    DebitCard,
    Online,
    Check,
    Other,
}

/// Whether a print-job payment settles the job or is one of several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Full,
    Partial,
    Installment,
}

/// Kinds of sublimation blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SublimationType {
    Mugs,
    Cristal,
    Glass,
    Bottles,
    Other,
}

/// Classification of one-off expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ExpenseType {
    Material,
    Utility,
    Rent,
    Salary,
    Equipment,
    Maintenance,
    Transport,
    Marketing,
    Tax,
    Other,
}

/// Access level of a back-office account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    User,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::User
    }
}

// =============================================================================
// Customer / Supplier
// =============================================================================

/// A customer of the shop.
///
/// `customer_number` is assigned once on creation and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: i64,
    pub customer_number: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Editable customer fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A supplier of outsourced work or materials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Editable supplier fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

// =============================================================================
// Sublimation Price Catalog
// =============================================================================

/// Reference unit price for one sublimation blank type.
///
/// Several rows may exist per type; only active ones are "current".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SublimationPrice {
    pub id: i64,
    pub sublimation_type: SublimationType,
    pub unit_price: Money,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable sublimation price fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SublimationPriceInput {
    pub sublimation_type: SublimationType,
    pub unit_price: Money,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// One-off Expense
// =============================================================================

/// A single business expense, optionally tied to a supplier invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Expense {
    pub id: i64,
    pub expense_number: String,
    pub description: String,
    pub expense_type: ExpenseType,
    pub amount: Money,
    /// Goods Received Note reference.
    pub grn_number: Option<String>,
    pub expense_date: NaiveDate,
    pub invoice_number: Option<String>,
    pub supplier_id: Option<i64>,
    pub supplier_name: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable expense fields. `expense_number` is generated when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseInput {
    pub expense_number: Option<String>,
    pub description: String,
    pub expense_type: ExpenseType,
    pub amount: Money,
    pub grn_number: Option<String>,
    pub expense_date: NaiveDate,
    pub invoice_number: Option<String>,
    pub supplier_id: Option<i64>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub payment_due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Expense search criteria. `None` means "don't filter on this".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseFilter {
    pub grn_number: Option<String>,
    pub supplier_name: Option<String>,
    pub expense_type: Option<ExpenseType>,
    pub payment_status: Option<PaymentStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// =============================================================================
// Users and Tokens
// =============================================================================

/// A back-office account. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An opaque, revocable refresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RefreshToken {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// A token can be exchanged only while unrevoked and unexpired.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired(now)
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of a larger result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Zero-based page index.
    pub page: u32,
    pub size: u32,
    pub total_items: i64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        if self.size == 0 {
            return 0;
        }
        (self.total_items + self.size as i64 - 1) / self.size as i64
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
