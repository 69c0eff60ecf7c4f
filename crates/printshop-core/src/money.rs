//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Storage vs Arithmetic
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WHERE PRECISION LIVES                                                  │
//! │                                                                         │
//! │  At rest (SQLite, JSON):  Money(i64) cents   → always exactly 2 dp     │
//! │                                                                         │
//! │  In flight (rates):       rust_decimal::Decimal                         │
//! │     cost 120.00 × 15% ──► Decimal 18.0000 ──► round half-up ──► 1800c  │
//! │                                                                         │
//! │  A Decimal never reaches a stored field without passing through         │
//! │  Money::from_decimal, which is the single rounding point.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use printshop_core::money::Money;
//! use printshop_core::types::Percentage;
//!
//! let subtotal = Money::from_major_minor(120, 0);
//! let profit = subtotal.percentage_of(Percentage::from_whole(15));
//! assert_eq!(profit.cents(), 1800);
//! ```

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::Percentage;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in minor units (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: balances go negative on overpayment
/// - **Serialized as an integer**: `{"total_amount": 13800}` means 138.00
/// - **Decimal conversions are explicit**: see [`Money::to_decimal`] and
///   [`Money::from_decimal`]
/// - **Saturating arithmetic**: `+`, `-` and `*` clamp at the `i64` bounds
///   instead of panicking or wrapping. Validation keeps accepted input far
///   below them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use printshop_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is less than zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the larger of `self` and zero.
    #[inline]
    pub const fn clamp_non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Exact decimal view of this amount (scale 2).
    ///
    /// ## Example
    /// ```rust
    /// use printshop_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Money::from_cents(1099).to_decimal(), Decimal::new(1099, 2));
    /// ```
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Rounds a decimal to 2 places (half-up) and stores it as cents.
    ///
    /// "Half-up" here is midpoint-away-from-zero, so 0.005 → 0.01 and
    /// -0.005 → -0.01.
    ///
    /// ## Example
    /// ```rust
    /// use printshop_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Money::from_decimal(Decimal::new(10644205, 3)).cents(), 1064421);
    /// ```
    pub fn from_decimal(value: Decimal) -> Money {
        let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(2);
        let cents = rounded.mantissa().clamp(i64::MIN as i128, i64::MAX as i128);
        Money(cents as i64)
    }

    /// Applies a percentage and rounds the result to cents.
    ///
    /// The percentage is first reduced to a 4-decimal fraction
    /// (20% → 0.2000), then multiplied, then rounded half-up.
    ///
    /// ## Example
    /// ```rust
    /// use printshop_core::money::Money;
    /// use printshop_core::types::Percentage;
    ///
    /// let subtotal = Money::from_cents(5000);
    /// let profit = subtotal.percentage_of(Percentage::from_whole(20));
    /// assert_eq!(profit.cents(), 1000);
    /// ```
    pub fn percentage_of(&self, rate: Percentage) -> Money {
        Money::from_decimal(self.to_decimal() * rate.as_fraction())
    }

    /// Multiplies money by a quantity, saturating at the `i64` bounds.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Checked addition. `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Checked multiplication by a quantity. `None` on overflow.
    #[inline]
    pub const fn checked_mul(self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain two-decimal rendering ("138.00"), no currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
