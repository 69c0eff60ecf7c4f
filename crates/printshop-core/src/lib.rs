//! # printshop-core: Pure Business Logic for the Print Shop Back Office
//!
//! Every rule that decides a number or a state lives here, as pure functions
//! over values. Nothing in this crate touches the database, the network or
//! the clock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Print Shop Back Office                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 printshop-api (axum, JWT)                       │   │
//! │  │    /api/digital-prints, /api/loans, /api/recurring-expenses    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ printshop-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │   loan    │  │ recurring │  │   audit   │  │   │
//! │  │   │ per-job   │  │   EMI     │  │ due-month │  │  events   │  │   │
//! │  │   │ totals    │  │  splits   │  │ next-due  │  │ snapshots │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   money · types · print_job · calendar · validation · error   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              printshop-db (SQLite repositories)                 │   │
//! │  │        migrations, repositories, AuditLogWriter                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money in integer cents, decimal conversions
//! - [`types`] - Rates, statuses and the simple entities
//! - [`print_job`] - The print-job sum type and its payments
//! - [`pricing`] - Financial Calculator for every print-job variant
//! - [`loan`] - Loan Amortization Engine
//! - [`recurring`] - Recurring Expense Scheduler
//! - [`audit`] - Audit events, snapshots and records
//! - [`calendar`] - Month arithmetic
//! - [`validation`] - Request validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use printshop_core::money::Money;
//! use printshop_core::types::Percentage;
//!
//! let subtotal = Money::from_cents(12_000); // 120.00
//! let profit = subtotal.percentage_of(Percentage::from_whole(15));
//! assert_eq!((subtotal + profit).cents(), 13_800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod calendar;
pub mod error;
pub mod loan;
pub mod money;
pub mod pricing;
pub mod print_job;
pub mod recurring;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use audit::{AuditAction, AuditEvent, AuditFilter, AuditLog, AuditSnapshot, RequestContext};
pub use error::{AuditError, CoreError, CoreResult, ValidationError};
pub use loan::{Loan, LoanPayment, LoanStatus, LoanType};
pub use money::Money;
pub use print_job::{JobRecord, PrintDetails, PrintJob, PrintType};
pub use recurring::{ExpenseCategory, Frequency, MonthlyExpenseEntry, RecurringExpense};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest page the list endpoints will return.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
