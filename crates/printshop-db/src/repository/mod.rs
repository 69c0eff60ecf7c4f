//! # Repository Module
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler                                                                │
//! │       │  db.loan_payments().create(&input)                             │
//! │       ▼                                                                 │
//! │  LoanPaymentRepository                                                 │
//! │  ├── loads the owning Loan                                             │
//! │  ├── printshop_core::loan::split_installment(..)                       │
//! │  ├── payment.refresh_status(today)                                     │
//! │  └── INSERT                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Derived fields are recomputed inside the repository, immediately before
//! each write, so no caller can persist a stale balance or status.
//!
//! Mutating methods that the audit trail needs a "before" image for return
//! the previous value alongside the new one.
//!
//! ## Available Repositories
//!
//! - [`customer::CustomerRepository`]
//! - [`supplier::SupplierRepository`]
//! - [`print_job::PrintJobRepository`] - all five variants, line items, payments
//! - [`loan::LoanRepository`]
//! - [`loan_payment::LoanPaymentRepository`]
//! - [`recurring::RecurringExpenseRepository`] - definitions and generation
//! - [`monthly_entry::MonthlyEntryRepository`]
//! - [`expense::ExpenseRepository`]
//! - [`sublimation_price::SublimationPriceRepository`]
//! - [`user::UserRepository`]
//! - [`refresh_token::RefreshTokenRepository`]
//! - [`audit::AuditLogWriter`] / [`audit::AuditLogRepository`]

pub mod audit;
pub mod customer;
pub mod expense;
pub mod loan;
pub mod loan_payment;
pub mod monthly_entry;
pub mod print_job;
pub mod recurring;
pub mod refresh_token;
pub mod sublimation_price;
pub mod supplier;
pub mod user;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }
}
