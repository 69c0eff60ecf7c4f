//! # printshop-db: Database Layer for the Print Shop Back Office
//!
//! SQLite storage for every entity, plus the Audit Log Writer.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler (printshop-api)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  printshop-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────────┐  ┌─────────────┐  │   │
//! │  │   │   Database    │   │    Repositories    │  │ Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄──│ print_job, loan,   │  │ (embedded)  │  │   │
//! │  │   │  SqlitePool   │   │ recurring, audit.. │  │ 001_init    │  │   │
//! │  │   └───────────────┘   └─────────┬──────────┘  └─────────────┘  │   │
//! │  │                                 │ persist path calls:           │   │
//! │  │                                 ▼                               │   │
//! │  │          printshop-core: pricing::recalculate,                  │   │
//! │  │          loan::split_installment, refresh_schedule, ...        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per aggregate, plus the audit writer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use printshop_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("printshop.db")).await?;
//! let job = db.print_jobs().create(record).await?;
//! db.audit_writer().record(event).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::audit::{AuditLogRepository, AuditLogWriter};
pub use repository::customer::CustomerRepository;
pub use repository::expense::ExpenseRepository;
pub use repository::loan::LoanRepository;
pub use repository::loan_payment::LoanPaymentRepository;
pub use repository::monthly_entry::{MonthlyEntryRepository, MonthlyEntryUpdate};
pub use repository::print_job::{PrintJobRepository, PrintJobSummary};
pub use repository::recurring::RecurringExpenseRepository;
pub use repository::refresh_token::RefreshTokenRepository;
pub use repository::sublimation_price::SublimationPriceRepository;
pub use repository::supplier::SupplierRepository;
pub use repository::user::{NewUser, UserRepository, UserUpdate};

/// The date every persist path treats as "today".
pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}
