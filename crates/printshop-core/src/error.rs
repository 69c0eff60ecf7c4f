//! # Error Types
//!
//! Domain-specific error types for printshop-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  printshop-core (this file)                                            │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── AuditError       - Snapshot serialization (never surfaced)        │
//! │                                                                         │
//! │  printshop-db                                                          │
//! │  └── DbError          - Storage failures                               │
//! │                                                                         │
//! │  printshop-api                                                         │
//! │  └── ApiError         - { code, message } JSON body                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Missing calculator inputs are not errors: the calculators substitute
//! defaults instead. Only malformed requests end up here.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Line items were attached to a job variant that has none.
    ///
    /// ## When This Occurs
    /// - An "other" print job is submitted with an `expenses` array
    #[error("{print_type} jobs do not accept expense line items")]
    LineItemsNotAllowed { print_type: String },

    /// Payment against a print job is not positive.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// A loan that cannot be amortized.
    #[error("Invalid loan terms: {reason}")]
    InvalidLoanTerms { reason: String },

    /// Period outside 1..=12 or a nonsensical year.
    #[error("Invalid period {year}-{month}")]
    InvalidPeriod { year: i32, month: u32 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any business logic runs.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g. an email without `@`).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two fields contradict each other (e.g. end date before start date).
    #[error("{field}: {reason}")]
    Inconsistent { field: String, reason: String },
}

// =============================================================================
// Audit Error
// =============================================================================

/// Failure to turn an entity into an audit snapshot.
///
/// The audit writer logs and drops these; callers never see them.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
