//! # PrintShop API
//!
//! JSON over HTTP for the print shop back office.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          PrintShop API                                  │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Public        │  │  Protected     │  │  Layers                    ││
//! │  │                │  │  (bearer JWT)  │  │                            ││
//! │  │ • /health      │  │ • print jobs   │  │ • TraceLayer (per request) ││
//! │  │ • /auth/login  │  │ • loans        │  │ • CorsLayer                ││
//! │  │ • /auth/       │  │ • expenses     │  │ • require_auth (protected) ││
//! │  │   register     │  │ • audit logs   │  │                            ││
//! │  │ • /auth/       │  │ • users, admin │  │                            ││
//! │  │   refresh-token│  │   ...          │  │                            ││
//! │  └────────────────┘  └───────┬────────┘  └────────────────────────────┘│
//! │                              │                                          │
//! │                              ▼                                          │
//! │        validate ──► repository write ──► AuditLogWriter::record        │
//! │                     (printshop-db)        (own transaction)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`] for the `PRINTSHOP_*` environment variables.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use state::AppState;

/// The date handlers treat as "today" for due dates and overdue checks.
pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}
