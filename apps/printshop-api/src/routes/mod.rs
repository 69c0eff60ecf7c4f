//! # HTTP Routes
//!
//! Every resource module exposes `routes() -> Router<AppState>` with its
//! full paths; this module merges them under `/api`.
//!
//! ## Handler Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  async fn update(State(state), actor: Actor, ApiPath(id), ApiJson(in))  │
//! │     │                                                                   │
//! │     ├── validate_*(&input)?                   400 on failure           │
//! │     ├── let (before, after) = repo.update()?  404 / 409 / 500          │
//! │     ├── state.audit(&actor, UPDATE before→after)   never fails         │
//! │     └── Ok(Json(after))                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod admin;
pub mod audit_logs;
pub mod auth;
pub mod customers;
pub mod expenses;
pub mod health;
pub mod loan_payments;
pub mod loans;
pub mod monthly_entries;
pub mod print_jobs;
pub mod recurring;
pub mod sublimation_prices;
pub mod suppliers;
pub mod users;

use axum::http::StatusCode;
use axum::middleware;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::state::AppState;

/// Builds the complete application router.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .merge(health::routes())
        .merge(auth::public_routes());

    let protected = Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(customers::routes())
        .merge(suppliers::routes())
        .merge(print_jobs::routes())
        .merge(loans::routes())
        .merge(loan_payments::routes())
        .merge(recurring::routes())
        .merge(monthly_entries::routes())
        .merge(expenses::routes())
        .merge(sublimation_prices::routes())
        .merge(audit_logs::routes())
        .merge(admin::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `201 Created` with a JSON body.
pub(crate) type Created<T> = (StatusCode, axum::Json<T>);

pub(crate) fn created<T>(value: T) -> Created<T> {
    (StatusCode::CREATED, axum::Json(value))
}
