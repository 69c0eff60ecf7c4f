use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use printshop_core::loan::{Loan, LoanInput, LoanPayment, LoanStatus, LoanSummary};
use printshop_core::validation::validate_loan;
use printshop_core::{AuditAction, AuditEvent};
use serde::Serialize;

use crate::error::ApiResult;
use crate::extract::{Actor, ApiJson, ApiPath};
use crate::routes::{created, Created};
use crate::state::AppState;
use crate::today;

const ENTITY: &str = "Loan";

/// A loan together with its roll-up as of today.
#[derive(Debug, Serialize)]
pub struct LoanWithSummary {
    #[serde(flatten)]
    pub loan: Loan,
    pub summary: LoanSummary,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/loans", get(list).post(create))
        .route("/loans/status/{status}", get(list_by_status))
        .route("/loans/{id}", get(get_one).put(update).delete(delete))
        .route("/loans/{id}/summary", get(summary))
        .route("/loans/{id}/payments", get(payments))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Loan>>> {
    Ok(Json(state.db.loans().list().await?))
}

async fn list_by_status(
    State(state): State<AppState>,
    ApiPath(status): ApiPath<LoanStatus>,
) -> ApiResult<Json<Vec<Loan>>> {
    Ok(Json(state.db.loans().list_by_status(status).await?))
}

async fn get_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<LoanWithSummary>> {
    let loan = state.db.loans().get(id).await?;
    let summary = state.db.loans().summary(id, today()).await?;
    Ok(Json(LoanWithSummary { loan, summary }))
}

async fn summary(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Json<LoanSummary>> {
    Ok(Json(state.db.loans().summary(id, today()).await?))
}

async fn payments(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Vec<LoanPayment>>> {
    Ok(Json(state.db.loan_payments().list_by_loan(id).await?))
}

/// The EMI and end date are computed from the terms; the caller owns the loan.
async fn create(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<LoanInput>,
) -> ApiResult<Created<Loan>> {
    validate_loan(&input)?;
    let loan = state.db.loans().create(&input, Some(actor.user.id)).await?;

    state
        .audit(&actor, AuditEvent::new(ENTITY, loan.id, AuditAction::Create).new_value(&loan))
        .await;
    Ok(created(loan))
}

async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<LoanInput>,
) -> ApiResult<Json<Loan>> {
    validate_loan(&input)?;
    let (before, after) = state.db.loans().update(id, &input).await?;

    state
        .audit(
            &actor,
            AuditEvent::new(ENTITY, id, AuditAction::Update)
                .old_value(&before)
                .new_value(&after),
        )
        .await;
    Ok(Json(after))
}

async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let deleted = state.db.loans().delete(id).await?;
    state
        .audit(&actor, AuditEvent::new(ENTITY, id, AuditAction::Delete).old_value(&deleted))
        .await;
    Ok(StatusCode::NO_CONTENT)
}
