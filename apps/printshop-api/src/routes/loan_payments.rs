//! Loan installments. The principal/interest split is fixed when an
//! installment is created; every save re-checks overdue escalation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use printshop_core::loan::{LoanPayment, LoanPaymentInput, MarkPaid};
use printshop_core::validation::validate_loan_payment;
use printshop_core::{AuditAction, AuditEvent};
use serde::Serialize;

use crate::error::ApiResult;
use crate::extract::{Actor, ApiJson, ApiPath};
use crate::routes::{created, Created};
use crate::state::AppState;
use crate::today;

const ENTITY: &str = "LoanPayment";

/// An installment with the figures that depend on today's date.
#[derive(Debug, Serialize)]
pub struct InstallmentView {
    #[serde(flatten)]
    pub payment: LoanPayment,
    pub days_overdue: i64,
    pub total_amount_due: printshop_core::Money,
}

impl From<LoanPayment> for InstallmentView {
    fn from(payment: LoanPayment) -> Self {
        InstallmentView {
            days_overdue: payment.days_overdue(today()),
            total_amount_due: payment.total_amount_due(),
            payment,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/loan-payments", get(list).post(create))
        .route("/loan-payments/overdue", get(list_overdue))
        .route("/loan-payments/loan/{loan_id}", get(list_by_loan))
        .route("/loan-payments/{id}", get(get_one).put(update).delete(delete))
        .route("/loan-payments/{id}/mark-paid", put(mark_paid))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<LoanPayment>>> {
    Ok(Json(state.db.loan_payments().list().await?))
}

async fn list_overdue(State(state): State<AppState>) -> ApiResult<Json<Vec<InstallmentView>>> {
    let payments = state.db.loan_payments().list_overdue(today()).await?;
    Ok(Json(payments.into_iter().map(InstallmentView::from).collect()))
}

async fn list_by_loan(
    State(state): State<AppState>,
    ApiPath(loan_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<LoanPayment>>> {
    Ok(Json(state.db.loan_payments().list_by_loan(loan_id).await?))
}

async fn get_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<InstallmentView>> {
    Ok(Json(state.db.loan_payments().get(id).await?.into()))
}

async fn create(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<LoanPaymentInput>,
) -> ApiResult<Created<LoanPayment>> {
    validate_loan_payment(&input)?;
    let payment = state.db.loan_payments().create(&input).await?;

    state
        .audit(
            &actor,
            AuditEvent::new(ENTITY, payment.id, AuditAction::Create).new_value(&payment),
        )
        .await;
    Ok(created(payment))
}

async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<LoanPaymentInput>,
) -> ApiResult<Json<LoanPayment>> {
    validate_loan_payment(&input)?;
    let (before, after) = state.db.loan_payments().update(id, &input).await?;

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

async fn mark_paid(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<MarkPaid>,
) -> ApiResult<Json<LoanPayment>> {
    let (before, after) = state.db.loan_payments().mark_paid(id, &request).await?;

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
    let deleted = state.db.loan_payments().delete(id).await?;
    state
        .audit(&actor, AuditEvent::new(ENTITY, id, AuditAction::Delete).old_value(&deleted))
        .await;
    Ok(StatusCode::NO_CONTENT)
}
