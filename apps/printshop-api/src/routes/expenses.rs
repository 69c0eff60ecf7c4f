use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::NaiveDate;
use printshop_core::types::{Expense, ExpenseFilter, ExpenseInput, PaymentStatus};
use printshop_core::validation::validate_expense;
use printshop_core::{AuditAction, AuditEvent};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extract::{Actor, ApiJson, ApiPath, ApiQuery};
use crate::routes::{created, Created};
use crate::state::AppState;

const ENTITY: &str = "Expense";

#[derive(Debug, Deserialize)]
pub struct PaymentStatusChange {
    pub payment_status: PaymentStatus,
    pub payment_date: Option<NaiveDate>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list).post(create))
        .route("/expenses/search", get(search))
        .route("/expenses/{id}", get(get_one).put(update).delete(delete))
        .route("/expenses/{id}/payment-status", patch(update_payment_status))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Expense>>> {
    Ok(Json(state.db.expenses().list().await?))
}

/// Every criterion is optional; dates are inclusive.
async fn search(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ExpenseFilter>,
) -> ApiResult<Json<Vec<Expense>>> {
    Ok(Json(state.db.expenses().search(&filter).await?))
}

async fn get_one(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Json<Expense>> {
    Ok(Json(state.db.expenses().get(id).await?))
}

async fn create(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<ExpenseInput>,
) -> ApiResult<Created<Expense>> {
    validate_expense(&input)?;
    let expense = state.db.expenses().create(&input).await?;

    state
        .audit(
            &actor,
            AuditEvent::new(ENTITY, expense.id, AuditAction::Create).new_value(&expense),
        )
        .await;
    Ok(created(expense))
}

async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<ExpenseInput>,
) -> ApiResult<Json<Expense>> {
    validate_expense(&input)?;
    let (before, after) = state.db.expenses().update(id, &input).await?;
    audit_update(&state, &actor, &before, &after).await;
    Ok(Json(after))
}

async fn update_payment_status(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(change): ApiJson<PaymentStatusChange>,
) -> ApiResult<Json<Expense>> {
    let (before, after) = state
        .db
        .expenses()
        .update_payment_status(id, change.payment_status, change.payment_date)
        .await?;
    audit_update(&state, &actor, &before, &after).await;
    Ok(Json(after))
}

async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let deleted = state.db.expenses().delete(id).await?;
    state
        .audit(&actor, AuditEvent::new(ENTITY, id, AuditAction::Delete).old_value(&deleted))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn audit_update(state: &AppState, actor: &Actor, before: &Expense, after: &Expense) {
    state
        .audit(
            actor,
            AuditEvent::new(ENTITY, after.id, AuditAction::Update)
                .old_value(before)
                .new_value(after),
        )
        .await;
}
