use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use printshop_core::recurring::{MonthlyExpenseEntry, MonthlyTotals};
use printshop_core::validation::{validate_non_negative, validate_period};
use printshop_core::{AuditAction, AuditEvent};
use printshop_db::MonthlyEntryUpdate;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extract::{Actor, ApiJson, ApiPath};
use crate::state::AppState;
use crate::today;

const ENTITY: &str = "MonthlyExpenseEntry";

#[derive(Debug, Default, Deserialize)]
pub struct MarkEntryPaid {
    /// Defaults to today.
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/monthly-expense-entries", get(list))
        .route("/monthly-expense-entries/unpaid", get(list_unpaid))
        .route("/monthly-expense-entries/overdue", get(list_overdue))
        .route("/monthly-expense-entries/month/{year}/{month}", get(list_for_month))
        .route("/monthly-expense-entries/summary/{year}/{month}", get(summary))
        .route(
            "/monthly-expense-entries/recurring/{recurring_id}",
            get(list_by_recurring),
        )
        .route(
            "/monthly-expense-entries/{id}",
            get(get_one).put(update).delete(delete),
        )
        .route("/monthly-expense-entries/{id}/mark-paid", put(mark_paid))
        .route("/monthly-expense-entries/{id}/mark-unpaid", put(mark_unpaid))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<MonthlyExpenseEntry>>> {
    Ok(Json(state.db.monthly_entries().list().await?))
}

async fn list_unpaid(State(state): State<AppState>) -> ApiResult<Json<Vec<MonthlyExpenseEntry>>> {
    Ok(Json(state.db.monthly_entries().list_unpaid().await?))
}

async fn list_overdue(State(state): State<AppState>) -> ApiResult<Json<Vec<MonthlyExpenseEntry>>> {
    Ok(Json(state.db.monthly_entries().list_overdue(today()).await?))
}

async fn list_for_month(
    State(state): State<AppState>,
    ApiPath((year, month)): ApiPath<(i32, u32)>,
) -> ApiResult<Json<Vec<MonthlyExpenseEntry>>> {
    validate_period(year, month)?;
    Ok(Json(state.db.monthly_entries().list_for_month(year, month).await?))
}

async fn summary(
    State(state): State<AppState>,
    ApiPath((year, month)): ApiPath<(i32, u32)>,
) -> ApiResult<Json<MonthlyTotals>> {
    validate_period(year, month)?;
    Ok(Json(state.db.monthly_entries().summary(year, month).await?))
}

async fn list_by_recurring(
    State(state): State<AppState>,
    ApiPath(recurring_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<MonthlyExpenseEntry>>> {
    Ok(Json(state.db.monthly_entries().list_by_recurring(recurring_id).await?))
}

async fn get_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MonthlyExpenseEntry>> {
    Ok(Json(state.db.monthly_entries().get(id).await?))
}

async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<MonthlyEntryUpdate>,
) -> ApiResult<Json<MonthlyExpenseEntry>> {
    validate_non_negative("amount", update.amount)?;
    let (before, after) = state.db.monthly_entries().update(id, &update).await?;
    audit_change(&state, &actor, &before, &after).await;
    Ok(Json(after))
}

async fn mark_paid(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<MarkEntryPaid>,
) -> ApiResult<Json<MonthlyExpenseEntry>> {
    let payment_date = request.payment_date.unwrap_or_else(today);
    let (before, after) = state
        .db
        .monthly_entries()
        .mark_paid(id, payment_date, request.notes)
        .await?;
    audit_change(&state, &actor, &before, &after).await;
    Ok(Json(after))
}

async fn mark_unpaid(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MonthlyExpenseEntry>> {
    let (before, after) = state.db.monthly_entries().mark_unpaid(id).await?;
    audit_change(&state, &actor, &before, &after).await;
    Ok(Json(after))
}

async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let deleted = state.db.monthly_entries().delete(id).await?;
    state
        .audit(&actor, AuditEvent::new(ENTITY, id, AuditAction::Delete).old_value(&deleted))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn audit_change(
    state: &AppState,
    actor: &Actor,
    before: &MonthlyExpenseEntry,
    after: &MonthlyExpenseEntry,
) {
    state
        .audit(
            actor,
            AuditEvent::new(ENTITY, after.id, AuditAction::Update)
                .old_value(before)
                .new_value(after),
        )
        .await;
}
