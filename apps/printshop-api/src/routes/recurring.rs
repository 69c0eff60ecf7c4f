//! # Recurring Expense Routes
//!
//! Definitions plus the generation endpoints of the scheduler.
//!
//! ```text
//! POST /recurring-expenses/generate/{year}/{month}
//!        │
//!        ├── period checked (month 1..=12, year 1900..=9999)
//!        ├── active definitions due that month, minus existing entries
//!        └── one MonthlyExpenseEntry Create audit per new entry
//! ```
//!
//! Generating the same month twice creates nothing the second time.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use printshop_core::recurring::{MonthlyExpenseEntry, RecurringExpense, RecurringExpenseInput};
use printshop_core::validation::{validate_period, validate_recurring_expense};
use printshop_core::{AuditAction, AuditEvent, Money};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::extract::{Actor, ApiJson, ApiPath, ApiQuery};
use crate::routes::{created, Created};
use crate::state::AppState;
use crate::today;

const ENTITY: &str = "RecurringExpense";
const ENTRY_ENTITY: &str = "MonthlyExpenseEntry";

const DEFAULT_DUE_SOON_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
pub struct DueSoonQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MonthlyBudget {
    pub total: Money,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recurring-expenses", get(list).post(create))
        .route("/recurring-expenses/active", get(list_active))
        .route("/recurring-expenses/monthly-budget", get(monthly_budget))
        .route("/recurring-expenses/due-soon", get(due_soon))
        .route("/recurring-expenses/auto-generate", post(auto_generate))
        .route("/recurring-expenses/generate/{year}/{month}", post(generate))
        .route(
            "/recurring-expenses/{id}",
            get(get_one).put(update).delete(delete),
        )
        .route("/recurring-expenses/{id}/toggle-active", put(toggle_active))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<RecurringExpense>>> {
    Ok(Json(state.db.recurring_expenses().list().await?))
}

async fn list_active(State(state): State<AppState>) -> ApiResult<Json<Vec<RecurringExpense>>> {
    Ok(Json(state.db.recurring_expenses().list_active().await?))
}

async fn get_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<RecurringExpense>> {
    Ok(Json(state.db.recurring_expenses().get(id).await?))
}

async fn monthly_budget(State(state): State<AppState>) -> ApiResult<Json<MonthlyBudget>> {
    let total = state.db.recurring_expenses().monthly_budget().await?;
    Ok(Json(MonthlyBudget { total }))
}

async fn due_soon(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DueSoonQuery>,
) -> ApiResult<Json<Vec<RecurringExpense>>> {
    let days = query.days.unwrap_or(DEFAULT_DUE_SOON_DAYS).max(0);
    Ok(Json(state.db.recurring_expenses().due_soon(today(), days).await?))
}

async fn create(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<RecurringExpenseInput>,
) -> ApiResult<Created<RecurringExpense>> {
    validate_recurring_expense(&input)?;
    let definition = state.db.recurring_expenses().create(&input).await?;

    state
        .audit(
            &actor,
            AuditEvent::new(ENTITY, definition.id, AuditAction::Create).new_value(&definition),
        )
        .await;
    Ok(created(definition))
}

async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<RecurringExpenseInput>,
) -> ApiResult<Json<RecurringExpense>> {
    validate_recurring_expense(&input)?;
    let (before, after) = state.db.recurring_expenses().update(id, &input).await?;

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

async fn toggle_active(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<RecurringExpense>> {
    let (before, after) = state.db.recurring_expenses().toggle_active(id).await?;

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

/// Also removes the definition's monthly entries.
async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let deleted = state.db.recurring_expenses().delete(id).await?;
    state
        .audit(&actor, AuditEvent::new(ENTITY, id, AuditAction::Delete).old_value(&deleted))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Generation
// =============================================================================

async fn generate(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((year, month)): ApiPath<(i32, u32)>,
) -> ApiResult<Created<Vec<MonthlyExpenseEntry>>> {
    validate_period(year, month)?;
    let entries = state
        .db
        .recurring_expenses()
        .generate_monthly_entries(year, month)
        .await?;

    audit_generated(&state, &actor, &entries).await;
    Ok(created(entries))
}

async fn auto_generate(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Created<Vec<MonthlyExpenseEntry>>> {
    let entries = state
        .db
        .recurring_expenses()
        .auto_generate_current_month(today())
        .await?;

    audit_generated(&state, &actor, &entries).await;
    Ok(created(entries))
}

async fn audit_generated(state: &AppState, actor: &Actor, entries: &[MonthlyExpenseEntry]) {
    for entry in entries {
        state
            .audit(
                actor,
                AuditEvent::new(ENTRY_ENTITY, entry.id, AuditAction::Create).new_value(entry),
            )
            .await;
    }
}
