//! Reference prices for sublimation blanks. At most one price per type is
//! active; activating one deactivates the others of that type.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use printshop_core::types::{SublimationPrice, SublimationPriceInput, SublimationType};
use printshop_core::validation::validate_sublimation_price;
use printshop_core::{AuditAction, AuditEvent, Money};
use serde::Serialize;

use crate::error::ApiResult;
use crate::extract::{Actor, ApiJson, ApiPath};
use crate::routes::{created, Created};
use crate::state::AppState;

const ENTITY: &str = "SublimationPrice";

/// The unit price in force for a type. Zero when no price is active.
#[derive(Debug, Serialize)]
pub struct CurrentPrice {
    pub sublimation_type: SublimationType,
    pub unit_price: Money,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sublimation-prices", get(list).post(create))
        .route("/sublimation-prices/active", get(list_active))
        .route("/sublimation-prices/current/{sublimation_type}", get(current))
        .route(
            "/sublimation-prices/{id}",
            get(get_one).put(update).delete(delete),
        )
        .route("/sublimation-prices/{id}/activate", put(activate))
        .route("/sublimation-prices/{id}/deactivate", put(deactivate))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<SublimationPrice>>> {
    Ok(Json(state.db.sublimation_prices().list().await?))
}

async fn list_active(State(state): State<AppState>) -> ApiResult<Json<Vec<SublimationPrice>>> {
    Ok(Json(state.db.sublimation_prices().list_active().await?))
}

async fn current(
    State(state): State<AppState>,
    ApiPath(sublimation_type): ApiPath<SublimationType>,
) -> ApiResult<Json<CurrentPrice>> {
    let unit_price = state.db.sublimation_prices().current_price(sublimation_type).await?;
    Ok(Json(CurrentPrice {
        sublimation_type,
        unit_price,
    }))
}

async fn get_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<SublimationPrice>> {
    Ok(Json(state.db.sublimation_prices().get(id).await?))
}

async fn create(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<SublimationPriceInput>,
) -> ApiResult<Created<SublimationPrice>> {
    validate_sublimation_price(&input)?;
    let price = state.db.sublimation_prices().create(&input).await?;

    state
        .audit(&actor, AuditEvent::new(ENTITY, price.id, AuditAction::Create).new_value(&price))
        .await;
    Ok(created(price))
}

async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<SublimationPriceInput>,
) -> ApiResult<Json<SublimationPrice>> {
    validate_sublimation_price(&input)?;
    let (before, after) = state.db.sublimation_prices().update(id, &input).await?;
    audit_update(&state, &actor, &before, &after).await;
    Ok(Json(after))
}

async fn activate(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<SublimationPrice>> {
    let (before, after) = state.db.sublimation_prices().activate(id).await?;
    audit_update(&state, &actor, &before, &after).await;
    Ok(Json(after))
}

async fn deactivate(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<SublimationPrice>> {
    let (before, after) = state.db.sublimation_prices().deactivate(id).await?;
    audit_update(&state, &actor, &before, &after).await;
    Ok(Json(after))
}

async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let deleted = state.db.sublimation_prices().delete(id).await?;
    state
        .audit(&actor, AuditEvent::new(ENTITY, id, AuditAction::Delete).old_value(&deleted))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn audit_update(
    state: &AppState,
    actor: &Actor,
    before: &SublimationPrice,
    after: &SublimationPrice,
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
