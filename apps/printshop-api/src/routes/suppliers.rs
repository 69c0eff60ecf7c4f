use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use printshop_core::types::{Supplier, SupplierInput};
use printshop_core::validation::validate_supplier;
use printshop_core::{AuditAction, AuditEvent};

use crate::error::ApiResult;
use crate::extract::{Actor, ApiJson, ApiPath};
use crate::routes::{created, Created};
use crate::state::AppState;

const ENTITY: &str = "Supplier";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/suppliers", get(list).post(create))
        .route("/suppliers/{id}", get(get_one).put(update).delete(delete))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Supplier>>> {
    Ok(Json(state.db.suppliers().list().await?))
}

async fn get_one(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Json<Supplier>> {
    Ok(Json(state.db.suppliers().get(id).await?))
}

async fn create(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<SupplierInput>,
) -> ApiResult<Created<Supplier>> {
    validate_supplier(&input)?;
    let customer = state.db.suppliers().create(&input).await?;

    state
        .audit(
            &actor,
            AuditEvent::new(ENTITY, customer.id, AuditAction::Create).new_value(&customer),
        )
        .await;
    Ok(created(customer))
}

async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<SupplierInput>,
) -> ApiResult<Json<Supplier>> {
    validate_supplier(&input)?;
    let (before, after) = state.db.suppliers().update(id, &input).await?;

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
    let deleted = state.db.suppliers().delete(id).await?;
    state
        .audit(&actor, AuditEvent::new(ENTITY, id, AuditAction::Delete).old_value(&deleted))
        .await;
    Ok(StatusCode::NO_CONTENT)
}
