use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use printshop_core::types::{Customer, CustomerInput};
use printshop_core::validation::validate_customer;
use printshop_core::{AuditAction, AuditEvent};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extract::{Actor, ApiJson, ApiPath, ApiQuery};
use crate::routes::{created, Created};
use crate::state::AppState;

const ENTITY: &str = "Customer";

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list).post(create))
        .route("/customers/search", get(search))
        .route("/customers/{id}", get(get_one).put(update).delete(delete))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db.customers().list().await?))
}

/// Name, email or phone containing `q`.
async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db.customers().search(&query.q).await?))
}

async fn get_one(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Json<Customer>> {
    Ok(Json(state.db.customers().get(id).await?))
}

async fn create(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<CustomerInput>,
) -> ApiResult<Created<Customer>> {
    validate_customer(&input)?;
    let customer = state.db.customers().create(&input).await?;

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
    ApiJson(input): ApiJson<CustomerInput>,
) -> ApiResult<Json<Customer>> {
    validate_customer(&input)?;
    let (before, after) = state.db.customers().update(id, &input).await?;

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
    let deleted = state.db.customers().delete(id).await?;
    state
        .audit(&actor, AuditEvent::new(ENTITY, id, AuditAction::Delete).old_value(&deleted))
        .await;
    Ok(StatusCode::NO_CONTENT)
}
