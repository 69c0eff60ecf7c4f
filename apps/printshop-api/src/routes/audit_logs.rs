//! # Audit Log Routes
//!
//! The audit trail is read-only over HTTP. Every listing is newest first.
//!
//! ```text
//! GET /audit-logs?page=0&size=20&entity_type=Customer&action=update
//!                 &user_id=admin&from=2024-01-01T00:00:00Z&to=...
//!     └── Page { items, page, size, total_items }   (size capped)
//! ```

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use printshop_core::types::Page;
use printshop_core::{AuditAction, AuditFilter, AuditLog, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AuditSearchQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub user_id: Option<String>,
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AuditSearchQuery {
    /// Zero-based page and a size within `1..=MAX_PAGE_SIZE`.
    fn page_and_size(&self) -> (u32, u32) {
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        (self.page.unwrap_or(0), size)
    }

    fn filter(self) -> AuditFilter {
        AuditFilter {
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            user_id: self.user_id,
            action: self.action,
            from: self.from,
            to: self.to,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/audit-logs", get(search))
        .route("/audit-logs/date-range", get(between))
        .route("/audit-logs/entity/{entity_type}/{entity_id}", get(by_entity))
        .route("/audit-logs/entity-type/{entity_type}", get(by_entity_type))
        .route("/audit-logs/user/{user_id}", get(by_user))
        .route("/audit-logs/action/{action}", get(by_action))
        .route("/audit-logs/{id}", get(get_one))
}

async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AuditSearchQuery>,
) -> ApiResult<Json<Page<AuditLog>>> {
    let (page, size) = query.page_and_size();
    let filter = query.filter();
    Ok(Json(state.db.audit_logs().search(&filter, page, size).await?))
}

async fn get_one(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Json<AuditLog>> {
    Ok(Json(state.db.audit_logs().get(id).await?))
}

async fn by_entity(
    State(state): State<AppState>,
    ApiPath((entity_type, entity_id)): ApiPath<(String, i64)>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    Ok(Json(state.db.audit_logs().by_entity(&entity_type, entity_id).await?))
}

async fn by_entity_type(
    State(state): State<AppState>,
    ApiPath(entity_type): ApiPath<String>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    Ok(Json(state.db.audit_logs().by_entity_type(&entity_type).await?))
}

async fn by_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    Ok(Json(state.db.audit_logs().by_user(&user_id).await?))
}

async fn by_action(
    State(state): State<AppState>,
    ApiPath(action): ApiPath<AuditAction>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    Ok(Json(state.db.audit_logs().by_action(action).await?))
}

async fn between(
    State(state): State<AppState>,
    ApiQuery(range): ApiQuery<DateRange>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    if range.from > range.to {
        return Err(ApiError::validation("from must not be after to"));
    }
    Ok(Json(state.db.audit_logs().between(range.from, range.to).await?))
}
