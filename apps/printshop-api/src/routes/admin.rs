use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CleanupReport {
    pub deleted: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/refresh-tokens/cleanup", post(cleanup_refresh_tokens))
}

/// Purges refresh tokens that have expired.
async fn cleanup_refresh_tokens(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<CleanupReport>> {
    user.require_admin()?;
    let deleted = state.db.refresh_tokens().cleanup_expired(Utc::now()).await?;
    info!(deleted, by = %user.username, "Cleaned up expired refresh tokens");
    Ok(Json(CleanupReport { deleted }))
}
