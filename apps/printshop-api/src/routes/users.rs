//! User administration. Everything here is admin-only except reading and
//! changing one's own account.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use printshop_core::types::{User, UserRole};
use printshop_core::validation::{validate_email, validate_password, validate_text, validate_username};
use printshop_core::{AuditAction, AuditEvent};
use printshop_db::{NewUser, UserUpdate};
use serde::Deserialize;

use crate::auth::{hash_password_blocking, verify_password_blocking, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{Actor, ApiJson, ApiPath};
use crate::routes::{created, Created};
use crate::state::AppState;

const ENTITY: &str = "User";

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// Required unless an administrator is resetting someone else's password.
    pub current_password: Option<String>,
    pub new_password: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list).post(create))
        .route("/users/username/{username}", get(get_by_username))
        .route("/users/{id}", get(get_one).put(update).delete(delete))
        .route("/users/{id}/password", put(change_password))
}

async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<User>>> {
    user.require_admin()?;
    Ok(Json(state.db.users().list().await?))
}

async fn get_one(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<User>> {
    if user.id != id {
        user.require_admin()?;
    }
    Ok(Json(state.db.users().get(id).await?))
}

async fn get_by_username(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(username): ApiPath<String>,
) -> ApiResult<Json<User>> {
    user.require_admin()?;
    state
        .db
        .users()
        .get_by_username(&username)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(ENTITY, &username))
}

async fn create(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> ApiResult<Created<User>> {
    actor.user.require_admin()?;
    validate_username(&request.username)?;
    validate_text("email", &request.email, 255)?;
    validate_email(Some(&request.email))?;
    validate_password(&request.password)?;

    let password_hash = hash_password_blocking(request.password).await?;
    let user = state
        .db
        .users()
        .create(&NewUser {
            username: request.username,
            email: request.email,
            full_name: request.full_name,
            role: request.role,
            password_hash,
        })
        .await?;

    state
        .audit(&actor, AuditEvent::new(ENTITY, user.id, AuditAction::Create).new_value(&user))
        .await;
    Ok(created(user))
}

async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> ApiResult<Json<User>> {
    actor.user.require_admin()?;
    validate_text("email", &update.email, 255)?;
    validate_email(Some(&update.email))?;
    if actor.user.id == id && (!update.is_active || update.role != UserRole::Admin) {
        return Err(ApiError::validation(
            "Administrators cannot demote or deactivate themselves",
        ));
    }

    let (before, after) = state.db.users().update(id, &update).await?;
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
    actor.user.require_admin()?;
    if actor.user.id == id {
        return Err(ApiError::validation("Administrators cannot delete themselves"));
    }

    let deleted = state.db.users().delete(id).await?;
    state
        .audit(&actor, AuditEvent::new(ENTITY, id, AuditAction::Delete).old_value(&deleted))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// Changing a password also revokes every refresh token of the account.
async fn change_password(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    let own_account = actor.user.id == id;
    if !own_account {
        actor.user.require_admin()?;
    }
    validate_password(&request.new_password)?;

    let user = state.db.users().get(id).await?;
    if own_account {
        let current = request
            .current_password
            .ok_or_else(|| ApiError::validation("current_password is required"))?;
        if !verify_password_blocking(current, user.password_hash.clone()).await {
            return Err(ApiError::unauthorized("Current password is incorrect"));
        }
    }

    let hash = hash_password_blocking(request.new_password).await?;
    state.db.users().set_password(id, &hash).await?;
    state.db.refresh_tokens().revoke_all_for_user(id).await?;

    // Snapshots never contain the hash.
    let after = state.db.users().get(id).await?;
    state
        .audit(
            &actor,
            AuditEvent::new(ENTITY, id, AuditAction::Update)
                .old_value(&user)
                .new_value(&after),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}
