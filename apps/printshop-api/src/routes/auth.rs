//! # Authentication Routes
//!
//! ## Token Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /auth/login { username_or_email, password }                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  argon2 verify (blocking pool) ── fail ──► 401                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  access JWT (1h)  +  refresh UUID (7d, older ones revoked)             │
//! │                                                                         │
//! │  POST /auth/refresh-token { refresh_token }                            │
//! │       └── unknown / revoked / expired ──► 403                          │
//! │       └── ok ──► new access JWT + rotated refresh token                │
//! │                                                                         │
//! │  POST /auth/logout [{ refresh_token }]                                 │
//! │       └── revoke that token, or all of the caller's tokens             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use printshop_core::types::{User, UserRole};
use printshop_core::validation::{validate_email, validate_password, validate_text, validate_username};
use printshop_core::{AuditAction, AuditEvent};
use printshop_db::NewUser;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::auth::{hash_password_blocking, verify_password_blocking, AuthUser};
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::extract::{Actor, ApiJson, RequestMeta};
use crate::routes::{created, Created};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

/// Routes reachable without a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh-token", post(refresh_token))
}

/// Routes that need the caller's identity.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
}

async fn issue_tokens(state: &AppState, user: User) -> ApiResult<TokenResponse> {
    let access_token = state.jwt.generate_access_token(&user)?;
    let refresh = state
        .db
        .refresh_tokens()
        .issue(user.id, state.config.refresh_lifetime())
        .await?;

    Ok(TokenResponse {
        access_token,
        refresh_token: refresh.token,
        token_type: "Bearer",
        expires_in: state.jwt.access_lifetime_secs(),
        user,
    })
}

async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let invalid = || ApiError::unauthorized("Invalid username or password");

    let user = state
        .db
        .users()
        .get_by_login(&request.username_or_email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password_blocking(request.password, user.password_hash.clone()).await {
        warn!(username = %user.username, "Failed login attempt");
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::unauthorized("Account is disabled"));
    }

    state.db.users().touch_last_login(user.id).await?;
    let user = state.db.users().get(user.id).await?;
    info!(username = %user.username, "User logged in");

    Ok(Json(issue_tokens(&state, user).await?))
}

/// Self-service sign-up. The very first account becomes the administrator.
async fn register(
    State(state): State<AppState>,
    RequestMeta(context): RequestMeta,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<Created<TokenResponse>> {
    validate_username(&request.username)?;
    validate_text("email", &request.email, 255)?;
    validate_email(Some(&request.email))?;
    validate_password(&request.password)?;

    let role = if state.db.users().count().await? == 0 {
        UserRole::Admin
    } else {
        UserRole::User
    };

    let password_hash = hash_password_blocking(request.password).await?;
    let user = state
        .db
        .users()
        .create(&NewUser {
            username: request.username,
            email: request.email,
            full_name: request.full_name,
            role,
            password_hash,
        })
        .await?;
    info!(username = %user.username, role = ?user.role, "User registered");

    let actor = Actor::new(AuthUser::from(&user), context);
    state
        .audit(&actor, AuditEvent::new("User", user.id, AuditAction::Create).new_value(&user))
        .await;

    Ok(created(issue_tokens(&state, user).await?))
}

async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<User>> {
    Ok(Json(state.db.users().get(user.id).await?))
}

async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let rejected = || ApiError::forbidden("Refresh token is invalid, revoked or expired");

    let token = state
        .db
        .refresh_tokens()
        .find_by_token(&request.refresh_token)
        .await?
        .filter(|token| token.is_usable(Utc::now()))
        .ok_or_else(rejected)?;

    let user = state.db.users().get(token.user_id).await?;
    if !user.is_active {
        return Err(rejected());
    }

    Ok(Json(issue_tokens(&state, user).await?))
}

async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let request: LogoutRequest = if body.is_empty() {
        LogoutRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::new(ErrorCode::ValidationError, e.to_string()))?
    };

    let tokens = state.db.refresh_tokens();
    match request.refresh_token {
        Some(token) => {
            // Only the caller's own token can be revoked this way.
            if let Some(found) = tokens.find_by_token(&token).await? {
                if found.user_id == user.id {
                    tokens.revoke(&token).await?;
                }
            }
        }
        None => {
            tokens.revoke_all_for_user(user.id).await?;
        }
    }

    info!(username = %user.username, "User logged out");
    Ok(Json(json!({ "message": "Logout successful" })))
}
