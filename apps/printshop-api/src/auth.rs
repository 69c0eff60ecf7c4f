//! JWT authentication module.
//!
//! Access tokens are short-lived HS256 JWTs whose subject is the username;
//! that subject is what the audit log records as the actor. Refresh tokens
//! are opaque UUIDs kept in the database (see `printshop_db::RefreshTokenRepository`).

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use printshop_core::types::{User, UserRole};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const ACCESS_TOKEN: &str = "access";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,

    /// Numeric user id
    pub uid: i64,

    pub role: UserRole,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type, always "access"
    pub token_type: String,
}

/// JWT token manager.
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: &str, access_lifetime_secs: i64) -> Self {
        JwtManager {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_lifetime_secs,
        }
    }

    /// Access token lifetime, reported to clients as `expires_in`.
    pub fn access_lifetime_secs(&self) -> i64 {
        self.access_lifetime_secs
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user: &User) -> ApiResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_lifetime_secs);

        let claims = Claims {
            sub: user.username.clone(),
            uid: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: ACCESS_TOKEN.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> ApiResult<Claims> {
        let token_data: TokenData<Claims> =
            decode(token, &self.decoding_key, &Validation::default())
                .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))?;

        if token_data.claims.token_type != ACCESS_TOKEN {
            return Err(ApiError::unauthorized("Expected access token"));
        }

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Passwords
// =============================================================================

/// Hash a password for storage.
pub fn hash_password(password: &str) -> ApiResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against its stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Argon2 is deliberately slow; keep it off the async workers.
pub async fn hash_password_blocking(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(format!("Password hashing task failed: {}", e)))?
}

pub async fn verify_password_blocking(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .unwrap_or(false)
}

// =============================================================================
// Authenticated User
// =============================================================================

/// The caller behind a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn require_admin(&self) -> ApiResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Administrator role required"))
        }
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        AuthUser {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Rejects requests without a valid bearer token for an active account.
///
/// The resolved [`AuthUser`] is stored in the request extensions, where the
/// extractor below picks it up.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;
    let token = extract_bearer_token(header)
        .ok_or_else(|| ApiError::unauthorized("Malformed authorization header"))?;

    let claims = state.jwt.validate_access_token(token)?;

    // Role and active flag come from the database, not the token.
    let user = match state.db.users().get_by_id(claims.uid).await? {
        Some(user) if user.is_active => user,
        _ => return Err(ApiError::unauthorized("Account is disabled or no longer exists")),
    };

    debug!(user = %user.username, "Authenticated request");
    request.extensions_mut().insert(AuthUser::from(&user));
    Ok(next.run(request).await)
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}
