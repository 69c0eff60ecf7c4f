//! # User Repository
//!
//! Accounts for the back office. Password hashing happens in the API layer;
//! this repository only stores the resulting hash.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use printshop_core::types::{User, UserRole};

const SELECT_USER: &str = r#"
    SELECT id, username, email, full_name, role, password_hash, is_active, last_login, created_at
    FROM users
"#;

/// A user about to be registered, password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub password_hash: String,
}

/// Profile fields an administrator may change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdate {
    pub email: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Registers a user. A taken username or email is a
    /// [`DbError::UniqueViolation`] naming the field.
    pub async fn create(&self, new_user: &NewUser) -> DbResult<User> {
        debug!(username = %new_user.username, role = ?new_user.role, "Creating user");

        let user = sqlx::query_as(
            r#"
            INSERT INTO users (username, email, full_name, role, password_hash, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            RETURNING id, username, email, full_name, role, password_hash, is_active,
                      last_login, created_at
            "#,
        )
        .bind(new_user.username.trim())
        .bind(new_user.email.trim())
        .bind(&new_user.full_name)
        .bind(new_user.role)
        .bind(&new_user.password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("username") => {
                DbError::duplicate("username", new_user.username.trim())
            }
            DbError::UniqueViolation { field, .. } if field.ends_with("email") => {
                DbError::duplicate("email", new_user.email.trim())
            }
            other => other,
        })?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as(&format!("{SELECT_USER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get(&self, id: i64) -> DbResult<User> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as(&format!("{SELECT_USER} WHERE username = ?1"))
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Login lookup: matches either the username or the email.
    pub async fn get_by_login(&self, username_or_email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as(&format!("{SELECT_USER} WHERE username = ?1 OR email = ?1"))
            .bind(username_or_email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as(&format!("{SELECT_USER} ORDER BY created_at DESC, id DESC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Returns `(before, after)`.
    pub async fn update(&self, id: i64, update: &UserUpdate) -> DbResult<(User, User)> {
        let before = self.get(id).await?;
        debug!(id, role = ?update.role, is_active = update.is_active, "Updating user");

        let after = sqlx::query_as(
            r#"
            UPDATE users SET email = ?2, full_name = ?3, role = ?4, is_active = ?5
            WHERE id = ?1
            RETURNING id, username, email, full_name, role, password_hash, is_active,
                      last_login, created_at
            "#,
        )
        .bind(id)
        .bind(update.email.trim())
        .bind(&update.full_name)
        .bind(update.role)
        .bind(update.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok((before, after))
    }

    pub async fn set_password(&self, id: i64, password_hash: &str) -> DbResult<()> {
        self.get(id).await?;
        debug!(id, "Changing user password");

        sqlx::query("UPDATE users SET password_hash = ?2 WHERE id = ?1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn touch_last_login(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deletes a user. Their refresh tokens go with them; their loans stay
    /// with `user_id` cleared.
    pub async fn delete(&self, id: i64) -> DbResult<User> {
        let existing = self.get(id).await?;
        debug!(id, "Deleting user");

        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(existing)
    }
}
