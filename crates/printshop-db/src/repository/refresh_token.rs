//! # Refresh Token Repository
//!
//! ## Token Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  login / refresh                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  issue(user, lifetime)                                                 │
//! │   ├── revoke every live token of the user                              │
//! │   └── insert a fresh UUID token          (one transaction)             │
//! │                                                                         │
//! │  logout ── revoke(token)                                               │
//! │  admin  ── cleanup_expired(now) deletes expired rows                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use printshop_core::types::RefreshToken;

#[derive(Debug, Clone)]
pub struct RefreshTokenRepository {
    pool: SqlitePool,
}

impl RefreshTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RefreshTokenRepository { pool }
    }

    /// Issues a new token for `user_id`, revoking all of their older ones.
    pub async fn issue(&self, user_id: i64, lifetime: Duration) -> DbResult<RefreshToken> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET revoked = 1, revoked_at = ?2 WHERE user_id = ?1 AND revoked = 0",
        )
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let token: RefreshToken = sqlx::query_as(
            r#"
            INSERT INTO refresh_tokens (token, user_id, expires_at, revoked, created_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            RETURNING id, token, user_id, expires_at, revoked, revoked_at, created_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(now + lifetime)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(user_id, revoked, "Issued refresh token");
        Ok(token)
    }

    pub async fn find_by_token(&self, token: &str) -> DbResult<Option<RefreshToken>> {
        let found = sqlx::query_as(
            r#"
            SELECT id, token, user_id, expires_at, revoked, revoked_at, created_at
            FROM refresh_tokens WHERE token = ?1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found)
    }

    /// Revokes one token. Returns `false` when it does not exist or was
    /// already revoked.
    pub async fn revoke(&self, token: &str) -> DbResult<bool> {
        let affected = sqlx::query(
            "UPDATE refresh_tokens SET revoked = 1, revoked_at = ?2 WHERE token = ?1 AND revoked = 0",
        )
        .bind(token)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }

    pub async fn revoke_all_for_user(&self, user_id: i64) -> DbResult<u64> {
        let affected = sqlx::query(
            "UPDATE refresh_tokens SET revoked = 1, revoked_at = ?2 WHERE user_id = ?1 AND revoked = 0",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected)
    }

    /// Deletes every token that expired at or before `now`.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        info!(deleted, "Cleaned up expired refresh tokens");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use crate::NewUser;
    use printshop_core::types::UserRole;

    async fn user_id(db: &crate::Database) -> i64 {
        db.users()
            .create(&NewUser {
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                full_name: None,
                role: UserRole::User,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_issue_revokes_previous() {
        let db = test_support::db().await;
        let user = user_id(&db).await;
        let repo = db.refresh_tokens();

        let first = repo.issue(user, Duration::days(7)).await.unwrap();
        let second = repo.issue(user, Duration::days(7)).await.unwrap();
        assert_ne!(first.token, second.token);

        let now = Utc::now();
        let first = repo.find_by_token(&first.token).await.unwrap().unwrap();
        assert!(first.revoked);
        assert!(first.revoked_at.is_some());
        assert!(!first.is_usable(now));
        assert!(second.is_usable(now));
    }

    #[tokio::test]
    async fn test_revoke_and_cleanup() {
        let db = test_support::db().await;
        let user = user_id(&db).await;
        let repo = db.refresh_tokens();

        let token = repo.issue(user, Duration::days(1)).await.unwrap();
        assert!(repo.revoke(&token.token).await.unwrap());
        assert!(!repo.revoke(&token.token).await.unwrap());

        repo.issue(user, Duration::seconds(-5)).await.unwrap();
        assert_eq!(repo.cleanup_expired(Utc::now()).await.unwrap(), 1);
        assert!(repo.find_by_token(&token.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tokens_go_with_their_user() {
        let db = test_support::db().await;
        let user = user_id(&db).await;
        let token = db.refresh_tokens().issue(user, Duration::days(1)).await.unwrap();
        db.users().delete(user).await.unwrap();
        assert!(db.refresh_tokens().find_by_token(&token.token).await.unwrap().is_none());
    }
}
