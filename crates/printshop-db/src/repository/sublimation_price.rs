//! # Sublimation Price Repository
//!
//! Reference prices per sublimation type. At most one price per type is
//! active; activating one deactivates the others in the same transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use printshop_core::money::Money;
use printshop_core::types::{SublimationPrice, SublimationPriceInput, SublimationType};

const SELECT_PRICE: &str = r#"
    SELECT id, sublimation_type, unit_price, description, is_active, created_at, updated_at
    FROM sublimation_prices
"#;

#[derive(Debug, Clone)]
pub struct SublimationPriceRepository {
    pool: SqlitePool,
}

impl SublimationPriceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SublimationPriceRepository { pool }
    }

    /// Creates a price. An active new price replaces the current one.
    pub async fn create(&self, input: &SublimationPriceInput) -> DbResult<SublimationPrice> {
        debug!(
            sublimation_type = ?input.sublimation_type,
            unit_price = %input.unit_price,
            "Creating sublimation price"
        );
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        if input.is_active {
            sqlx::query(
                "UPDATE sublimation_prices SET is_active = 0, updated_at = ?2 WHERE sublimation_type = ?1 AND is_active = 1",
            )
            .bind(input.sublimation_type)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let price: SublimationPrice = sqlx::query_as(
            r#"
            INSERT INTO sublimation_prices (
                sublimation_type, unit_price, description, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            RETURNING *
            "#,
        )
        .bind(input.sublimation_type)
        .bind(input.unit_price)
        .bind(&input.description)
        .bind(input.is_active)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(price)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<SublimationPrice>> {
        let price = sqlx::query_as(&format!("{SELECT_PRICE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(price)
    }

    pub async fn get(&self, id: i64) -> DbResult<SublimationPrice> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("SublimationPrice", id))
    }

    pub async fn list(&self) -> DbResult<Vec<SublimationPrice>> {
        let prices = sqlx::query_as(&format!("{SELECT_PRICE} ORDER BY sublimation_type, id DESC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(prices)
    }

    pub async fn list_active(&self) -> DbResult<Vec<SublimationPrice>> {
        let prices = sqlx::query_as(&format!(
            "{SELECT_PRICE} WHERE is_active = 1 ORDER BY sublimation_type"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(prices)
    }

    pub async fn active_for(&self, sublimation_type: SublimationType) -> DbResult<Option<SublimationPrice>> {
        let price = sqlx::query_as(&format!(
            "{SELECT_PRICE} WHERE sublimation_type = ?1 AND is_active = 1 ORDER BY updated_at DESC, id DESC LIMIT 1"
        ))
        .bind(sublimation_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(price)
    }

    /// Unit price currently in force for a type, zero when none is active.
    pub async fn current_price(&self, sublimation_type: SublimationType) -> DbResult<Money> {
        Ok(self
            .active_for(sublimation_type)
            .await?
            .map(|p| p.unit_price)
            .unwrap_or_default())
    }

    /// Replaces every field except `created_at`. Returns `(before, after)`.
    pub async fn update(
        &self,
        id: i64,
        input: &SublimationPriceInput,
    ) -> DbResult<(SublimationPrice, SublimationPrice)> {
        let before = self.get(id).await?;
        debug!(id, "Updating sublimation price");

        let after = sqlx::query_as(
            r#"
            UPDATE sublimation_prices SET
                sublimation_type = ?2, unit_price = ?3, description = ?4, is_active = ?5,
                updated_at = ?6
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.sublimation_type)
        .bind(input.unit_price)
        .bind(&input.description)
        .bind(input.is_active)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok((before, after))
    }

    /// Makes this price the current one for its type.
    pub async fn activate(&self, id: i64) -> DbResult<(SublimationPrice, SublimationPrice)> {
        let before = self.get(id).await?;
        debug!(id, sublimation_type = ?before.sublimation_type, "Activating sublimation price");

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        sqlx::query(
            "UPDATE sublimation_prices SET is_active = 0, updated_at = ?3 WHERE sublimation_type = ?1 AND is_active = 1 AND id <> ?2",
        )
        .bind(before.sublimation_type)
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let after: SublimationPrice = sqlx::query_as(
            "UPDATE sublimation_prices SET is_active = 1, updated_at = ?2 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok((before, after))
    }

    pub async fn deactivate(&self, id: i64) -> DbResult<(SublimationPrice, SublimationPrice)> {
        let before = self.get(id).await?;
        debug!(id, "Deactivating sublimation price");

        let after = sqlx::query_as(
            "UPDATE sublimation_prices SET is_active = 0, updated_at = ?2 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok((before, after))
    }

    pub async fn delete(&self, id: i64) -> DbResult<SublimationPrice> {
        let existing = self.get(id).await?;
        debug!(id, "Deleting sublimation price");

        sqlx::query("DELETE FROM sublimation_prices WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(existing)
    }
}
