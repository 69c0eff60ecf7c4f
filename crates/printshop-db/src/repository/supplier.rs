//! # Supplier Repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use printshop_core::{Supplier, SupplierInput};

const SELECT_SUPPLIER: &str = r#"
    SELECT id, name, email, phone, address, created_at
    FROM suppliers
"#;

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn create(&self, input: &SupplierInput) -> DbResult<Supplier> {
        debug!(name = %input.name, "Creating supplier");

        let supplier = sqlx::query_as(
            r#"
            INSERT INTO suppliers (name, email, phone, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, name, email, phone, address, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(supplier)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as(&format!("{SELECT_SUPPLIER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(supplier)
    }

    pub async fn get(&self, id: i64) -> DbResult<Supplier> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as(&format!("{SELECT_SUPPLIER} ORDER BY name, id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(suppliers)
    }

    /// Returns `(before, after)`.
    pub async fn update(&self, id: i64, input: &SupplierInput) -> DbResult<(Supplier, Supplier)> {
        let before = self.get(id).await?;
        debug!(id, "Updating supplier");

        let after = sqlx::query_as(
            r#"
            UPDATE suppliers SET name = ?2, email = ?3, phone = ?4, address = ?5
            WHERE id = ?1
            RETURNING id, name, email, phone, address, created_at
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .fetch_one(&self.pool)
        .await?;

        Ok((before, after))
    }

    pub async fn delete(&self, id: i64) -> DbResult<Supplier> {
        let existing = self.get(id).await?;
        debug!(id, "Deleting supplier");

        sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;

    #[tokio::test]
    async fn test_missing_supplier_is_not_found() {
        let db = test_support::db().await;
        let err = db.suppliers().get(99).await.unwrap_err();
        assert_eq!(err.to_string(), "Supplier not found: 99");
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let db = test_support::db().await;
        let repo = db.suppliers();
        for name in ["Zenith Paper", "Acme Inks"] {
            repo.create(&SupplierInput {
                name: name.to_string(),
                email: None,
                phone: None,
                address: None,
            })
            .await
            .unwrap();
        }
        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Acme Inks", "Zenith Paper"]);
    }
}
