//! # Customer Repository
//!
//! Customers are referenced by print jobs; deleting one leaves its jobs in
//! place with `customer_id` cleared.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use printshop_core::{Customer, CustomerInput};

const SELECT_CUSTOMER: &str = r#"
    SELECT id, customer_number, name, email, phone, address, created_at
    FROM customers
"#;

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer with a freshly generated customer number.
    pub async fn create(&self, input: &CustomerInput) -> DbResult<Customer> {
        let customer_number = generate_customer_number();
        debug!(customer_number = %customer_number, name = %input.name, "Creating customer");

        let customer: Customer = sqlx::query_as(
            r#"
            INSERT INTO customers (customer_number, name, email, phone, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, customer_number, name, email, phone, address, created_at
            "#,
        )
        .bind(&customer_number)
        .bind(input.name.trim())
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as(&format!("{SELECT_CUSTOMER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    /// Like [`Self::get_by_id`] but a missing customer is an error.
    pub async fn get(&self, id: i64) -> DbResult<Customer> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as(&format!("{SELECT_CUSTOMER} ORDER BY name, id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(customers)
    }

    /// Case-insensitive substring match on name, email or phone.
    pub async fn search(&self, query: &str) -> DbResult<Vec<Customer>> {
        let pattern = format!("%{}%", query.trim());
        let customers = sqlx::query_as(&format!(
            "{SELECT_CUSTOMER} WHERE name LIKE ?1 OR email LIKE ?1 OR phone LIKE ?1 ORDER BY name, id"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    /// Replaces the editable fields. The customer number never changes.
    ///
    /// Returns `(before, after)`.
    pub async fn update(&self, id: i64, input: &CustomerInput) -> DbResult<(Customer, Customer)> {
        let before = self.get(id).await?;
        debug!(id, "Updating customer");

        let after: Customer = sqlx::query_as(
            r#"
            UPDATE customers SET name = ?2, email = ?3, phone = ?4, address = ?5
            WHERE id = ?1
            RETURNING id, customer_number, name, email, phone, address, created_at
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

    /// Deletes a customer and returns what was deleted.
    pub async fn delete(&self, id: i64) -> DbResult<Customer> {
        let existing = self.get(id).await?;
        debug!(id, "Deleting customer");

        sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(existing)
    }
}

/// Generates a customer number: `CUST` + epoch millis + 4 digits.
///
/// ## Example
/// `CUST17094528000000427`
fn generate_customer_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let bytes = Uuid::new_v4().into_bytes();
    let suffix = u16::from_le_bytes([bytes[0], bytes[1]]) % 10_000;
    format!("CUST{millis}{suffix:04}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;

    fn input(name: &str) -> CustomerInput {
        CustomerInput {
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            phone: None,
            address: None,
        }
    }

    #[test]
    fn test_customer_number_format() {
        let number = generate_customer_number();
        assert!(number.starts_with("CUST"));
        assert!(number[4..].chars().all(|c| c.is_ascii_digit()));
        assert!(number.len() >= 4 + 13 + 4);
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let db = test_support::db().await;
        let repo = db.customers();

        let created = repo.create(&input("Ada")).await.unwrap();
        assert!(created.customer_number.starts_with("CUST"));

        let (before, after) = repo.update(created.id, &input("Grace")).await.unwrap();
        assert_eq!(before.name, "Ada");
        assert_eq!(after.name, "Grace");
        assert_eq!(after.customer_number, created.customer_number);

        let found = repo.search("grac").await.unwrap();
        assert_eq!(found.len(), 1);

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(created.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
