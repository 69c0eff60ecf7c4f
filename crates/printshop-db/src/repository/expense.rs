//! # Expense Repository
//!
//! One-off expenses. A missing `expense_number` is generated on create, and
//! a PAID expense without a payment date is stamped with today.

use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::supplier::SupplierRepository;
use crate::today;
use printshop_core::types::{Expense, ExpenseFilter, ExpenseInput, PaymentStatus};

const SELECT_EXPENSE: &str = r#"
    SELECT id, expense_number, description, expense_type, amount, grn_number, expense_date,
           invoice_number, supplier_id, supplier_name, payment_status, payment_due_date,
           payment_date, notes, created_at, updated_at
    FROM expenses
"#;

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn create(&self, input: &ExpenseInput) -> DbResult<Expense> {
        let expense_number = match input.expense_number.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => number.to_string(),
            _ => generate_expense_number(),
        };
        let supplier_name = self.supplier_name(input.supplier_id).await?;
        let payment_date = stamp_payment_date(input.payment_status, input.payment_date);
        debug!(expense_number = %expense_number, amount = %input.amount, "Creating expense");

        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO expenses (
                expense_number, description, expense_type, amount, grn_number, expense_date,
                invoice_number, supplier_id, supplier_name, payment_status, payment_due_date,
                payment_date, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
            RETURNING id
            "#,
        )
        .bind(&expense_number)
        .bind(input.description.trim())
        .bind(input.expense_type)
        .bind(input.amount)
        .bind(&input.grn_number)
        .bind(input.expense_date)
        .bind(&input.invoice_number)
        .bind(input.supplier_id)
        .bind(&supplier_name)
        .bind(input.payment_status)
        .bind(input.payment_due_date)
        .bind(payment_date)
        .bind(&input.notes)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.get(id).await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Expense>> {
        let expense = sqlx::query_as(&format!("{SELECT_EXPENSE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(expense)
    }

    pub async fn get(&self, id: i64) -> DbResult<Expense> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Expense", id))
    }

    pub async fn list(&self) -> DbResult<Vec<Expense>> {
        self.search(&ExpenseFilter::default()).await
    }

    /// Filtered listing, newest expense date first. Text criteria are
    /// case-insensitive substring matches.
    pub async fn search(&self, filter: &ExpenseFilter) -> DbResult<Vec<Expense>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_EXPENSE);
        qb.push(" WHERE 1 = 1");

        if let Some(grn) = filter.grn_number.as_deref().filter(|s| !s.trim().is_empty()) {
            qb.push(" AND grn_number LIKE ").push_bind(format!("%{}%", grn.trim()));
        }
        if let Some(name) = filter.supplier_name.as_deref().filter(|s| !s.trim().is_empty()) {
            qb.push(" AND supplier_name LIKE ").push_bind(format!("%{}%", name.trim()));
        }
        if let Some(expense_type) = filter.expense_type {
            qb.push(" AND expense_type = ").push_bind(expense_type);
        }
        if let Some(status) = filter.payment_status {
            qb.push(" AND payment_status = ").push_bind(status);
        }
        if let Some(start) = filter.start_date {
            qb.push(" AND expense_date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND expense_date <= ").push_bind(end);
        }
        qb.push(" ORDER BY expense_date DESC, id DESC");

        let expenses: Vec<Expense> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(expenses)
    }

    /// Returns `(before, after)`. The expense number is kept unless the
    /// input names a new one.
    pub async fn update(&self, id: i64, input: &ExpenseInput) -> DbResult<(Expense, Expense)> {
        let before = self.get(id).await?;
        let expense_number = input
            .expense_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| before.expense_number.clone());
        let supplier_name = self.supplier_name(input.supplier_id).await?;
        let payment_date = stamp_payment_date(input.payment_status, input.payment_date);
        debug!(id, "Updating expense");

        sqlx::query(
            r#"
            UPDATE expenses SET
                expense_number = ?2, description = ?3, expense_type = ?4, amount = ?5,
                grn_number = ?6, expense_date = ?7, invoice_number = ?8, supplier_id = ?9,
                supplier_name = ?10, payment_status = ?11, payment_due_date = ?12,
                payment_date = ?13, notes = ?14, updated_at = ?15
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&expense_number)
        .bind(input.description.trim())
        .bind(input.expense_type)
        .bind(input.amount)
        .bind(&input.grn_number)
        .bind(input.expense_date)
        .bind(&input.invoice_number)
        .bind(input.supplier_id)
        .bind(&supplier_name)
        .bind(input.payment_status)
        .bind(input.payment_due_date)
        .bind(payment_date)
        .bind(&input.notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let after = self.get(id).await?;
        Ok((before, after))
    }

    /// Sets the payment status alone. PAID defaults the payment date to
    /// today; UNPAID clears it.
    pub async fn update_payment_status(
        &self,
        id: i64,
        status: PaymentStatus,
        payment_date: Option<NaiveDate>,
    ) -> DbResult<(Expense, Expense)> {
        let before = self.get(id).await?;
        let payment_date = match status {
            PaymentStatus::Paid => Some(payment_date.unwrap_or_else(today)),
            PaymentStatus::Unpaid => None,
            _ => before.payment_date,
        };

        sqlx::query(
            "UPDATE expenses SET payment_status = ?2, payment_date = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(status)
        .bind(payment_date)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let after = self.get(id).await?;
        Ok((before, after))
    }

    pub async fn delete(&self, id: i64) -> DbResult<Expense> {
        let existing = self.get(id).await?;
        debug!(id, "Deleting expense");

        sqlx::query("DELETE FROM expenses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(existing)
    }

    async fn supplier_name(&self, supplier_id: Option<i64>) -> DbResult<Option<String>> {
        match supplier_id {
            Some(id) => {
                let supplier = SupplierRepository::new(self.pool.clone()).get(id).await?;
                Ok(Some(supplier.name))
            }
            None => Ok(None),
        }
    }
}

fn stamp_payment_date(status: PaymentStatus, payment_date: Option<NaiveDate>) -> Option<NaiveDate> {
    match (status, payment_date) {
        (PaymentStatus::Paid, None) => Some(today()),
        (_, date) => date,
    }
}

/// `EXP` + the last seven digits of the epoch millis.
fn generate_expense_number() -> String {
    let millis = Utc::now().timestamp_millis();
    format!("EXP{:07}", millis.rem_euclid(10_000_000))
}
