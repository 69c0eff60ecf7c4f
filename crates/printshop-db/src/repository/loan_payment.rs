//! # Loan Payment Repository
//!
//! ## Persist Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create   ── split_installment(loan, n, amount) ─► principal/interest  │
//! │           └─ refresh_status(today)              ─► UNPAID → OVERDUE    │
//! │                                                                         │
//! │  update / mark_paid                                                     │
//! │           ├─ split is kept as stored                                   │
//! │           └─ refresh_status(today)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::loan::LoanRepository;
use crate::today;
use printshop_core::loan::{split_installment, LoanPayment, LoanPaymentInput, MarkPaid};

#[derive(Debug, Clone)]
pub struct LoanPaymentRepository {
    pool: SqlitePool,
}

impl LoanPaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LoanPaymentRepository { pool }
    }

    /// Creates an installment for an existing loan.
    pub async fn create(&self, input: &LoanPaymentInput) -> DbResult<LoanPayment> {
        let loan = LoanRepository::new(self.pool.clone()).get(input.loan_id).await?;
        let split = split_installment(&loan, input.payment_number, input.amount);

        let now = Utc::now();
        let mut payment = LoanPayment {
            id: 0,
            loan_id: loan.id,
            payment_number: input.payment_number,
            amount: input.amount,
            due_date: input.due_date,
            paid_date: input.paid_date,
            payment_status: input.payment_status,
            payment_method: input.payment_method,
            transaction_reference: input.transaction_reference.clone(),
            notes: input.notes.clone(),
            late_fee: input.late_fee,
            principal_component: split.principal_component,
            interest_component: split.interest_component,
            created_at: now,
            updated_at: now,
        };
        payment.refresh_status(today());

        debug!(
            loan_id = loan.id,
            payment_number = payment.payment_number,
            principal = %payment.principal_component,
            interest = %payment.interest_component,
            "Creating loan payment"
        );

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO loan_payments (
                loan_id, payment_number, amount, due_date, paid_date, payment_status,
                payment_method, transaction_reference, notes, late_fee,
                principal_component, interest_component, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            RETURNING id
            "#,
        )
        .bind(payment.loan_id)
        .bind(payment.payment_number)
        .bind(payment.amount)
        .bind(payment.due_date)
        .bind(payment.paid_date)
        .bind(payment.payment_status)
        .bind(payment.payment_method)
        .bind(&payment.transaction_reference)
        .bind(&payment.notes)
        .bind(payment.late_fee)
        .bind(payment.principal_component)
        .bind(payment.interest_component)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        payment.id = id;
        Ok(payment)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<LoanPayment>> {
        let payment = sqlx::query_as("SELECT * FROM loan_payments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    pub async fn get(&self, id: i64) -> DbResult<LoanPayment> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("LoanPayment", id))
    }

    pub async fn list(&self) -> DbResult<Vec<LoanPayment>> {
        let payments = sqlx::query_as("SELECT * FROM loan_payments ORDER BY due_date, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(payments)
    }

    /// Installments of one loan in schedule order. The loan must exist.
    pub async fn list_by_loan(&self, loan_id: i64) -> DbResult<Vec<LoanPayment>> {
        LoanRepository::new(self.pool.clone()).get(loan_id).await?;
        let payments = sqlx::query_as(
            "SELECT * FROM loan_payments WHERE loan_id = ?1 ORDER BY payment_number",
        )
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Installments already OVERDUE, or UNPAID past their due date.
    pub async fn list_overdue(&self, today: NaiveDate) -> DbResult<Vec<LoanPayment>> {
        let payments = sqlx::query_as(
            r#"
            SELECT * FROM loan_payments
            WHERE payment_status = 'overdue'
               OR (payment_status = 'unpaid' AND due_date < ?1)
            ORDER BY due_date, id
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Replaces the editable fields of an installment.
    ///
    /// The loan and the stored split do not change. Returns `(before, after)`.
    pub async fn update(
        &self,
        id: i64,
        input: &LoanPaymentInput,
    ) -> DbResult<(LoanPayment, LoanPayment)> {
        let before = self.get(id).await?;
        let mut after = LoanPayment {
            payment_number: input.payment_number,
            amount: input.amount,
            due_date: input.due_date,
            paid_date: input.paid_date,
            payment_status: input.payment_status,
            payment_method: input.payment_method,
            transaction_reference: input.transaction_reference.clone(),
            notes: input.notes.clone(),
            late_fee: input.late_fee,
            ..before.clone()
        };
        after.refresh_status(today());
        debug!(id, status = ?after.payment_status, "Updating loan payment");

        let after = self.save(after).await?;
        Ok((before, after))
    }

    /// Settles an installment. Returns `(before, after)`.
    pub async fn mark_paid(&self, id: i64, request: &MarkPaid) -> DbResult<(LoanPayment, LoanPayment)> {
        let before = self.get(id).await?;
        let mut after = before.clone();
        after.mark_as_paid(request);
        after.refresh_status(today());
        debug!(id, paid_date = %request.paid_date, "Marking loan payment paid");

        let after = self.save(after).await?;
        Ok((before, after))
    }

    pub async fn delete(&self, id: i64) -> DbResult<LoanPayment> {
        let existing = self.get(id).await?;
        debug!(id, "Deleting loan payment");

        sqlx::query("DELETE FROM loan_payments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(existing)
    }

    async fn save(&self, payment: LoanPayment) -> DbResult<LoanPayment> {
        let saved = sqlx::query_as(
            r#"
            UPDATE loan_payments SET
                payment_number = ?2, amount = ?3, due_date = ?4, paid_date = ?5,
                payment_status = ?6, payment_method = ?7, transaction_reference = ?8,
                notes = ?9, late_fee = ?10, updated_at = ?11
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(payment.id)
        .bind(payment.payment_number)
        .bind(payment.amount)
        .bind(payment.due_date)
        .bind(payment.paid_date)
        .bind(payment.payment_status)
        .bind(payment.payment_method)
        .bind(&payment.transaction_reference)
        .bind(&payment.notes)
        .bind(payment.late_fee)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }
}
