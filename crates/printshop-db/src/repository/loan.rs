//! # Loan Repository
//!
//! `monthly_payment` and `end_date` are fixed by
//! [`printshop_core::loan::LoanSchedule`] whenever a loan is saved from a
//! full input; nothing else ever writes them.

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use printshop_core::loan::{self, Loan, LoanInput, LoanPayment, LoanStatus, LoanSummary};

const SELECT_LOAN: &str = r#"
    SELECT id, loan_name, principal_amount, interest_rate, loan_term_months, monthly_payment,
           start_date, end_date, status, loan_type, description, lender, user_id,
           created_at, updated_at
    FROM loans
"#;

#[derive(Debug, Clone)]
pub struct LoanRepository {
    pool: SqlitePool,
}

impl LoanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LoanRepository { pool }
    }

    /// Creates a loan, computing its EMI and end date.
    pub async fn create(&self, input: &LoanInput, user_id: Option<i64>) -> DbResult<Loan> {
        let schedule = input.schedule();
        debug!(
            name = %input.loan_name,
            principal = %input.principal_amount,
            emi = %schedule.monthly_payment,
            "Creating loan"
        );

        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO loans (
                loan_name, principal_amount, interest_rate, loan_term_months, monthly_payment,
                start_date, end_date, status, loan_type, description, lender, user_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            RETURNING id
            "#,
        )
        .bind(input.loan_name.trim())
        .bind(input.principal_amount)
        .bind(input.interest_rate)
        .bind(input.loan_term_months)
        .bind(schedule.monthly_payment)
        .bind(input.start_date)
        .bind(schedule.end_date)
        .bind(input.status)
        .bind(input.loan_type)
        .bind(&input.description)
        .bind(&input.lender)
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.get(id).await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Loan>> {
        let loan = sqlx::query_as(&format!("{SELECT_LOAN} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    pub async fn get(&self, id: i64) -> DbResult<Loan> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Loan", id))
    }

    pub async fn list(&self) -> DbResult<Vec<Loan>> {
        let loans = sqlx::query_as(&format!("{SELECT_LOAN} ORDER BY start_date DESC, id DESC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(loans)
    }

    pub async fn list_by_status(&self, status: LoanStatus) -> DbResult<Vec<Loan>> {
        let loans = sqlx::query_as(&format!(
            "{SELECT_LOAN} WHERE status = ?1 ORDER BY start_date DESC, id DESC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Full re-save: the schedule is recomputed from the new terms.
    /// Existing installments keep their stored principal/interest split.
    ///
    /// Returns `(before, after)`.
    pub async fn update(&self, id: i64, input: &LoanInput) -> DbResult<(Loan, Loan)> {
        let before = self.get(id).await?;
        let schedule = input.schedule();
        debug!(id, emi = %schedule.monthly_payment, "Updating loan");

        sqlx::query(
            r#"
            UPDATE loans SET
                loan_name = ?2, principal_amount = ?3, interest_rate = ?4, loan_term_months = ?5,
                monthly_payment = ?6, start_date = ?7, end_date = ?8, status = ?9,
                loan_type = ?10, description = ?11, lender = ?12, updated_at = ?13
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.loan_name.trim())
        .bind(input.principal_amount)
        .bind(input.interest_rate)
        .bind(input.loan_term_months)
        .bind(schedule.monthly_payment)
        .bind(input.start_date)
        .bind(schedule.end_date)
        .bind(input.status)
        .bind(input.loan_type)
        .bind(&input.description)
        .bind(&input.lender)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let after = self.get(id).await?;
        Ok((before, after))
    }

    /// Deletes a loan and, by cascade, its installments.
    pub async fn delete(&self, id: i64) -> DbResult<Loan> {
        let existing = self.get(id).await?;
        debug!(id, "Deleting loan");

        sqlx::query("DELETE FROM loans WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(existing)
    }

    /// Read-only roll-up of a loan and its installments as of `today`.
    pub async fn summary(&self, id: i64, today: NaiveDate) -> DbResult<LoanSummary> {
        let loan = self.get(id).await?;
        let payments: Vec<LoanPayment> = sqlx::query_as(
            "SELECT * FROM loan_payments WHERE loan_id = ?1 ORDER BY payment_number",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loan::summarize(&loan, &payments, today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use printshop_core::money::Money;
    use printshop_core::types::Percentage;

    fn input() -> LoanInput {
        LoanInput {
            loan_name: "Offset press".to_string(),
            principal_amount: Money::from_cents(12_000_000),
            interest_rate: Percentage::from_whole(12),
            loan_term_months: 12,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            status: LoanStatus::Active,
            loan_type: Default::default(),
            description: None,
            lender: Some("City Bank".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_computes_schedule() {
        let db = test_support::db().await;
        let loan = db.loans().create(&input(), None).await.unwrap();

        assert_eq!(loan.monthly_payment.cents(), 1_066_185);
        assert_eq!(loan.end_date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(loan.interest_rate, Percentage::from_whole(12));
    }

    #[tokio::test]
    async fn test_zero_rate_and_update() {
        let db = test_support::db().await;
        let repo = db.loans();
        let loan = repo.create(&input(), None).await.unwrap();

        let mut zero = input();
        zero.principal_amount = Money::from_cents(1_200_000);
        zero.interest_rate = Percentage::zero();
        let (before, after) = repo.update(loan.id, &zero).await.unwrap();
        assert_eq!(before.monthly_payment.cents(), 1_066_185);
        assert_eq!(after.monthly_payment.cents(), 100_000);
    }

    #[tokio::test]
    async fn test_summary_without_payments() {
        let db = test_support::db().await;
        let loan = db.loans().create(&input(), None).await.unwrap();
        let summary = db
            .loans()
            .summary(loan.id, NaiveDate::from_ymd_opt(2024, 1, 20).unwrap())
            .await
            .unwrap();
        assert_eq!(summary.completed_payments, 0);
        assert_eq!(summary.remaining_payments, 12);
        assert_eq!(summary.total_amount_to_pay.cents(), 1_066_185 * 12);
        assert!(!summary.is_overdue);
    }
}
