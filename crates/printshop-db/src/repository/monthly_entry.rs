//! # Monthly Expense Entry Repository
//!
//! Entries are created only by
//! [`RecurringExpenseRepository::generate_monthly_entries`](super::recurring::RecurringExpenseRepository::generate_monthly_entries).
//! Every save here reapplies overdue escalation.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::today;
use printshop_core::money::Money;
use printshop_core::recurring::{self, MonthlyExpenseEntry, MonthlyTotals};
use printshop_core::types::PaymentStatus;

const SELECT_ENTRY: &str = r#"
    SELECT e.id, e.recurring_expense_id, r.name AS recurring_expense_name, e.year, e.month,
           e.amount, e.payment_status, e.due_date, e.payment_date, e.notes,
           e.created_at, e.updated_at
    FROM monthly_expense_entries e
    LEFT JOIN recurring_expenses r ON r.id = e.recurring_expense_id
"#;

/// Editable fields of an entry. Period and owning definition are fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyEntryUpdate {
    pub amount: Money,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MonthlyEntryRepository {
    pool: SqlitePool,
}

impl MonthlyEntryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MonthlyEntryRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<MonthlyExpenseEntry>> {
        let entry = sqlx::query_as(&format!("{SELECT_ENTRY} WHERE e.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    pub async fn get(&self, id: i64) -> DbResult<MonthlyExpenseEntry> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("MonthlyExpenseEntry", id))
    }

    /// Every entry, most recent period first.
    pub async fn list(&self) -> DbResult<Vec<MonthlyExpenseEntry>> {
        let entries = sqlx::query_as(&format!(
            "{SELECT_ENTRY} ORDER BY e.year DESC, e.month DESC, r.name, e.id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn list_for_month(&self, year: i32, month: u32) -> DbResult<Vec<MonthlyExpenseEntry>> {
        let entries = sqlx::query_as(&format!(
            "{SELECT_ENTRY} WHERE e.year = ?1 AND e.month = ?2 ORDER BY r.name, e.id"
        ))
        .bind(year)
        .bind(month)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn list_by_recurring(&self, recurring_expense_id: i64) -> DbResult<Vec<MonthlyExpenseEntry>> {
        let entries = sqlx::query_as(&format!(
            "{SELECT_ENTRY} WHERE e.recurring_expense_id = ?1 ORDER BY e.year DESC, e.month DESC"
        ))
        .bind(recurring_expense_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// Everything not yet paid, oldest due first.
    pub async fn list_unpaid(&self) -> DbResult<Vec<MonthlyExpenseEntry>> {
        let entries = sqlx::query_as(&format!(
            "{SELECT_ENTRY} WHERE e.payment_status <> 'paid' ORDER BY e.due_date, e.id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// Entries already OVERDUE, or UNPAID with a due date before `today`.
    pub async fn list_overdue(&self, today: NaiveDate) -> DbResult<Vec<MonthlyExpenseEntry>> {
        let entries = sqlx::query_as(&format!(
            r#"{SELECT_ENTRY}
            WHERE e.payment_status = 'overdue'
               OR (e.payment_status = 'unpaid' AND e.due_date < ?1)
            ORDER BY e.due_date, e.id"#
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// Returns `(before, after)`.
    pub async fn update(
        &self,
        id: i64,
        update: &MonthlyEntryUpdate,
    ) -> DbResult<(MonthlyExpenseEntry, MonthlyExpenseEntry)> {
        let before = self.get(id).await?;
        let mut after = MonthlyExpenseEntry {
            amount: update.amount,
            payment_status: update.payment_status,
            payment_date: update.payment_date,
            notes: update.notes.clone(),
            ..before.clone()
        };
        after.refresh_status(today());
        debug!(id, status = ?after.payment_status, "Updating monthly entry");

        let after = self.save(&after).await?;
        Ok((before, after))
    }

    pub async fn mark_paid(
        &self,
        id: i64,
        payment_date: NaiveDate,
        notes: Option<String>,
    ) -> DbResult<(MonthlyExpenseEntry, MonthlyExpenseEntry)> {
        let before = self.get(id).await?;
        let mut after = before.clone();
        after.mark_paid(payment_date, notes);
        after.refresh_status(today());
        debug!(id, %payment_date, "Marking monthly entry paid");

        let after = self.save(&after).await?;
        Ok((before, after))
    }

    /// Reverts a payment; a past-due entry comes back as OVERDUE.
    pub async fn mark_unpaid(&self, id: i64) -> DbResult<(MonthlyExpenseEntry, MonthlyExpenseEntry)> {
        let before = self.get(id).await?;
        let mut after = before.clone();
        after.mark_unpaid();
        after.refresh_status(today());
        debug!(id, status = ?after.payment_status, "Marking monthly entry unpaid");

        let after = self.save(&after).await?;
        Ok((before, after))
    }

    pub async fn delete(&self, id: i64) -> DbResult<MonthlyExpenseEntry> {
        let existing = self.get(id).await?;
        debug!(id, "Deleting monthly entry");

        sqlx::query("DELETE FROM monthly_expense_entries WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(existing)
    }

    pub async fn summary(&self, year: i32, month: u32) -> DbResult<MonthlyTotals> {
        let entries = self.list_for_month(year, month).await?;
        Ok(recurring::summarize_entries(&entries))
    }

    async fn save(&self, entry: &MonthlyExpenseEntry) -> DbResult<MonthlyExpenseEntry> {
        sqlx::query(
            r#"
            UPDATE monthly_expense_entries SET
                amount = ?2, payment_status = ?3, payment_date = ?4, notes = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(entry.id)
        .bind(entry.amount)
        .bind(entry.payment_status)
        .bind(entry.payment_date)
        .bind(&entry.notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get(entry.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use crate::Database;
    use chrono::{Datelike, Duration};
    use printshop_core::recurring::{ExpenseCategory, Frequency, RecurringExpenseInput};

    async fn seed(db: &Database, start: NaiveDate) -> i64 {
        db.recurring_expenses()
            .create(&RecurringExpenseInput {
                name: "Rent".to_string(),
                description: None,
                category: ExpenseCategory::Rent,
                amount: Money::from_cents(50_000_00),
                frequency: Frequency::Monthly,
                start_date: start,
                end_date: None,
                is_active: true,
                auto_generate: true,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_past_entry_escalates_and_reverts_to_overdue() {
        let db = test_support::db().await;
        seed(&db, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()).await;
        let created = db.recurring_expenses().generate_monthly_entries(2023, 3).await.unwrap();
        let id = created[0].id;
        let repo = db.monthly_entries();

        // Generated as UNPAID; the next save notices March 2023 is long past.
        let (_, touched) = repo
            .update(
                id,
                &MonthlyEntryUpdate {
                    amount: Money::from_cents(50_000_00),
                    payment_status: PaymentStatus::Unpaid,
                    payment_date: None,
                    notes: Some("landlord late with invoice".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(touched.payment_status, PaymentStatus::Overdue);
        assert_eq!(touched.recurring_expense_name.as_deref(), Some("Rent"));

        let (_, paid) = repo
            .mark_paid(id, NaiveDate::from_ymd_opt(2023, 4, 2).unwrap(), None)
            .await
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.notes.as_deref(), Some("landlord late with invoice"));

        let (_, reverted) = repo.mark_unpaid(id).await.unwrap();
        assert_eq!(reverted.payment_status, PaymentStatus::Overdue);
        assert_eq!(reverted.payment_date, None);
    }

    #[tokio::test]
    async fn test_future_entry_stays_unpaid() {
        let db = test_support::db().await;
        let next_month = today() + Duration::days(40);
        seed(&db, today()).await;
        let created = db
            .recurring_expenses()
            .generate_monthly_entries(next_month.year(), next_month.month())
            .await
            .unwrap();
        let (_, after) = db.monthly_entries().mark_unpaid(created[0].id).await.unwrap();
        assert_eq!(after.payment_status, PaymentStatus::Unpaid);
        assert!(db.monthly_entries().list_overdue(today()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_month_summary() {
        let db = test_support::db().await;
        seed(&db, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).await;
        let second = db
            .recurring_expenses()
            .create(&RecurringExpenseInput {
                name: "Internet".to_string(),
                description: None,
                category: ExpenseCategory::Telecommunications,
                amount: Money::from_cents(3_000_00),
                frequency: Frequency::Monthly,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: None,
                is_active: true,
                auto_generate: true,
            })
            .await
            .unwrap();
        db.recurring_expenses().generate_monthly_entries(2024, 5).await.unwrap();

        let entries = db.monthly_entries().list_for_month(2024, 5).await.unwrap();
        let internet = entries
            .iter()
            .find(|e| e.recurring_expense_id == second.id)
            .unwrap();
        db.monthly_entries()
            .mark_paid(internet.id, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(), None)
            .await
            .unwrap();

        let totals = db.monthly_entries().summary(2024, 5).await.unwrap();
        assert_eq!(totals.entry_count, 2);
        assert_eq!(totals.total.cents(), 53_000_00);
        assert_eq!(totals.paid.cents(), 3_000_00);
        assert_eq!(totals.unpaid.cents(), 50_000_00);
        assert_eq!(db.monthly_entries().list_unpaid().await.unwrap().len(), 1);
    }
}
